use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use super::provider::{map_transport_error, parse_error_response, CompletionClient};
use super::types::{ChatMessage, CompletionRequest, CompletionResponse, LLMError};

const OPENROUTER_API_URL: &str = "https://openrouter.ai/api/v1";

/// OpenRouter client (OpenAI-compatible chat completions)
pub struct OpenRouterClient {
    http_client: Client,
    base_url: String,
    timeout_secs: u64,
}

impl OpenRouterClient {
    pub fn new(http_client: Client, timeout_secs: u64) -> Self {
        Self {
            http_client,
            base_url: OPENROUTER_API_URL.to_string(),
            timeout_secs,
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn build_request_body(
        &self,
        model: &str,
        system: Option<&str>,
        messages: &[ChatMessage],
    ) -> serde_json::Value {
        let mut api_messages: Vec<serde_json::Value> = Vec::with_capacity(messages.len() + 1);

        if let Some(system) = system {
            api_messages.push(json!({ "role": "system", "content": system }));
        }

        api_messages.extend(
            messages
                .iter()
                .map(|m| json!({ "role": m.role().as_str(), "content": m.content() })),
        );

        json!({
            "model": model,
            "messages": api_messages,
            "stream": false,
        })
    }

    fn get_endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[async_trait]
impl CompletionClient for OpenRouterClient {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LLMError> {
        let body = self.build_request_body(&request.model, request.system.as_deref(), &request.messages);

        let response = self
            .http_client
            .post(self.get_endpoint())
            .header("Authorization", format!("Bearer {}", request.credential.expose()))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| map_transport_error(e, self.timeout_secs))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(parse_error_response(status.as_u16(), &text));
        }

        let resp: OpenRouterResponse = response.json().await.map_err(|e| LLMError::ParseError {
            message: e.to_string(),
        })?;

        convert_response(resp, &request.model)
    }
}

fn convert_response(resp: OpenRouterResponse, model: &str) -> Result<CompletionResponse, LLMError> {
    // OpenRouter reports some upstream failures with a 200 status
    if let Some(error) = resp.error {
        return Err(LLMError::ProviderError {
            status: error.code.unwrap_or(0),
            message: error.message,
        });
    }

    let choice = resp.choices.into_iter().next().unwrap_or_default();
    let text = choice.message.content.unwrap_or_default();

    if text.trim().is_empty() {
        return match choice.finish_reason.as_deref() {
            Some("content_filter") => Err(LLMError::ContentFiltered {
                reason: "content_filter".to_string(),
            }),
            _ => Err(LLMError::EmptyResponse),
        };
    }

    Ok(CompletionResponse {
        text,
        model: resp.model.unwrap_or_else(|| model.to_string()),
    })
}

#[derive(Debug, Deserialize)]
struct OpenRouterResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<OpenRouterChoice>,
    #[serde(default)]
    error: Option<OpenRouterError>,
}

#[derive(Debug, Deserialize, Default)]
struct OpenRouterChoice {
    #[serde(default)]
    message: OpenRouterMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct OpenRouterMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenRouterError {
    code: Option<u16>,
    message: String,
}
