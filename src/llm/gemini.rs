use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use super::provider::{map_transport_error, parse_error_response, CompletionClient};
use super::types::{ChatMessage, CompletionRequest, CompletionResponse, LLMError, Role};

const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Google Gemini `generateContent` client
pub struct GeminiClient {
    http_client: Client,
    base_url: String,
    timeout_secs: u64,
}

impl GeminiClient {
    pub fn new(http_client: Client, timeout_secs: u64) -> Self {
        Self {
            http_client,
            base_url: GEMINI_API_URL.to_string(),
            timeout_secs,
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn build_request_body(&self, system: Option<&str>, messages: &[ChatMessage]) -> serde_json::Value {
        let contents: Vec<serde_json::Value> = messages
            .iter()
            .map(|m| {
                let role = match m.role() {
                    Role::User => "user",
                    Role::Assistant => "model",
                };
                json!({
                    "role": role,
                    "parts": [{ "text": m.content() }]
                })
            })
            .collect();

        let mut body = json!({
            "contents": contents,
        });

        if let Some(system) = system {
            body["systemInstruction"] = json!({
                "parts": [{ "text": system }]
            });
        }

        body
    }

    fn get_endpoint(&self, model: &str) -> String {
        format!("{}/{}:generateContent", self.base_url, model)
    }
}

#[async_trait]
impl CompletionClient for GeminiClient {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LLMError> {
        let body = self.build_request_body(request.system.as_deref(), &request.messages);
        let url = self.get_endpoint(&request.model);

        let response = self
            .http_client
            .post(&url)
            .header("x-goog-api-key", request.credential.expose())
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

        let resp: GeminiResponse = response.json().await.map_err(|e| LLMError::ParseError {
            message: e.to_string(),
        })?;

        convert_response(resp, &request.model)
    }
}

fn convert_response(resp: GeminiResponse, model: &str) -> Result<CompletionResponse, LLMError> {
    if let Some(reason) = resp.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(LLMError::ContentFiltered { reason });
    }

    let candidate = resp.candidates.into_iter().next().unwrap_or_default();
    let text: String = candidate
        .content
        .and_then(|c| c.parts)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|p| p.text)
        .collect::<Vec<_>>()
        .join("");

    if text.trim().is_empty() {
        return match candidate.finish_reason.as_deref() {
            Some(reason @ ("SAFETY" | "RECITATION" | "BLOCKLIST" | "PROHIBITED_CONTENT")) => {
                Err(LLMError::ContentFiltered {
                    reason: reason.to_string(),
                })
            }
            _ => Err(LLMError::EmptyResponse),
        };
    }

    Ok(CompletionResponse {
        text,
        model: resp.model_version.unwrap_or_else(|| model.to_string()),
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    prompt_feedback: Option<GeminiPromptFeedback>,
    #[serde(default)]
    model_version: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiContent {
    parts: Option<Vec<GeminiPart>>,
}

#[derive(Debug, Deserialize)]
struct GeminiPart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPromptFeedback {
    block_reason: Option<String>,
}
