use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::config::RequestSettings;

use super::gemini::GeminiClient;
use super::models::Provider;
use super::openrouter::OpenRouterClient;
use super::types::{CompletionRequest, CompletionResponse, LLMError};

/// Obtains an assistant reply for a conversation history.
///
/// Implementations report exactly one result per call.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LLMError>;
}

/// Routes each request to the client of the provider it names
pub struct ProviderClient {
    gemini: GeminiClient,
    openrouter: OpenRouterClient,
}

impl ProviderClient {
    pub fn new(settings: &RequestSettings) -> Self {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("Failed to build HTTP client with timeout: {}", e);
                Client::new()
            });

        let mut gemini = GeminiClient::new(http_client.clone(), settings.timeout_secs);
        if let Some(url) = &settings.gemini_base_url {
            gemini = gemini.with_base_url(url);
        }
        let mut openrouter = OpenRouterClient::new(http_client, settings.timeout_secs);
        if let Some(url) = &settings.openrouter_base_url {
            openrouter = openrouter.with_base_url(url);
        }

        Self { gemini, openrouter }
    }

    pub fn shared(settings: &RequestSettings) -> Arc<dyn CompletionClient> {
        Arc::new(Self::new(settings))
    }
}

#[async_trait]
impl CompletionClient for ProviderClient {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LLMError> {
        if request.credential.is_blank() {
            return Err(LLMError::MissingCredential {
                provider: request.provider.display_name().to_string(),
            });
        }
        match request.provider {
            Provider::Gemini => self.gemini.complete(request).await,
            Provider::OpenRouter => self.openrouter.complete(request).await,
        }
    }
}

/// Map an HTTP error status and body to an `LLMError`
pub(crate) fn parse_error_response(status: u16, body: &str) -> LLMError {
    if let Ok(json) = serde_json::from_str::<serde_json::Value>(body) {
        let error = &json["error"];
        let message = error["message"]
            .as_str()
            .unwrap_or("Unknown error")
            .to_string();

        match status {
            401 | 403 => LLMError::AuthError { message },
            429 => LLMError::RateLimit { message },
            400 => {
                if message.contains("API key") {
                    LLMError::AuthError { message }
                } else {
                    LLMError::InvalidRequest { message }
                }
            }
            404 => LLMError::ModelNotFound { model: message },
            _ => LLMError::ProviderError { status, message },
        }
    } else {
        LLMError::ProviderError {
            status,
            message: body.to_string(),
        }
    }
}

/// Map a transport failure to an `LLMError`
pub(crate) fn map_transport_error(err: reqwest::Error, timeout_secs: u64) -> LLMError {
    if err.is_timeout() {
        LLMError::Timeout { timeout_secs }
    } else {
        LLMError::NetworkError {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SecretString;
    use crate::llm::ChatMessage;
    use uuid::Uuid;

    #[test]
    fn test_parse_error_response_auth() {
        let body = r#"{"error":{"code":403,"message":"API key not valid"}}"#;
        let err = parse_error_response(403, body);
        assert!(matches!(err, LLMError::AuthError { .. }));
    }

    #[test]
    fn test_parse_error_response_bad_key_on_400() {
        let body = r#"{"error":{"code":400,"message":"API key not valid. Please pass a valid API key."}}"#;
        assert!(matches!(parse_error_response(400, body), LLMError::AuthError { .. }));
    }

    #[test]
    fn test_parse_error_response_rate_limit() {
        let body = r#"{"error":{"code":429,"message":"Rate limit exceeded"}}"#;
        let err = parse_error_response(429, body);
        assert_eq!(
            err,
            LLMError::RateLimit {
                message: "Rate limit exceeded".to_string()
            }
        );
    }

    #[test]
    fn test_parse_error_response_not_json() {
        let err = parse_error_response(502, "Bad Gateway");
        assert_eq!(
            err,
            LLMError::ProviderError {
                status: 502,
                message: "Bad Gateway".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_blank_credential_fails_without_network() {
        let client = ProviderClient::new(&RequestSettings::default());
        let request = CompletionRequest {
            id: Uuid::new_v4(),
            provider: Provider::OpenRouter,
            model: Provider::OpenRouter.default_model().to_string(),
            credential: SecretString::new("  "),
            system: None,
            messages: vec![ChatMessage::user("hello")],
        };

        let err = client.complete(request).await.unwrap_err();
        assert_eq!(
            err,
            LLMError::MissingCredential {
                provider: "OpenRouter".to_string()
            }
        );
    }
}
