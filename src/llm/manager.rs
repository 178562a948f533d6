use std::sync::Arc;

use tokio::sync::mpsc;
use uuid::Uuid;

use super::provider::CompletionClient;
use super::types::{CompletionRequest, CompletionResponse, LLMError};

/// Outcome of one dispatched completion request
#[derive(Debug, Clone)]
pub struct CompletionEvent {
    pub request_id: Uuid,
    pub outcome: Result<CompletionResponse, LLMError>,
}

/// Runs completion requests in the background and reports each outcome
/// exactly once over a channel
pub struct CompletionManager {
    client: Arc<dyn CompletionClient>,
    event_tx: mpsc::UnboundedSender<CompletionEvent>,
    event_rx: mpsc::UnboundedReceiver<CompletionEvent>,
}

impl CompletionManager {
    pub fn new(client: Arc<dyn CompletionClient>) -> Self {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        Self {
            client,
            event_tx,
            event_rx,
        }
    }

    /// Spawn the request on the current tokio runtime
    pub fn dispatch(&self, request: CompletionRequest) {
        let client = Arc::clone(&self.client);
        let event_tx = self.event_tx.clone();

        tokio::spawn(async move {
            let request_id = request.id;
            // The client runs in its own task so a panic still produces an event
            let outcome = match tokio::spawn(async move { client.complete(request).await }).await {
                Ok(outcome) => outcome,
                Err(e) => Err(LLMError::Internal {
                    message: format!("completion task failed: {}", e),
                }),
            };
            match &outcome {
                Ok(response) => tracing::info!(
                    "Completion {} finished: {} chars from {}",
                    request_id,
                    response.text.len(),
                    response.model
                ),
                Err(e) => tracing::warn!("Completion {} failed: {}", request_id, e),
            }
            if event_tx.send(CompletionEvent { request_id, outcome }).is_err() {
                tracing::debug!("Completion {} dropped: panel closed", request_id);
            }
        });
    }

    /// Next completion without waiting
    pub fn try_next(&mut self) -> Option<CompletionEvent> {
        self.event_rx.try_recv().ok()
    }

    /// Wait for the next completion. The manager holds a sender itself, so
    /// this only returns once an event arrives.
    pub async fn next(&mut self) -> Option<CompletionEvent> {
        self.event_rx.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SecretString;
    use crate::llm::{ChatMessage, Provider};
    use async_trait::async_trait;

    struct Echo;

    #[async_trait]
    impl CompletionClient for Echo {
        async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LLMError> {
            let last = request.messages.last().map(|m| m.content().to_string());
            match last {
                Some(text) if text == "fail" => Err(LLMError::NetworkError {
                    message: "offline".to_string(),
                }),
                Some(text) => Ok(CompletionResponse {
                    text: format!("echo: {}", text),
                    model: request.model,
                }),
                None => Err(LLMError::EmptyResponse),
            }
        }
    }

    fn request(text: &str) -> CompletionRequest {
        CompletionRequest {
            id: Uuid::new_v4(),
            provider: Provider::Gemini,
            model: "gemini-2.5-flash".to_string(),
            credential: SecretString::new("key"),
            system: None,
            messages: vec![ChatMessage::user(text)],
        }
    }

    #[tokio::test]
    async fn test_dispatch_reports_success() {
        let mut manager = CompletionManager::new(Arc::new(Echo));
        let req = request("hi");
        let id = req.id;
        manager.dispatch(req);

        let event = manager.next().await.unwrap();
        assert_eq!(event.request_id, id);
        assert_eq!(event.outcome.unwrap().text, "echo: hi");
    }

    #[tokio::test]
    async fn test_dispatch_reports_failure() {
        let mut manager = CompletionManager::new(Arc::new(Echo));
        manager.dispatch(request("fail"));

        let event = manager.next().await.unwrap();
        assert!(matches!(event.outcome, Err(LLMError::NetworkError { .. })));
    }

    struct Panicking;

    #[async_trait]
    impl CompletionClient for Panicking {
        async fn complete(&self, _request: CompletionRequest) -> Result<CompletionResponse, LLMError> {
            panic!("client bug")
        }
    }

    #[tokio::test]
    async fn test_client_panic_still_reports_once() {
        let mut manager = CompletionManager::new(Arc::new(Panicking));
        let req = request("hi");
        let id = req.id;
        manager.dispatch(req);

        let event = tokio::time::timeout(std::time::Duration::from_secs(5), manager.next())
            .await
            .expect("event arrives")
            .unwrap();
        assert_eq!(event.request_id, id);
        assert!(matches!(event.outcome, Err(LLMError::Internal { .. })));
        assert!(manager.try_next().is_none());
    }

    #[test]
    fn test_try_next_empty() {
        let mut manager = CompletionManager::new(Arc::new(Echo));
        assert!(manager.try_next().is_none());
    }
}
