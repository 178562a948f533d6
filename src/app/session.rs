//! Canonical chat state for one document panel and its transitions
//!
//! The session is either `Idle` or `Sending`. `send` is the only way into
//! `Sending` and the completion callbacks are the only way out, so at most
//! one request is outstanding and replies append in request order.

use uuid::Uuid;

use crate::llm::{ChatMessage, CompletionRequest};

use super::settings::ActiveConfiguration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Idle,
    Sending,
}

/// What the host tells the panel about the open document
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DocumentContext {
    pub title: String,
    pub current_page: Option<u32>,
    /// Text the reader has selected, if any
    pub selection: Option<String>,
}

impl DocumentContext {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn system_prompt(&self) -> String {
        let mut prompt = format!(
            "You are an assistant helping a reader with the document \"{}\".",
            self.title.trim()
        );
        if let Some(page) = self.current_page {
            prompt.push_str(&format!(" The reader is currently on page {}.", page));
        }
        if let Some(selection) = self.selection.as_deref().filter(|s| !s.trim().is_empty()) {
            prompt.push_str("\n\nSelected text:\n");
            prompt.push_str(selection.trim());
        }
        prompt.push_str(
            "\n\nAnswer in Markdown. Use $...$ for inline math and $$...$$ for display math.",
        );
        prompt
    }
}

#[derive(Debug, Clone)]
pub struct ChatSession {
    messages: Vec<ChatMessage>,
    input_buffer: String,
    is_sending: bool,
    last_error: Option<String>,
    panel_visible: bool,
    active_configuration: ActiveConfiguration,
    document: Option<DocumentContext>,
    /// Id of the request currently awaiting its completion
    in_flight: Option<Uuid>,
}

impl ChatSession {
    pub fn new(active_configuration: ActiveConfiguration) -> Self {
        Self {
            messages: Vec::new(),
            input_buffer: String::new(),
            is_sending: false,
            last_error: None,
            panel_visible: true,
            active_configuration,
            document: None,
            in_flight: None,
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn input(&self) -> &str {
        &self.input_buffer
    }

    pub fn is_sending(&self) -> bool {
        self.is_sending
    }

    pub fn status(&self) -> SessionStatus {
        if self.is_sending {
            SessionStatus::Sending
        } else {
            SessionStatus::Idle
        }
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn panel_visible(&self) -> bool {
        self.panel_visible
    }

    pub fn active_configuration(&self) -> &ActiveConfiguration {
        &self.active_configuration
    }

    pub fn document(&self) -> Option<&DocumentContext> {
        self.document.as_ref()
    }

    pub fn in_flight(&self) -> Option<Uuid> {
        self.in_flight
    }

    /// Header line shown above the conversation, e.g. `Gemini: gemini-2.5-pro`
    pub fn status_line(&self) -> String {
        format!(
            "{}: {}",
            self.active_configuration.provider().display_name(),
            self.active_configuration.model()
        )
    }

    pub fn change_input(&mut self, text: impl Into<String>) {
        self.input_buffer = text.into();
    }

    /// Accept the input buffer as a new user message.
    ///
    /// Returns the request to hand to the completion collaborator, or `None`
    /// when the input is blank or a request is already outstanding.
    pub fn send(&mut self) -> Option<CompletionRequest> {
        if self.is_sending {
            tracing::debug!("Send ignored: a request is already in flight");
            return None;
        }
        let text = self.input_buffer.trim();
        if text.is_empty() {
            tracing::debug!("Send ignored: input is blank");
            return None;
        }

        self.messages.push(ChatMessage::user(text));
        self.input_buffer.clear();
        self.last_error = None;
        self.is_sending = true;

        let config = &self.active_configuration;
        let request = CompletionRequest {
            id: Uuid::new_v4(),
            provider: config.provider(),
            model: config.model().to_string(),
            credential: config.active_credential(),
            system: self.document.as_ref().map(DocumentContext::system_prompt),
            messages: self.messages.clone(),
        };
        self.in_flight = Some(request.id);

        tracing::info!(
            "Sending {} messages to {} ({})",
            request.messages.len(),
            request.provider.display_name(),
            request.model
        );
        Some(request)
    }

    pub fn on_completion_success(&mut self, response_text: impl Into<String>) {
        if !self.is_sending {
            tracing::warn!("Completion received while idle, ignoring");
            return;
        }
        self.messages.push(ChatMessage::assistant(response_text));
        self.last_error = None;
        self.finish_request();
    }

    pub fn on_completion_failure(&mut self, error_description: impl Into<String>) {
        if !self.is_sending {
            tracing::warn!("Completion failure received while idle, ignoring");
            return;
        }
        let description = error_description.into();
        tracing::warn!("Completion failed: {}", description);
        self.last_error = Some(description);
        self.finish_request();
    }

    fn finish_request(&mut self) {
        self.is_sending = false;
        self.in_flight = None;
    }

    /// Drop the conversation; an outstanding request still completes into the new history
    pub fn clear_history(&mut self) {
        self.messages.clear();
    }

    pub fn set_panel_visible(&mut self, visible: bool) {
        self.panel_visible = visible;
    }

    pub fn apply_configuration(&mut self, configuration: ActiveConfiguration) {
        tracing::info!(
            "Active configuration: {} ({})",
            configuration.provider().display_name(),
            configuration.model()
        );
        self.active_configuration = configuration;
    }

    pub fn set_document_context(&mut self, document: Option<DocumentContext>) {
        self.document = document;
    }
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new(ActiveConfiguration::default())
    }
}
