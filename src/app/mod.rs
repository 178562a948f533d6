// App module
// - mod.rs: ChatPanel, the host-facing surface wiring session, settings,
//   completions and rendering together
// - session.rs: conversation state machine
// - settings.rs: active configuration and settings draft

pub mod session;
pub mod settings;

use std::sync::Arc;

use crate::action::Action;
use crate::components::{ConversationRenderer, RenderedConversation};
use crate::error::{ChatError, Result};
use crate::llm::{CompletionClient, CompletionEvent, CompletionManager};

pub use session::{ChatSession, DocumentContext, SessionStatus};
pub use settings::{ActiveConfiguration, DraftConfiguration};

/// One chat panel attached to a document view
pub struct ChatPanel {
    session: ChatSession,
    /// Open settings dialog, if any
    draft: Option<DraftConfiguration>,
    completions: CompletionManager,
    renderer: ConversationRenderer,
}

impl ChatPanel {
    pub fn new(configuration: ActiveConfiguration, client: Arc<dyn CompletionClient>) -> Self {
        Self {
            session: ChatSession::new(configuration),
            draft: None,
            completions: CompletionManager::new(client),
            renderer: ConversationRenderer::new(),
        }
    }

    pub fn with_renderer(mut self, renderer: ConversationRenderer) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn session(&self) -> &ChatSession {
        &self.session
    }

    pub fn active_configuration(&self) -> &ActiveConfiguration {
        self.session.active_configuration()
    }

    pub fn set_panel_visible(&mut self, visible: bool) {
        self.session.set_panel_visible(visible);
    }

    pub fn change_input(&mut self, text: impl Into<String>) {
        self.session.change_input(text);
    }

    /// Send the input buffer. Must be called inside a tokio runtime.
    ///
    /// Returns whether a request was dispatched.
    pub fn send(&mut self) -> bool {
        match self.session.send() {
            Some(request) => {
                self.completions.dispatch(request);
                true
            }
            None => false,
        }
    }

    pub fn clear_history(&mut self) {
        self.session.clear_history();
    }

    /// Open the settings dialog on a fresh draft of the active configuration
    pub fn open_settings(&mut self) -> &mut DraftConfiguration {
        if self.draft.is_some() {
            tracing::debug!("Settings reopened, discarding previous draft");
        }
        self.draft.insert(DraftConfiguration::open(self.session.active_configuration()))
    }

    pub fn settings(&self) -> Option<&DraftConfiguration> {
        self.draft.as_ref()
    }

    pub fn settings_mut(&mut self) -> Option<&mut DraftConfiguration> {
        self.draft.as_mut()
    }

    /// Commit the open draft and make it active. Returns the new configuration.
    pub fn save_settings(&mut self) -> Option<ActiveConfiguration> {
        let Some(draft) = self.draft.take() else {
            tracing::debug!("Save ignored: settings are not open");
            return None;
        };
        let committed = draft.commit();
        self.session.apply_configuration(committed.clone());
        Some(committed)
    }

    pub fn cancel_settings(&mut self) {
        if let Some(draft) = self.draft.take() {
            draft.cancel();
        }
    }

    pub fn set_document_context(&mut self, document: Option<DocumentContext>) {
        self.session.set_document_context(document);
    }

    pub fn render(&self, is_dark: bool) -> RenderedConversation {
        self.renderer.render(self.session.messages(), is_dark)
    }

    /// Apply every completion that has already arrived. Returns how many were applied.
    pub fn poll_completions(&mut self) -> usize {
        let mut applied = 0;
        while let Some(event) = self.completions.try_next() {
            self.apply_completion(event);
            applied += 1;
        }
        applied
    }

    /// Wait for the outstanding request to finish and apply it.
    ///
    /// Returns `Ok(false)` straight away when nothing is in flight.
    pub async fn next_completion(&mut self) -> Result<bool> {
        if !self.session.is_sending() {
            return Ok(false);
        }
        let event = self.completions.next().await.ok_or(ChatError::ChannelClosed)?;
        self.apply_completion(event);
        Ok(true)
    }

    fn apply_completion(&mut self, event: CompletionEvent) {
        if self.session.in_flight() != Some(event.request_id) {
            tracing::warn!("Dropping completion {} with no matching request", event.request_id);
            return;
        }
        match event.outcome {
            Ok(response) => self.session.on_completion_success(response.text),
            Err(e) => self.session.on_completion_failure(e.to_string()),
        }
    }

    pub fn dispatch(&mut self, action: Action) {
        match action {
            Action::SetPanelVisible(visible) => self.set_panel_visible(visible),
            Action::ChangeInput(text) => self.change_input(text),
            Action::Send => {
                self.send();
            }
            Action::ClearHistory => self.clear_history(),
            Action::OpenSettings => {
                self.open_settings();
            }
            Action::SelectProvider(provider) => match self.settings_mut() {
                Some(draft) => draft.set_provider(provider),
                None => tracing::debug!("Provider change ignored: settings are not open"),
            },
            Action::SelectModel(model) => match self.settings_mut() {
                Some(draft) => {
                    if let Err(e) = draft.set_model(&model) {
                        tracing::debug!("Model change ignored: {}", e);
                    }
                }
                None => tracing::debug!("Model change ignored: settings are not open"),
            },
            Action::SetCredential(provider, secret) => match self.settings_mut() {
                Some(draft) => draft.set_credential(provider, secret),
                None => tracing::debug!("Credential change ignored: settings are not open"),
            },
            Action::SaveSettings => {
                self.save_settings();
            }
            Action::CancelSettings => self.cancel_settings(),
            Action::SetDocumentContext(document) => self.set_document_context(document),
        }
    }
}
