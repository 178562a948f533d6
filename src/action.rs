use crate::app::DocumentContext;
use crate::config::SecretString;
use crate::llm::Provider;

/// Host-facing operations on a chat panel
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    SetPanelVisible(bool),
    ChangeInput(String),
    Send,
    ClearHistory,

    // Settings dialog
    OpenSettings,
    SelectProvider(Provider),
    SelectModel(String),
    SetCredential(Provider, SecretString),
    SaveSettings,
    CancelSettings,

    SetDocumentContext(Option<DocumentContext>),
}
