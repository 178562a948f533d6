pub mod conversation_viewer;
pub mod markdown;
pub mod math;

pub use conversation_viewer::{ConversationRenderer, RenderedConversation, RenderedRow, RowFormat};
pub use markdown::{CommonMarkFormatter, MarkdownFormatter};
pub use math::{MathMode, MathRenderer, TexMarkupRenderer};

/// Failures reported by the rendering collaborators
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
    #[error("Markdown formatting failed: {0}")]
    Markdown(String),

    #[error("Math rendering failed: {0}")]
    Math(String),

    #[error("Formatter panicked: {0}")]
    Panicked(String),
}
