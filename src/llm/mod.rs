pub mod gemini;
pub mod manager;
pub mod models;
pub mod openrouter;
pub mod provider;
pub mod types;

pub use manager::{CompletionEvent, CompletionManager};
pub use models::{ModelInfo, Provider};
pub use provider::{CompletionClient, ProviderClient};
pub use types::*;
