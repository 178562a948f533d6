use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChatError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    #[error("Model {model} is not supported by {provider}")]
    UnsupportedModel { provider: String, model: String },

    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    #[error("Completion channel closed")]
    ChannelClosed,
}

pub type Result<T> = std::result::Result<T, ChatError>;
