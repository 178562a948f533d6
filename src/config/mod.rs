mod chat;
mod keystore;
mod theme;

pub use chat::{ChatConfig, ChatDefaults, ProviderConfig, RequestSettings};
pub use keystore::{Credentials, SecretString};
pub use theme::{ConversationPalette, HexColor};

use directories::BaseDirs;
use std::path::{Path, PathBuf};

use crate::error::{ChatError, Result};

const CONFIG_DIR: &str = "reader-chat";
const CHAT_CONFIG_FILE: &str = "chat.toml";
const LOG_FILE: &str = "reader-chat.log";

pub struct ConfigManager {
    config_dir: PathBuf,
    chat_config: ChatConfig,
}

impl ConfigManager {
    /// Load configuration from the platform config directory
    pub fn new() -> Result<Self> {
        let config_dir = Self::get_config_dir()?;
        Ok(Self::with_dir(config_dir))
    }

    /// Load configuration from an explicit directory
    pub fn with_dir(config_dir: impl Into<PathBuf>) -> Self {
        let config_dir = config_dir.into();
        let chat_config = Self::load_chat_config(&config_dir);
        Self {
            config_dir,
            chat_config,
        }
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn log_file_name(&self) -> &'static str {
        LOG_FILE
    }

    pub fn chat_config(&self) -> &ChatConfig {
        &self.chat_config
    }

    pub fn chat_config_mut(&mut self) -> &mut ChatConfig {
        &mut self.chat_config
    }

    pub fn save_chat_config(&self) -> Result<()> {
        self.ensure_config_dir()?;
        let path = self.config_dir.join(CHAT_CONFIG_FILE);
        self.chat_config.save(&path)
    }

    fn get_config_dir() -> Result<PathBuf> {
        BaseDirs::new()
            .map(|dirs| dirs.config_dir().join(CONFIG_DIR))
            .ok_or_else(|| ChatError::Config("Could not determine config directory".to_string()))
    }

    fn load_chat_config(config_dir: &Path) -> ChatConfig {
        let path = config_dir.join(CHAT_CONFIG_FILE);
        match ChatConfig::load(&path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Falling back to default chat config: {}", e);
                ChatConfig::default()
            }
        }
    }

    pub fn ensure_config_dir(&self) -> Result<()> {
        if !self.config_dir.exists() {
            std::fs::create_dir_all(&self.config_dir)
                .map_err(|e| ChatError::Config(format!("Failed to create config dir: {}", e)))?;
        }
        Ok(())
    }
}
