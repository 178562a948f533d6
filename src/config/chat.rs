//! Chat configuration for provider/model defaults and request settings
//!
//! Configuration is stored in `~/.config/reader-chat/chat.toml`. API keys
//! are never written here.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{ChatError, Result};
use crate::llm::Provider;

/// Main chat configuration struct
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Default provider and presentation
    pub defaults: ChatDefaults,
    /// Completion request settings
    pub request: RequestSettings,
    /// Selected model for Gemini
    pub gemini: ProviderConfig,
    /// Selected model for OpenRouter
    pub openrouter: ProviderConfig,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            defaults: ChatDefaults::default(),
            request: RequestSettings::default(),
            gemini: ProviderConfig::for_provider(Provider::Gemini),
            openrouter: ProviderConfig::for_provider(Provider::OpenRouter),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatDefaults {
    /// The provider selected when the panel opens
    pub provider: Provider,
    /// Render the conversation with the dark palette
    pub dark_theme: bool,
}

impl Default for ChatDefaults {
    fn default() -> Self {
        Self {
            provider: Provider::Gemini,
            dark_theme: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestSettings {
    /// Per-request timeout handed to the HTTP client
    pub timeout_secs: u64,
    /// Optional base URL override for Gemini (testing, proxies)
    pub gemini_base_url: Option<String>,
    /// Optional base URL override for OpenRouter
    pub openrouter_base_url: Option<String>,
}

impl Default for RequestSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 60,
            gemini_base_url: None,
            openrouter_base_url: None,
        }
    }
}

/// Per-provider configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ProviderConfig {
    /// Model last selected for this provider
    pub model: String,
}

impl ProviderConfig {
    fn for_provider(provider: Provider) -> Self {
        Self {
            model: provider.default_model().to_string(),
        }
    }
}

impl ChatConfig {
    /// Load chat config from a file path
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| ChatError::Config(format!("Failed to read chat.toml: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| ChatError::Config(format!("Failed to parse chat.toml: {}", e)))
    }

    /// Save chat config to a file path
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| ChatError::Config(format!("Failed to create config dir: {}", e)))?;
            }
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| ChatError::Config(format!("Failed to serialize chat config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| ChatError::Config(format!("Failed to write chat.toml: {}", e)))?;

        Ok(())
    }

    fn provider_config(&self, provider: Provider) -> &ProviderConfig {
        match provider {
            Provider::Gemini => &self.gemini,
            Provider::OpenRouter => &self.openrouter,
        }
    }

    /// Stored model for a provider, falling back to the catalog default when
    /// the file names a model the provider does not support
    pub fn model_for_provider(&self, provider: Provider) -> &str {
        let model = self.provider_config(provider).model.as_str();
        if provider.supports(model) {
            model
        } else {
            provider.default_model()
        }
    }

    /// Remember the model selected for a provider
    pub fn set_model_for_provider(&mut self, provider: Provider, model: &str) {
        let entry = match provider {
            Provider::Gemini => &mut self.gemini,
            Provider::OpenRouter => &mut self.openrouter,
        };
        entry.model = model.to_string();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_default_chat_config() {
        let config = ChatConfig::default();
        assert_eq!(config.defaults.provider, Provider::Gemini);
        assert!(!config.defaults.dark_theme);
        assert_eq!(config.request.timeout_secs, 60);
        assert_eq!(config.model_for_provider(Provider::Gemini), "gemini-3-flash-preview");
        assert_eq!(
            config.model_for_provider(Provider::OpenRouter),
            "stepfun/step-3.5-flash:free"
        );
    }

    #[test]
    fn test_load_nonexistent_file_returns_default() {
        let config = ChatConfig::load(Path::new("/nonexistent/path/chat.toml")).unwrap();
        assert_eq!(config, ChatConfig::default());
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("chat.toml");

        let mut config = ChatConfig::default();
        config.defaults.provider = Provider::OpenRouter;
        config.defaults.dark_theme = true;
        config.request.timeout_secs = 15;
        config.set_model_for_provider(Provider::OpenRouter, "openai/gpt-oss-120b:free");

        config.save(&path).unwrap();

        let loaded = ChatConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_parse_custom_toml() {
        let toml_content = r#"
[defaults]
provider = "openrouter"
dark_theme = true

[gemini]
model = "gemini-2.5-pro"
"#;

        let config: ChatConfig = toml::from_str(toml_content).unwrap();
        assert_eq!(config.defaults.provider, Provider::OpenRouter);
        assert!(config.defaults.dark_theme);
        assert_eq!(config.request.timeout_secs, 60);
        assert_eq!(config.model_for_provider(Provider::Gemini), "gemini-2.5-pro");
        assert_eq!(
            config.model_for_provider(Provider::OpenRouter),
            "stepfun/step-3.5-flash:free"
        );
    }

    #[test]
    fn test_stale_model_falls_back_to_default() {
        let mut config = ChatConfig::default();
        config.set_model_for_provider(Provider::Gemini, "gemini-1.0-pro");
        assert_eq!(config.model_for_provider(Provider::Gemini), "gemini-3-flash-preview");
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("chat.toml");
        std::fs::write(&path, "[defaults\nprovider = ").unwrap();

        let err = ChatConfig::load(&path).unwrap_err();
        assert!(matches!(err, ChatError::Config(_)));
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let result: std::result::Result<ChatConfig, _> =
            toml::from_str("[defaults]\nprovider = \"anthropic\"\n");
        assert!(result.is_err());
    }
}
