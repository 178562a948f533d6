//! Static catalog of supported providers and their models
//!
//! Every provider owns a non-empty, ordered model list and exactly one
//! default model that is a member of that list.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ChatError;

/// Model information
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelInfo {
    pub id: &'static str,
    pub name: &'static str,
}

impl ModelInfo {
    pub const fn new(id: &'static str, name: &'static str) -> Self {
        Self { id, name }
    }
}

/// Per-provider catalog entry
#[derive(Debug)]
struct Catalog {
    default_model: &'static str,
    models: &'static [ModelInfo],
}

static GEMINI: Catalog = Catalog {
    default_model: "gemini-3-flash-preview",
    models: &[
        ModelInfo::new("gemini-3-flash-preview", "Gemini 3 Flash (preview)"),
        ModelInfo::new("gemini-2.5-flash", "Gemini 2.5 Flash"),
        ModelInfo::new("gemini-2.5-flash-lite", "Gemini 2.5 Flash Lite"),
        ModelInfo::new("gemini-2.5-pro", "Gemini 2.5 Pro"),
        ModelInfo::new("gemini-flash-latest", "Gemini Flash (latest)"),
    ],
};

static OPENROUTER: Catalog = Catalog {
    default_model: "stepfun/step-3.5-flash:free",
    models: &[
        ModelInfo::new("stepfun/step-3.5-flash:free", "Step 3.5 Flash (free)"),
        ModelInfo::new("openai/gpt-oss-120b:free", "GPT-OSS 120B (free)"),
    ],
};

/// Upstream chat-completion service family
#[derive(Debug, Clone, Copy, Default, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    Gemini,
    OpenRouter,
}

impl Provider {
    pub const ALL: [Provider; 2] = [Provider::Gemini, Provider::OpenRouter];

    fn catalog(self) -> &'static Catalog {
        match self {
            Provider::Gemini => &GEMINI,
            Provider::OpenRouter => &OPENROUTER,
        }
    }

    /// Stable identifier used in config files and on the command line
    pub fn as_str(self) -> &'static str {
        match self {
            Provider::Gemini => "gemini",
            Provider::OpenRouter => "openrouter",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Provider::Gemini => "Gemini",
            Provider::OpenRouter => "OpenRouter",
        }
    }

    /// Supported models, in display order
    pub fn supported_models(self) -> &'static [ModelInfo] {
        self.catalog().models
    }

    pub fn default_model(self) -> &'static str {
        self.catalog().default_model
    }

    pub fn supports(self, model: &str) -> bool {
        self.supported_models().iter().any(|m| m.id == model)
    }

    /// Look up catalog metadata for a model of this provider
    pub fn model_info(self, model: &str) -> Option<&'static ModelInfo> {
        self.supported_models().iter().find(|m| m.id == model)
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Provider {
    type Err = ChatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gemini" | "google" => Ok(Provider::Gemini),
            "openrouter" => Ok(Provider::OpenRouter),
            other => Err(ChatError::UnknownProvider(other.to_string())),
        }
    }
}
