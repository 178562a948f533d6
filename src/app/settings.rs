//! Active configuration and the settings draft edited in the settings dialog
//!
//! A draft is a detached copy of the active configuration. Edits never touch
//! the active configuration; `commit` produces the replacement, which the
//! session applies in one step.

use crate::config::{ChatConfig, Credentials, SecretString};
use crate::error::{ChatError, Result};
use crate::llm::Provider;

/// The committed provider/model/credential set used for sending.
///
/// `model` is always a member of `provider.supported_models()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveConfiguration {
    provider: Provider,
    model: String,
    credentials: Credentials,
}

impl ActiveConfiguration {
    /// Build a configuration, coercing an unsupported model to the provider default
    pub fn new(provider: Provider, model: impl Into<String>, credentials: Credentials) -> Self {
        let model = model.into();
        let model = if provider.supports(&model) {
            model
        } else {
            if !model.is_empty() {
                tracing::debug!(
                    "Model {} is not offered by {}, using {}",
                    model,
                    provider.display_name(),
                    provider.default_model()
                );
            }
            provider.default_model().to_string()
        };
        Self {
            provider,
            model,
            credentials,
        }
    }

    /// Provider default with no credentials
    pub fn for_provider(provider: Provider) -> Self {
        Self::new(provider, provider.default_model(), Credentials::new())
    }

    /// Configuration described by the config file, with externally supplied keys
    pub fn from_config(config: &ChatConfig, credentials: Credentials) -> Self {
        let provider = config.defaults.provider;
        Self::new(provider, config.model_for_provider(provider), credentials)
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Credential for the active provider
    pub fn active_credential(&self) -> SecretString {
        self.credentials.get(self.provider)
    }
}

impl Default for ActiveConfiguration {
    fn default() -> Self {
        Self::for_provider(Provider::default())
    }
}

/// Scratch copy of the active configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftConfiguration {
    provider: Provider,
    model: String,
    credentials: Credentials,
}

impl DraftConfiguration {
    /// Snapshot the active configuration
    pub fn open(from: &ActiveConfiguration) -> Self {
        Self {
            provider: from.provider,
            model: from.model.clone(),
            credentials: from.credentials.clone(),
        }
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn credential(&self, provider: Provider) -> SecretString {
        self.credentials.get(provider)
    }

    /// Models the model picker should offer for the current draft provider
    pub fn available_models(&self) -> &'static [crate::llm::ModelInfo] {
        self.provider.supported_models()
    }

    /// Switch provider, resetting the model when the new provider does not offer it
    pub fn set_provider(&mut self, provider: Provider) {
        self.provider = provider;
        if !provider.supports(&self.model) {
            self.model = provider.default_model().to_string();
        }
    }

    /// Select a model of the draft's provider; anything else is rejected
    pub fn set_model(&mut self, model: &str) -> Result<()> {
        if !self.provider.supports(model) {
            return Err(ChatError::UnsupportedModel {
                provider: self.provider.display_name().to_string(),
                model: model.to_string(),
            });
        }
        self.model = model.to_string();
        Ok(())
    }

    pub fn set_credential(&mut self, provider: Provider, secret: impl Into<SecretString>) {
        self.credentials.set(provider, secret.into());
    }

    /// Finish editing: trim every credential and produce the replacement configuration
    pub fn commit(self) -> ActiveConfiguration {
        ActiveConfiguration {
            credentials: self.credentials.trimmed(),
            provider: self.provider,
            model: self.model,
        }
    }

    /// Discard the draft
    pub fn cancel(self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn configured() -> ActiveConfiguration {
        let mut credentials = Credentials::new();
        credentials.set(Provider::Gemini, "g-key".into());
        credentials.set(Provider::OpenRouter, "or-key".into());
        ActiveConfiguration::new(Provider::Gemini, "gemini-2.5-pro", credentials)
    }

    #[test]
    fn test_default_configuration() {
        let config = ActiveConfiguration::default();
        assert_eq!(config.provider(), Provider::Gemini);
        assert_eq!(config.model(), "gemini-3-flash-preview");
        assert!(config.active_credential().is_blank());
    }

    #[test]
    fn test_new_coerces_unsupported_model() {
        let config = ActiveConfiguration::new(Provider::OpenRouter, "gemini-2.5-pro", Credentials::new());
        assert_eq!(config.model(), "stepfun/step-3.5-flash:free");
    }

    #[test]
    fn test_from_config() {
        let mut file = ChatConfig::default();
        file.defaults.provider = Provider::OpenRouter;
        file.set_model_for_provider(Provider::OpenRouter, "openai/gpt-oss-120b:free");

        let config = ActiveConfiguration::from_config(&file, Credentials::new());
        assert_eq!(config.provider(), Provider::OpenRouter);
        assert_eq!(config.model(), "openai/gpt-oss-120b:free");
    }

    #[test]
    fn test_draft_does_not_alias_active() {
        let active = configured();
        let mut draft = DraftConfiguration::open(&active);

        draft.set_provider(Provider::OpenRouter);
        draft.set_credential(Provider::Gemini, "changed");

        assert_eq!(active.provider(), Provider::Gemini);
        assert_eq!(active.model(), "gemini-2.5-pro");
        assert_eq!(active.credentials().get(Provider::Gemini).expose(), "g-key");
    }

    #[rstest]
    #[case(Provider::Gemini)]
    #[case(Provider::OpenRouter)]
    fn test_set_provider_keeps_model_compatible(#[case] provider: Provider) {
        for start in Provider::ALL {
            for model in start.supported_models() {
                let mut draft = DraftConfiguration::open(&ActiveConfiguration::new(
                    start,
                    model.id,
                    Credentials::new(),
                ));
                draft.set_provider(provider);
                assert!(provider.supports(draft.model()));
            }
        }
    }

    #[test]
    fn test_set_provider_resets_to_default() {
        let mut draft = DraftConfiguration::open(&configured());
        draft.set_provider(Provider::OpenRouter);
        assert_eq!(draft.model(), "stepfun/step-3.5-flash:free");

        draft.set_provider(Provider::Gemini);
        assert_eq!(draft.model(), "gemini-3-flash-preview");
    }

    #[test]
    fn test_set_same_provider_keeps_model() {
        let mut draft = DraftConfiguration::open(&configured());
        draft.set_provider(Provider::Gemini);
        assert_eq!(draft.model(), "gemini-2.5-pro");
    }

    #[test]
    fn test_set_model_rejects_foreign_model() {
        let mut draft = DraftConfiguration::open(&configured());
        let err = draft.set_model("openai/gpt-oss-120b:free").unwrap_err();
        assert!(matches!(err, ChatError::UnsupportedModel { .. }));
        assert_eq!(draft.model(), "gemini-2.5-pro");

        draft.set_model("gemini-2.5-flash").unwrap();
        assert_eq!(draft.model(), "gemini-2.5-flash");
    }

    #[test]
    fn test_available_models_follow_provider() {
        let mut draft = DraftConfiguration::open(&configured());
        assert_eq!(draft.available_models().len(), 5);
        draft.set_provider(Provider::OpenRouter);
        assert_eq!(draft.available_models().len(), 2);
    }

    #[test]
    fn test_commit_without_edits_round_trips() {
        let active = configured();
        let committed = DraftConfiguration::open(&active).commit();
        assert_eq!(committed, active);
    }

    #[test]
    fn test_commit_trims_credentials() {
        let mut draft = DraftConfiguration::open(&ActiveConfiguration::default());
        draft.set_credential(Provider::Gemini, "  g-key\n");
        draft.set_credential(Provider::OpenRouter, "\tor-key ");

        let committed = draft.commit();
        assert_eq!(committed.credentials().get(Provider::Gemini).expose(), "g-key");
        assert_eq!(committed.credentials().get(Provider::OpenRouter).expose(), "or-key");
    }

    #[test]
    fn test_commit_carries_every_field() {
        let mut draft = DraftConfiguration::open(&configured());
        draft.set_provider(Provider::OpenRouter);
        draft.set_model("openai/gpt-oss-120b:free").unwrap();
        draft.set_credential(Provider::OpenRouter, "new-or");

        let committed = draft.commit();
        assert_eq!(committed.provider(), Provider::OpenRouter);
        assert_eq!(committed.model(), "openai/gpt-oss-120b:free");
        assert_eq!(committed.active_credential().expose(), "new-or");
        assert_eq!(committed.credentials().get(Provider::Gemini).expose(), "g-key");
    }

    #[test]
    fn test_cancel_leaves_active_untouched() {
        let active = configured();
        let mut draft = DraftConfiguration::open(&active);
        draft.set_provider(Provider::OpenRouter);
        draft.cancel();
        assert_eq!(active, configured());
    }
}
