//! In-memory credential holding
//!
//! Secure at-rest storage belongs to the host; this module only keeps the
//! per-provider secrets of a configuration and makes sure they are zeroed
//! on drop and never printed.

use std::collections::BTreeMap;

use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::llm::Provider;

/// A secret value that is zeroed on drop
#[derive(Clone, Default, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SecretString(String);

impl SecretString {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// Copy with leading/trailing whitespace removed
    pub fn trimmed(&self) -> Self {
        Self(self.0.trim().to_string())
    }
}

impl std::fmt::Debug for SecretString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl From<&str> for SecretString {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for SecretString {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// Credentials keyed by provider, so switching providers keeps the other key
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    keys: BTreeMap<Provider, SecretString>,
}

impl Credentials {
    pub fn new() -> Self {
        Self::default()
    }

    /// Credential for a provider; blank when none was stored
    pub fn get(&self, provider: Provider) -> SecretString {
        self.keys.get(&provider).cloned().unwrap_or_default()
    }

    pub fn set(&mut self, provider: Provider, secret: SecretString) {
        self.keys.insert(provider, secret);
    }

    pub fn has(&self, provider: Provider) -> bool {
        self.keys.get(&provider).is_some_and(|s| !s.is_blank())
    }

    /// Copy with every credential trimmed
    pub fn trimmed(&self) -> Self {
        Self {
            keys: self
                .keys
                .iter()
                .map(|(provider, secret)| (*provider, secret.trimmed()))
                .collect(),
        }
    }
}
