//! Provider, credential and model identity types.

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    Gemini,
    OpenAI,
}

const PROVIDER_PARSE_VALUES: &[&str] = &["gemini", "google", "openai", "gpt", "chatgpt"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid provider '{raw}'; expected one of: {expected:?}")]
pub struct ProviderParseError {
    raw: String,
    expected: &'static [&'static str],
}

impl ProviderParseError {
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }
}

impl Provider {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Provider::Gemini => "gemini",
            Provider::OpenAI => "openai",
        }
    }

    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Provider::Gemini => "Gemini",
            Provider::OpenAI => "GPT",
        }
    }

    /// Environment variables consulted for this provider's key, in priority order.
    #[must_use]
    pub const fn env_vars(self) -> &'static [&'static str] {
        match self {
            Provider::Gemini => &["GEMINI_API_KEY", "GOOGLE_API_KEY"],
            Provider::OpenAI => &["OPENAI_API_KEY"],
        }
    }

    #[must_use]
    pub const fn default_model(self) -> ModelName {
        match self {
            Provider::Gemini => ModelName::from_static(Provider::Gemini, "gemini-3-flash-preview"),
            Provider::OpenAI => ModelName::from_static(Provider::OpenAI, "gpt-5.2"),
        }
    }

    pub fn parse(s: &str) -> Result<Self, ProviderParseError> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gemini" | "google" => Ok(Provider::Gemini),
            "openai" | "gpt" | "chatgpt" => Ok(Provider::OpenAI),
            _ => Err(ProviderParseError {
                raw: s.trim().to_string(),
                expected: PROVIDER_PARSE_VALUES,
            }),
        }
    }

    #[must_use]
    pub const fn all() -> &'static [Provider] {
        &[Provider::Gemini, Provider::OpenAI]
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

// ============================================================================
// API Key Types
// ============================================================================

/// Provider-scoped API key.
///
/// `Debug` is manually implemented to redact the key value.
#[derive(Clone, PartialEq, Eq)]
pub enum ApiKey {
    Gemini(String),
    OpenAI(String),
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiKey::Gemini(_) => write!(f, "ApiKey::Gemini(<redacted>)"),
            ApiKey::OpenAI(_) => write!(f, "ApiKey::OpenAI(<redacted>)"),
        }
    }
}

impl ApiKey {
    #[must_use]
    pub fn new(provider: Provider, key: impl Into<String>) -> Self {
        match provider {
            Provider::Gemini => ApiKey::Gemini(key.into()),
            Provider::OpenAI => ApiKey::OpenAI(key.into()),
        }
    }

    #[must_use]
    pub const fn provider(&self) -> Provider {
        match self {
            ApiKey::Gemini(_) => Provider::Gemini,
            ApiKey::OpenAI(_) => Provider::OpenAI,
        }
    }

    #[must_use]
    pub fn expose_secret(&self) -> &str {
        match self {
            ApiKey::Gemini(key) | ApiKey::OpenAI(key) => key,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelParseError {
    #[error("model name cannot be empty")]
    EmptyInput,
    #[error("Gemini model must start with gemini- (got {0})")]
    GeminiPrefix(String),
    #[error("OpenAI model must start with gpt- (got {0})")]
    OpenAIPrefix(String),
}

/// A model identifier bound to the provider that serves it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelName {
    provider: Provider,
    #[serde(rename = "model")]
    name: Cow<'static, str>,
}

impl ModelName {
    pub fn parse(provider: Provider, raw: &str) -> Result<Self, ModelParseError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ModelParseError::EmptyInput);
        }

        let lower = trimmed.to_ascii_lowercase();
        match provider {
            Provider::Gemini if !lower.starts_with("gemini-") => {
                return Err(ModelParseError::GeminiPrefix(trimmed.to_string()));
            }
            Provider::OpenAI if !lower.starts_with("gpt-") => {
                return Err(ModelParseError::OpenAIPrefix(trimmed.to_string()));
            }
            _ => {}
        }

        Ok(Self {
            provider,
            name: Cow::Owned(trimmed.to_string()),
        })
    }

    const fn from_static(provider: Provider, name: &'static str) -> Self {
        Self {
            provider,
            name: Cow::Borrowed(name),
        }
    }

    #[must_use]
    pub const fn provider(&self) -> Provider {
        self.provider
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        self.name.as_ref()
    }
}

impl fmt::Display for ModelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.name.fmt(f)
    }
}
