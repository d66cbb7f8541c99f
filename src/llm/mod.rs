//! Hosted LLM providers and the fallback chain across them

mod client;
pub mod gemini;
pub mod openai;

use async_trait::async_trait;

pub use client::ModelClient;
pub use gemini::GeminiProvider;
pub use openai::OpenAiProvider;

/// Supported model providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProviderKind {
    #[default]
    OpenAi,
    Gemini,
}

impl ProviderKind {
    /// Parse a configuration value (case-insensitive)
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "openai" => Some(Self::OpenAi),
            "gemini" | "google" => Some(Self::Gemini),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Gemini => "gemini",
        }
    }

    /// Name shown in user-facing errors
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::OpenAi => "OpenAI",
            Self::Gemini => "Gemini",
        }
    }

    /// Environment variable holding this provider's key
    #[must_use]
    pub const fn env_var(self) -> &'static str {
        match self {
            Self::OpenAi => "OPENAI_API_KEY",
            Self::Gemini => "GEMINI_API_KEY",
        }
    }

    /// The other provider
    #[must_use]
    pub const fn other(self) -> Self {
        match self {
            Self::OpenAi => Self::Gemini,
            Self::Gemini => Self::OpenAi,
        }
    }
}

/// Outcome of a failed provider call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// The provider rejected the API key
    InvalidCredentials,
    /// Any other failure (transport, status, empty reply)
    Failed(String),
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidCredentials => f.write_str("invalid API key"),
            Self::Failed(message) => f.write_str(message),
        }
    }
}

/// A text completion backend
#[async_trait]
pub trait LlmProvider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    /// Complete `prompt`, optionally with an image data URL attached
    async fn complete(&self, prompt: &str, image: Option<&str>) -> Result<String, ProviderError>;
}

/// Classify a non-success HTTP response
pub(crate) fn classify_status(status: reqwest::StatusCode, body: &str) -> ProviderError {
    if status == reqwest::StatusCode::UNAUTHORIZED
        || status == reqwest::StatusCode::FORBIDDEN
        || body.contains("API_KEY_INVALID")
        || body.contains("API key not valid")
        || body.contains("invalid_api_key")
    {
        ProviderError::InvalidCredentials
    } else {
        ProviderError::Failed(format!("{status} - {}", body.trim()))
    }
}
