//! Error types for the FPL assistant
//!
//! Display strings double as user-facing replies: the assistant hands most
//! failures straight back to the user in place of a model answer.

use std::time::Duration;

use thiserror::Error;

/// Result type alias for assistant operations
pub type Result<T> = std::result::Result<T, Error>;

/// A single failed provider attempt, kept for the combined error message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderFailure {
    /// Label shown to the user (e.g. "OpenAI", "Gemini (text-only)")
    pub provider: String,
    /// Provider error text
    pub message: String,
}

/// Errors that can occur in the assistant
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error (missing key, bad setting)
    #[error("Error: {0}")]
    Config(String),

    /// FPL data could not be fetched or parsed
    #[error("Error fetching FPL data: {0}")]
    Fetch(String),

    /// The FPL entry for a user id does not exist
    #[error(
        "Team Not Found. Please ensure your User ID is correct and you have saved your initial squad on the FPL website."
    )]
    TeamNotFound,

    /// Provider rejected the configured API key
    #[error("Error: Invalid {provider} API key.")]
    InvalidCredentials { provider: &'static str },

    /// Every provider in the fallback chain failed
    #[error("{}", join_failures(.0))]
    Providers(Vec<ProviderFailure>),

    /// The model call did not finish within the request timeout
    #[error("Error: the AI assistant did not respond within {}s", .0.as_secs())]
    Timeout(Duration),

    /// Malformed client input
    #[error("{0}")]
    BadRequest(String),

    /// Client payload exceeds a configured limit
    #[error("{0}")]
    PayloadTooLarge(String),

    /// Image decoding or re-encoding error
    #[error("image error: {0}")]
    Image(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}

fn join_failures(failures: &[ProviderFailure]) -> String {
    if failures.is_empty() {
        return "Error: No AI provider could handle the request.".to_string();
    }
    failures
        .iter()
        .map(|f| format!("{} error: {}", f.provider, f.message))
        .collect::<Vec<_>>()
        .join(" | ")
}
