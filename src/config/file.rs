//! TOML configuration file loading
//!
//! Supports `~/.config/fpl-assistant/config.toml` as a persistent config source.
//! All fields are optional; the file is a partial overlay on top of defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::Result;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct AssistantConfigFile {
    /// LLM configuration
    #[serde(default)]
    pub llm: LlmFileConfig,

    /// API keys for the model providers
    #[serde(default)]
    pub api_keys: ApiKeysFileConfig,

    /// FPL data source configuration
    #[serde(default)]
    pub fpl: FplFileConfig,

    /// Prompt, session and payload limits
    #[serde(default)]
    pub limits: LimitsFileConfig,

    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerFileConfig,
}

/// LLM-related configuration
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct LlmFileConfig {
    /// Preferred provider ("openai" or "gemini")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,

    /// `OpenAI` model identifier (e.g. "gpt-5-mini")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub openai_model: Option<String>,

    /// Gemini model identifier (e.g. "gemini-2.0-flash")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gemini_model: Option<String>,

    /// Seconds to wait for a model reply before giving up
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

/// API keys configuration
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ApiKeysFileConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub openai: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gemini: Option<String>,
}

/// FPL data source configuration
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct FplFileConfig {
    /// "mirror" or "official"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    /// Base URL of the static JSON mirror
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mirror_url: Option<String>,

    /// Base URL of the official FPL API
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    /// FPL entry id used for squad lookups
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    /// "always" or "router"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fetch_policy: Option<String>,

    /// Total attempts per request when the source answers 403
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_attempts: Option<u32>,

    /// Base backoff delay in milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_delay_ms: Option<u64>,
}

/// Limits configuration
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct LimitsFileConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_history_max: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_prompt_tokens: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_max_bytes: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_image_chars: Option<usize>,
}

/// Server/runtime configuration
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ServerFileConfig {
    /// API server port
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    /// Directory holding a static web UI
    #[serde(skip_serializing_if = "Option::is_none")]
    pub static_dir: Option<String>,

    /// Seconds between SSE heartbeat events
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heartbeat_secs: Option<u64>,
}

/// Load the TOML config file from the standard path
///
/// Returns `AssistantConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file() -> AssistantConfigFile {
    let Some(path) = config_file_path() else {
        return AssistantConfigFile::default();
    };

    if !path.exists() {
        return AssistantConfigFile::default();
    }

    match std::fs::read_to_string(&path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                AssistantConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            AssistantConfigFile::default()
        }
    }
}

/// Write the config file, creating parent directories as needed
///
/// # Errors
///
/// Returns error if the file cannot be serialized or written
pub fn save_config_file(path: &Path, config: &AssistantConfigFile) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = toml::to_string_pretty(config)
        .map_err(|e| crate::Error::Config(format!("failed to serialize config: {e}")))?;
    std::fs::write(path, content)?;
    tracing::info!(path = %path.display(), "wrote config file");
    Ok(())
}

/// Return the config file path: `~/.config/fpl-assistant/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("fpl-assistant").join("config.toml"))
}
