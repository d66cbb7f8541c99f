//! Configuration management for the FPL assistant

pub mod file;
pub mod profile;

use std::path::PathBuf;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};

use crate::assistant::FetchPolicy;
use crate::fpl::DataSource;
use crate::fpl::retry::RetryPolicy;
use crate::llm::ProviderKind;

pub use file::AssistantConfigFile;
pub use profile::UserProfile;

/// Default static JSON mirror of the FPL API
pub const DEFAULT_MIRROR_URL: &str = "https://arshadfaizan360.github.io/fpl-data-mirror";

/// Default official FPL API base URL
pub const DEFAULT_API_URL: &str = "https://fantasy.premierleague.com/api";

/// Assistant configuration
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Provider API keys
    pub api_keys: ApiKeys,

    /// Model provider configuration
    pub llm: LlmConfig,

    /// FPL data source configuration
    pub fpl: FplConfig,

    /// Prompt, session and payload limits
    pub limits: LimitsConfig,

    /// HTTP API server configuration
    pub server: ServerConfig,
}

/// API keys for the model providers
#[derive(Debug, Clone, Default)]
pub struct ApiKeys {
    /// `OpenAI` API key
    pub openai: Option<SecretString>,

    /// Gemini (Google AI Studio) API key
    pub gemini: Option<SecretString>,
}

impl ApiKeys {
    /// Key for a given provider, if configured
    #[must_use]
    pub const fn for_provider(&self, kind: ProviderKind) -> Option<&SecretString> {
        match kind {
            ProviderKind::OpenAi => self.openai.as_ref(),
            ProviderKind::Gemini => self.gemini.as_ref(),
        }
    }
}

/// Model provider configuration
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Provider tried first
    pub provider: ProviderKind,

    /// `OpenAI` model identifier
    pub openai_model: String,

    /// Gemini model identifier
    pub gemini_model: String,

    /// `OpenAI` API base URL
    pub openai_base_url: String,

    /// Gemini API base URL
    pub gemini_base_url: String,

    /// Request-level timeout for a model call
    pub timeout: Duration,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::OpenAi,
            openai_model: "gpt-5-mini".to_string(),
            gemini_model: "gemini-2.0-flash".to_string(),
            openai_base_url: "https://api.openai.com/v1".to_string(),
            gemini_base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            timeout: Duration::from_secs(120),
        }
    }
}

/// FPL data source configuration
#[derive(Debug, Clone)]
pub struct FplConfig {
    /// Which upstream to read snapshots from
    pub source: DataSource,

    /// Mirror base URL
    pub mirror_url: String,

    /// Official API base URL
    pub api_url: String,

    /// Default FPL entry id for squad lookups
    pub user_id: Option<String>,

    /// Whether every turn fetches data or the model decides first
    pub fetch_policy: FetchPolicy,

    /// Backoff policy for 403 responses
    pub retry: RetryPolicy,
}

impl Default for FplConfig {
    fn default() -> Self {
        Self {
            source: DataSource::Mirror,
            mirror_url: DEFAULT_MIRROR_URL.to_string(),
            api_url: DEFAULT_API_URL.to_string(),
            user_id: None,
            fetch_policy: FetchPolicy::Always,
            retry: RetryPolicy::default(),
        }
    }
}

/// Prompt, session and payload limits
#[derive(Debug, Clone)]
pub struct LimitsConfig {
    /// Soft bound on messages kept per session
    pub session_history_max: usize,

    /// Estimated-token ceiling for history + prompt
    pub max_prompt_tokens: usize,

    /// Byte budget for an image sent to a provider
    pub image_max_bytes: usize,

    /// Character cut-off for the players section when truncating
    pub players_chars: usize,

    /// Character cut-off for each fixtures section when truncating
    pub fixtures_chars: usize,

    /// Longest accepted `image` field in a chat request
    pub max_image_chars: usize,

    /// Longest accepted request body
    pub max_body_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            session_history_max: 12,
            max_prompt_tokens: 400_000,
            image_max_bytes: 150_000,
            players_chars: 3000,
            fixtures_chars: 2000,
            max_image_chars: 8_000_000,
            max_body_bytes: 10 * 1024 * 1024,
        }
    }
}

/// HTTP API server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to listen on
    pub port: u16,

    /// Path to static files directory (web UI)
    pub static_dir: Option<PathBuf>,

    /// Interval between SSE heartbeat events
    pub heartbeat: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 5000,
            static_dir: None,
            heartbeat: Duration::from_secs(10),
        }
    }
}

/// Read an environment variable, trimming whitespace and matching surrounding quotes
///
/// Empty values count as unset.
#[must_use]
pub fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().and_then(|v| sanitize_value(&v))
}

/// Trim whitespace and one pair of matching surrounding quotes
#[must_use]
pub fn sanitize_value(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let unquoted = ['"', '\'']
        .iter()
        .find_map(|q| {
            trimmed
                .strip_prefix(*q)
                .and_then(|rest| rest.strip_suffix(*q))
        })
        .unwrap_or(trimmed);

    if unquoted.is_empty() {
        None
    } else {
        Some(unquoted.to_string())
    }
}

fn parse_or_warn<T>(name: &str, value: Option<String>, parse: impl Fn(&str) -> Option<T>) -> Option<T> {
    let value = value?;
    let parsed = parse(&value);
    if parsed.is_none() {
        tracing::warn!(setting = name, value = %value, "ignoring unrecognised setting");
    }
    parsed
}

impl Config {
    /// Load configuration from `.env`, the environment and the TOML file
    ///
    /// Precedence is env > toml > default.
    #[must_use]
    pub fn load() -> Self {
        match dotenvy::dotenv() {
            Ok(path) => tracing::debug!(path = %path.display(), "loaded .env file"),
            Err(e) if e.not_found() => {}
            Err(e) => tracing::warn!(error = %e, "failed to load .env file"),
        }

        Self::from_sources(file::load_config_file(), env_var)
    }

    /// Build configuration from a parsed config file and an environment lookup
    #[must_use]
    pub fn from_sources(fc: AssistantConfigFile, env: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let secret = |value: Option<String>| {
            value
                .and_then(|v| sanitize_value(&v))
                .map(SecretString::from)
        };

        let api_keys = ApiKeys {
            openai: secret(env("OPENAI_API_KEY").or(fc.api_keys.openai)),
            gemini: secret(
                env("GEMINI_API_KEY")
                    .or_else(|| env("GOOGLE_API_KEY"))
                    .or(fc.api_keys.gemini),
            ),
        };

        let llm = LlmConfig {
            provider: parse_or_warn(
                "AI_PROVIDER",
                env("AI_PROVIDER").or(fc.llm.provider),
                ProviderKind::parse,
            )
            .unwrap_or(defaults.llm.provider),
            openai_model: env("OPENAI_MODEL")
                .or(fc.llm.openai_model)
                .unwrap_or(defaults.llm.openai_model),
            gemini_model: env("GEMINI_MODEL")
                .or(fc.llm.gemini_model)
                .unwrap_or(defaults.llm.gemini_model),
            openai_base_url: env("OPENAI_BASE_URL").unwrap_or(defaults.llm.openai_base_url),
            gemini_base_url: env("GEMINI_BASE_URL").unwrap_or(defaults.llm.gemini_base_url),
            timeout: env("FPL_ASSISTANT_MODEL_TIMEOUT_SECS")
                .and_then(|s| s.parse().ok())
                .or(fc.llm.timeout_secs)
                .map_or(defaults.llm.timeout, Duration::from_secs),
        };

        let retry = RetryPolicy {
            max_attempts: env("FPL_FETCH_MAX_ATTEMPTS")
                .and_then(|s| s.parse().ok())
                .or(fc.fpl.max_attempts)
                .unwrap_or(defaults.fpl.retry.max_attempts)
                .max(1),
            base_delay: env("FPL_FETCH_RETRY_DELAY_MS")
                .and_then(|s| s.parse().ok())
                .or(fc.fpl.retry_delay_ms)
                .map_or(defaults.fpl.retry.base_delay, Duration::from_millis),
            ..defaults.fpl.retry
        };

        let fpl = FplConfig {
            source: parse_or_warn(
                "FPL_DATA_SOURCE",
                env("FPL_DATA_SOURCE").or(fc.fpl.source),
                DataSource::parse,
            )
            .unwrap_or(defaults.fpl.source),
            mirror_url: env("FPL_MIRROR_URL")
                .or(fc.fpl.mirror_url)
                .unwrap_or(defaults.fpl.mirror_url),
            api_url: env("FPL_API_URL")
                .or(fc.fpl.api_url)
                .unwrap_or(defaults.fpl.api_url),
            user_id: env("FPL_USER_ID").or(fc.fpl.user_id),
            fetch_policy: parse_or_warn(
                "FPL_FETCH_POLICY",
                env("FPL_FETCH_POLICY").or(fc.fpl.fetch_policy),
                FetchPolicy::parse,
            )
            .unwrap_or(defaults.fpl.fetch_policy),
            retry,
        };

        let limits = LimitsConfig {
            session_history_max: env("FPL_ASSISTANT_SESSION_HISTORY_MAX")
                .and_then(|s| s.parse().ok())
                .or(fc.limits.session_history_max)
                .unwrap_or(defaults.limits.session_history_max),
            max_prompt_tokens: env("FPL_ASSISTANT_MAX_PROMPT_TOKENS")
                .and_then(|s| s.parse().ok())
                .or(fc.limits.max_prompt_tokens)
                .unwrap_or(defaults.limits.max_prompt_tokens),
            image_max_bytes: env("FPL_ASSISTANT_IMAGE_MAX_BYTES")
                .and_then(|s| s.parse().ok())
                .or(fc.limits.image_max_bytes)
                .unwrap_or(defaults.limits.image_max_bytes),
            max_image_chars: env("FPL_ASSISTANT_MAX_IMAGE_CHARS")
                .and_then(|s| s.parse().ok())
                .or(fc.limits.max_image_chars)
                .unwrap_or(defaults.limits.max_image_chars),
            ..defaults.limits
        };

        let server = ServerConfig {
            port: env("FPL_ASSISTANT_PORT")
                .or_else(|| env("PORT"))
                .and_then(|s| s.parse().ok())
                .or(fc.server.port)
                .unwrap_or(defaults.server.port),
            static_dir: env("FPL_ASSISTANT_STATIC_DIR")
                .or(fc.server.static_dir)
                .map(PathBuf::from),
            heartbeat: env("FPL_ASSISTANT_HEARTBEAT_SECS")
                .and_then(|s| s.parse().ok())
                .or(fc.server.heartbeat_secs)
                .map_or(defaults.server.heartbeat, |secs: u64| Duration::from_secs(secs.max(1))),
        };

        Self {
            api_keys,
            llm,
            fpl,
            limits,
            server,
        }
    }

    /// Fill gaps from a terminal-chat profile
    ///
    /// Explicit configuration wins; the profile only supplies missing values.
    pub fn apply_profile(&mut self, profile: &UserProfile) {
        if self.fpl.user_id.is_none() {
            self.fpl.user_id.clone_from(&profile.user_id);
        }
        if self.api_keys.gemini.is_none() {
            self.api_keys.gemini = profile
                .api_key
                .as_deref()
                .and_then(sanitize_value)
                .map(SecretString::from);
        }
    }

    /// Masked summary of the configured keys
    #[must_use]
    pub fn key_status(&self) -> KeyStatus {
        let masked = |key: Option<&SecretString>| key.map(|k| mask_key(k.expose_secret()));
        KeyStatus {
            ai_provider: self.llm.provider.as_str(),
            openai_key_present: self.api_keys.openai.is_some(),
            openai_key_masked: masked(self.api_keys.openai.as_ref()),
            gemini_key_present: self.api_keys.gemini.is_some(),
            gemini_key_masked: masked(self.api_keys.gemini.as_ref()),
        }
    }
}

/// Safe-to-display key summary
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct KeyStatus {
    pub ai_provider: &'static str,
    pub openai_key_present: bool,
    pub openai_key_masked: Option<String>,
    pub gemini_key_present: bool,
    pub gemini_key_masked: Option<String>,
}

/// Mask a key: short keys keep first and last char, longer ones 6 leading and 4 trailing
#[must_use]
pub fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    let (head, tail) = if chars.len() <= 8 { (1, 1) } else { (6, 4) };
    let head: String = chars.iter().take(head).collect();
    let tail: String = chars[chars.len().saturating_sub(tail)..].iter().collect();
    format!("{head}...{tail}")
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).and_then(|v| sanitize_value(v))
    }

    #[test]
    fn sanitize_strips_whitespace_and_quotes() {
        assert_eq!(sanitize_value("  sk-abc \n"), Some("sk-abc".to_string()));
        assert_eq!(sanitize_value("\"sk-abc\""), Some("sk-abc".to_string()));
        assert_eq!(sanitize_value("'sk-abc'"), Some("sk-abc".to_string()));
        assert_eq!(sanitize_value("\"sk-abc'"), Some("\"sk-abc'".to_string()));
        assert_eq!(sanitize_value("   "), None);
        assert_eq!(sanitize_value("\"\""), None);
    }

    #[test]
    fn defaults_without_sources() {
        let config = Config::from_sources(AssistantConfigFile::default(), env_from(&[]));
        assert_eq!(config.llm.provider, ProviderKind::OpenAi);
        assert_eq!(config.fpl.source, DataSource::Mirror);
        assert_eq!(config.fpl.fetch_policy, FetchPolicy::Always);
        assert_eq!(config.limits.session_history_max, 12);
        assert_eq!(config.limits.max_prompt_tokens, 400_000);
        assert_eq!(config.server.port, 5000);
        assert!(config.api_keys.openai.is_none());
    }

    #[test]
    fn env_overrides_file() {
        let mut fc = AssistantConfigFile::default();
        fc.llm.provider = Some("openai".to_string());
        fc.server.port = Some(8080);
        fc.api_keys.gemini = Some("file-gemini-key".to_string());

        let config = Config::from_sources(
            fc,
            env_from(&[
                ("AI_PROVIDER", "GEMINI"),
                ("FPL_ASSISTANT_PORT", "9000"),
                ("GEMINI_API_KEY", " 'env-gemini-key' "),
            ]),
        );

        assert_eq!(config.llm.provider, ProviderKind::Gemini);
        assert_eq!(config.server.port, 9000);
        assert_eq!(
            config.api_keys.gemini.as_ref().map(|k| k.expose_secret().to_string()),
            Some("env-gemini-key".to_string())
        );
    }

    #[test]
    fn unknown_provider_falls_back_to_default() {
        let config =
            Config::from_sources(AssistantConfigFile::default(), env_from(&[("AI_PROVIDER", "claude")]));
        assert_eq!(config.llm.provider, ProviderKind::OpenAi);
    }

    #[test]
    fn google_api_key_is_gemini_alias() {
        let config = Config::from_sources(
            AssistantConfigFile::default(),
            env_from(&[("GOOGLE_API_KEY", "AIza-alias")]),
        );
        assert!(config.api_keys.gemini.is_some());
    }

    #[test]
    fn profile_fills_missing_values_only() {
        let mut config = Config::from_sources(
            AssistantConfigFile::default(),
            env_from(&[("FPL_USER_ID", "111")]),
        );
        config.apply_profile(&UserProfile {
            user_id: Some("222".to_string()),
            api_key: Some("AIza-profile".to_string()),
        });

        assert_eq!(config.fpl.user_id.as_deref(), Some("111"));
        assert_eq!(
            config.api_keys.gemini.as_ref().map(|k| k.expose_secret().to_string()),
            Some("AIza-profile".to_string())
        );
    }

    #[test]
    fn mask_short_and_long_keys() {
        assert_eq!(mask_key("abcdefgh"), "a...h");
        assert_eq!(mask_key("sk-proj-1234567890wxyz"), "sk-pro...wxyz");
    }

    #[test]
    fn key_status_never_leaks_full_key() {
        let config = Config::from_sources(
            AssistantConfigFile::default(),
            env_from(&[("OPENAI_API_KEY", "sk-proj-supersecretvalue")]),
        );
        let status = config.key_status();

        assert_eq!(status.ai_provider, "openai");
        assert!(status.openai_key_present);
        assert!(!status.gemini_key_present);
        let masked = status.openai_key_masked.unwrap();
        assert!(!masked.contains("supersecret"));
        assert!(status.gemini_key_masked.is_none());
    }
}
