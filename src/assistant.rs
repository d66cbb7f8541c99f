//! The request pipeline shared by every front-end
//!
//! A turn optionally asks the model whether FPL data is needed, fetches a
//! snapshot, builds the prompt, records the user message, calls the model
//! under a timeout and records the reply.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use crate::config::Config;
use crate::fpl::{FplClient, SnapshotSource};
use crate::llm::ModelClient;
use crate::prompt::{self, PersonaVariant, PromptBuilder, PromptLimits};
use crate::session::{InMemorySessionStore, Message, SessionStore};
use crate::tokens::default_estimator;
use crate::{Error, Result};

/// When FPL data is fetched for a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchPolicy {
    /// Every turn carries a fresh snapshot
    #[default]
    Always,
    /// Ask the model first whether the question needs data
    Router,
}

impl FetchPolicy {
    /// Parse a configuration value (case-insensitive)
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "always" => Some(Self::Always),
            "router" | "auto" => Some(Self::Router),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Always => "always",
            Self::Router => "router",
        }
    }
}

/// One user turn
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    /// Screenshot as a `data:` URL
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
    /// FPL entry id for squad lookups
    #[serde(default)]
    pub user_id: Option<String>,
}

impl ChatRequest {
    #[must_use]
    pub fn text(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }
}

/// Per-turn behaviour
#[derive(Debug, Clone)]
pub struct AssistantSettings {
    pub fetch_policy: FetchPolicy,
    /// Upper bound on a single model call
    pub timeout: Duration,
    pub max_prompt_tokens: usize,
    /// Entry id used when a request carries none
    pub default_user_id: Option<String>,
}

impl AssistantSettings {
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            fetch_policy: config.fpl.fetch_policy,
            timeout: config.llm.timeout,
            max_prompt_tokens: config.limits.max_prompt_tokens,
            default_user_id: config.fpl.user_id.clone(),
        }
    }
}

/// FPL chat assistant
pub struct Assistant {
    source: Arc<dyn SnapshotSource>,
    sessions: Arc<dyn SessionStore>,
    prompts: PromptBuilder,
    model: ModelClient,
    settings: AssistantSettings,
}

impl Assistant {
    #[must_use]
    pub fn new(
        source: Arc<dyn SnapshotSource>,
        sessions: Arc<dyn SessionStore>,
        prompts: PromptBuilder,
        model: ModelClient,
        settings: AssistantSettings,
    ) -> Self {
        Self {
            source,
            sessions,
            prompts,
            model,
            settings,
        }
    }

    /// Wire the default fetcher, session store and model client
    ///
    /// # Errors
    ///
    /// Returns error if an HTTP client cannot be built
    pub fn from_config(config: &Config) -> Result<Self> {
        let estimator = default_estimator(&config.llm.openai_model);
        let sessions = Arc::new(InMemorySessionStore::new(
            config.limits.session_history_max,
            estimator.clone(),
        ));
        let prompts = PromptBuilder::new(estimator, PromptLimits::from(&config.limits));

        Ok(Self::new(
            Arc::new(FplClient::from_config(&config.fpl)?),
            sessions,
            prompts,
            ModelClient::from_config(config)?,
            AssistantSettings::from_config(config),
        ))
    }

    /// Session history, for front-ends that display it
    #[must_use]
    pub fn sessions(&self) -> &Arc<dyn SessionStore> {
        &self.sessions
    }

    /// Answer a turn
    ///
    /// Fetch, configuration and provider failures come back as `Ok` reply
    /// text so they reach the user like any other answer.
    ///
    /// # Errors
    ///
    /// Returns `Timeout` if the model does not answer in time
    pub async fn respond(&self, request: &ChatRequest) -> Result<String> {
        let image = request.image.as_deref().filter(|i| !i.is_empty());
        let user_id = request
            .user_id
            .as_deref()
            .or(self.settings.default_user_id.as_deref());

        let wants_data = match self.settings.fetch_policy {
            FetchPolicy::Router if image.is_none() => self.route(&request.message).await,
            _ => true,
        };

        let prompt = if wants_data {
            match self.source.fetch(user_id).await {
                Ok(snapshot) => self.prompts.build(
                    &snapshot,
                    &request.message,
                    PersonaVariant::for_image(image.is_some()),
                ),
                Err(e) => {
                    tracing::warn!(error = %e, "FPL data unavailable");
                    return Ok(e.to_string());
                }
            }
        } else {
            prompt::conversational_prompt(&request.message)
        };

        self.converse(request.session_id.as_deref(), &request.message, &prompt, image)
            .await
    }

    /// Ask the model whether the question needs FPL data
    async fn route(&self, question: &str) -> bool {
        let decision = tokio::time::timeout(
            self.settings.timeout,
            self.model.ask(&prompt::router_prompt(question), None),
        )
        .await;

        match decision {
            Ok(Ok(reply)) => {
                let wants = prompt::router_wants_data(&reply);
                tracing::debug!(decision = %reply.trim(), wants_data = wants, "router decision");
                wants
            }
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "router call failed, fetching data");
                true
            }
            Err(_) => {
                tracing::warn!("router call timed out, fetching data");
                true
            }
        }
    }

    async fn converse(
        &self,
        session_id: Option<&str>,
        message: &str,
        prompt: &str,
        image: Option<&str>,
    ) -> Result<String> {
        let max_tokens = self.settings.max_prompt_tokens;

        let history = match session_id {
            Some(id) => {
                self.sessions.append(id, Message::user(message));
                self.sessions.trim_to_fit(id, prompt, max_tokens);
                self.sessions.history(id)
            }
            None => Vec::new(),
        };
        let full_prompt = prompt::with_history(prompt, &history);

        let started = std::time::Instant::now();
        let reply = match tokio::time::timeout(self.settings.timeout, self.model.ask(&full_prompt, image)).await {
            Err(_) => {
                tracing::warn!(
                    timeout_secs = self.settings.timeout.as_secs(),
                    "model call timed out"
                );
                return Err(Error::Timeout(self.settings.timeout));
            }
            Ok(Ok(reply)) => reply,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "model call failed");
                e.to_string()
            }
        };
        tracing::info!(
            session_id = session_id.unwrap_or("-"),
            elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            history = history.len(),
            "answered turn"
        );

        if let Some(id) = session_id {
            self.sessions.append(id, Message::assistant(reply.clone()));
            self.sessions.trim_to_fit(id, prompt, max_tokens);
        }

        Ok(reply)
    }
}
