//! Shared test utilities

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use fpl_assistant::assistant::AssistantSettings;
use fpl_assistant::fpl::{Snapshot, SnapshotSource};
use fpl_assistant::llm::{LlmProvider, ModelClient, ProviderError, ProviderKind};
use fpl_assistant::prompt::{PromptBuilder, PromptLimits};
use fpl_assistant::tokens::HeuristicEstimator;
use fpl_assistant::{Assistant, Config, FetchPolicy, InMemorySessionStore};

/// Snapshot source returning canned data and counting fetches
#[derive(Default)]
pub struct StubSource {
    pub fetches: AtomicUsize,
}

#[async_trait]
impl SnapshotSource for StubSource {
    async fn fetch(&self, _user_id: Option<&str>) -> fpl_assistant::Result<Snapshot> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(Snapshot {
            players: "- Haaland (Man City, FWD, £14.0m) - Season Points: 180, Live Points: 13".to_string(),
            fixtures: "- GW 8: Man City vs Brighton".to_string(),
            fixtures_current: "- GW 7: Wolves 0 - 2 Man City".to_string(),
            current_gameweek: Some(7),
            fetched_at: chrono::Local::now(),
            squad: None,
        })
    }
}

/// Model provider that echoes a fixed reply after an optional delay
pub struct StubProvider {
    pub reply: String,
    pub delay: Duration,
    pub calls: AtomicUsize,
}

impl StubProvider {
    pub fn new(reply: &str, delay: Duration) -> Self {
        Self {
            reply: reply.to_string(),
            delay,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl LlmProvider for StubProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenAi
    }

    async fn complete(&self, _prompt: &str, _image: Option<&str>) -> Result<String, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        Ok(self.reply.clone())
    }
}

/// Build an assistant around stub upstreams
pub fn stub_assistant(
    source: Arc<StubSource>,
    provider: Arc<StubProvider>,
    timeout: Duration,
) -> Assistant {
    let estimator = Arc::new(HeuristicEstimator);
    Assistant::new(
        source,
        Arc::new(InMemorySessionStore::new(12, estimator.clone())),
        PromptBuilder::new(
            estimator,
            PromptLimits {
                max_prompt_tokens: 400_000,
                players_chars: 3000,
                fixtures_chars: 2000,
            },
        ),
        ModelClient::new(
            ProviderKind::OpenAi,
            Some(provider as Arc<dyn LlmProvider>),
            None,
            150_000,
        ),
        AssistantSettings {
            fetch_policy: FetchPolicy::Always,
            timeout,
            max_prompt_tokens: 400_000,
            default_user_id: None,
        },
    )
}

/// Default config with short limits for tests
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.limits.max_image_chars = 1_000;
    config.server.heartbeat = Duration::from_millis(20);
    config
}
