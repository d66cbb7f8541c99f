//! Provider selection and fallback

use std::sync::Arc;

use reqwest::Client;

use super::{GeminiProvider, LlmProvider, OpenAiProvider, ProviderError, ProviderKind};
use crate::config::Config;
use crate::error::ProviderFailure;
use crate::image_ops::compress_data_url;
use crate::prompt::IMAGE_OMITTED_NOTE;
use crate::{Error, Result};

/// Sends prompts to the configured provider, falling back on failure
///
/// Order: primary, then the fallback provider, then (for image requests) a
/// text-only retry on the primary. Invalid primary credentials end the chain.
#[derive(Clone)]
pub struct ModelClient {
    preferred: ProviderKind,
    primary: Option<Arc<dyn LlmProvider>>,
    fallback: Option<Arc<dyn LlmProvider>>,
    image_max_bytes: usize,
}

impl ModelClient {
    #[must_use]
    pub fn new(
        preferred: ProviderKind,
        primary: Option<Arc<dyn LlmProvider>>,
        fallback: Option<Arc<dyn LlmProvider>>,
        image_max_bytes: usize,
    ) -> Self {
        Self {
            preferred,
            primary,
            fallback,
            image_max_bytes,
        }
    }

    /// Build providers for every configured key
    ///
    /// If the preferred provider has no key but the other one does, the
    /// other becomes primary.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn from_config(config: &Config) -> Result<Self> {
        let http = Client::builder().timeout(config.llm.timeout).build()?;

        let make = |kind: ProviderKind| -> Option<Arc<dyn LlmProvider>> {
            let key = config.api_keys.for_provider(kind)?.clone();
            let provider: Arc<dyn LlmProvider> = match kind {
                ProviderKind::OpenAi => Arc::new(OpenAiProvider::new(
                    http.clone(),
                    key,
                    &config.llm.openai_model,
                    &config.llm.openai_base_url,
                )),
                ProviderKind::Gemini => Arc::new(GeminiProvider::new(
                    http.clone(),
                    key,
                    &config.llm.gemini_model,
                    &config.llm.gemini_base_url,
                )),
            };
            Some(provider)
        };

        let preferred = config.llm.provider;
        let (primary, fallback) = match (make(preferred), make(preferred.other())) {
            (Some(primary), fallback) => (Some(primary), fallback),
            (None, Some(other)) => {
                tracing::warn!(
                    preferred = preferred.as_str(),
                    using = other.kind().as_str(),
                    "preferred provider has no API key, using the other provider"
                );
                (Some(other), None)
            }
            (None, None) => {
                tracing::warn!("no model provider API key configured");
                (None, None)
            }
        };

        Ok(Self::new(preferred, primary, fallback, config.limits.image_max_bytes))
    }

    /// Ask the model, walking the fallback chain
    ///
    /// # Errors
    ///
    /// Returns `Config` when no provider is configured, `InvalidCredentials`
    /// when the primary rejects its key, and `Providers` when every attempt
    /// failed.
    pub async fn ask(&self, prompt: &str, image: Option<&str>) -> Result<String> {
        let Some(primary) = &self.primary else {
            return Err(Error::Config(format!(
                "{} environment variable not set.",
                self.preferred.env_var()
            )));
        };

        let Some(raw_image) = image else {
            return self.run_chain(primary, prompt, None).await;
        };

        let Some(compressed) = self.compress(raw_image).await else {
            tracing::warn!(
                max_bytes = self.image_max_bytes,
                "could not shrink image, continuing without it"
            );
            return self
                .run_chain(primary, &format!("{prompt}\n\n{IMAGE_OMITTED_NOTE}"), None)
                .await;
        };

        let mut failures = match self.run_chain(primary, prompt, Some(&compressed)).await {
            Err(Error::Providers(failures)) => failures,
            other => return other,
        };

        let label = format!("{} (text-only)", primary.kind().label());
        tracing::info!(provider = %label, "retrying without the image");
        match primary
            .complete(&format!("{prompt}\n\n{IMAGE_OMITTED_NOTE}"), None)
            .await
        {
            Ok(reply) => Ok(reply),
            Err(e) => {
                failures.push(ProviderFailure {
                    provider: label,
                    message: e.to_string(),
                });
                Err(Error::Providers(failures))
            }
        }
    }

    /// Shrink the image on the blocking pool so timers and heartbeats keep running
    async fn compress(&self, image: &str) -> Option<String> {
        let image = image.to_string();
        let max_bytes = self.image_max_bytes;
        match tokio::task::spawn_blocking(move || compress_data_url(&image, max_bytes)).await {
            Ok(compressed) => compressed,
            Err(e) => {
                tracing::warn!(error = %e, "image compression task failed");
                None
            }
        }
    }

    async fn run_chain(
        &self,
        primary: &Arc<dyn LlmProvider>,
        prompt: &str,
        image: Option<&str>,
    ) -> Result<String> {
        let mut failures = Vec::new();

        match primary.complete(prompt, image).await {
            Ok(reply) => return Ok(reply),
            Err(ProviderError::InvalidCredentials) => {
                tracing::warn!(provider = primary.kind().as_str(), "provider rejected API key");
                return Err(Error::InvalidCredentials {
                    provider: primary.kind().label(),
                });
            }
            Err(ProviderError::Failed(message)) => {
                tracing::warn!(provider = primary.kind().as_str(), error = %message, "provider call failed");
                failures.push(ProviderFailure {
                    provider: primary.kind().label().to_string(),
                    message,
                });
            }
        }

        if let Some(fallback) = &self.fallback {
            tracing::info!(provider = fallback.kind().as_str(), "trying fallback provider");
            match fallback.complete(prompt, image).await {
                Ok(reply) => return Ok(reply),
                Err(e) => {
                    tracing::warn!(provider = fallback.kind().as_str(), error = %e, "fallback provider failed");
                    failures.push(ProviderFailure {
                        provider: fallback.kind().label().to_string(),
                        message: e.to_string(),
                    });
                }
            }
        }

        Err(Error::Providers(failures))
    }
}
