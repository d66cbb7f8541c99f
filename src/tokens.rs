//! Token estimation for prompt budgeting
//!
//! The default estimator is a chars/4 heuristic. Enabling the `tokenizer`
//! feature adds an exact BPE count via `tiktoken-rs`.

use std::sync::Arc;

/// Estimates how many model tokens a piece of text occupies
pub trait TokenEstimator: Send + Sync {
    /// Estimated token count for `text`
    fn estimate(&self, text: &str) -> usize;
}

/// Roughly four characters per token
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicEstimator;

impl TokenEstimator for HeuristicEstimator {
    fn estimate(&self, text: &str) -> usize {
        if text.is_empty() {
            return 0;
        }
        (text.chars().count() / 4).max(1)
    }
}

/// Exact BPE token counts
#[cfg(feature = "tokenizer")]
pub struct TiktokenEstimator {
    bpe: tiktoken_rs::CoreBPE,
}

#[cfg(feature = "tokenizer")]
impl TiktokenEstimator {
    /// Encoding for `model`, falling back to `cl100k_base` for unknown models
    ///
    /// # Errors
    ///
    /// Returns error if no encoding can be loaded
    pub fn for_model(model: &str) -> crate::Result<Self> {
        let bpe = tiktoken_rs::get_bpe_from_model(model)
            .or_else(|_| tiktoken_rs::cl100k_base())
            .map_err(|e| crate::Error::Config(format!("failed to load tokenizer: {e}")))?;
        Ok(Self { bpe })
    }
}

#[cfg(feature = "tokenizer")]
impl TokenEstimator for TiktokenEstimator {
    fn estimate(&self, text: &str) -> usize {
        if text.is_empty() {
            return 0;
        }
        self.bpe.encode_with_special_tokens(text).len()
    }
}

/// Best available estimator for `model`
#[must_use]
pub fn default_estimator(model: &str) -> Arc<dyn TokenEstimator> {
    #[cfg(feature = "tokenizer")]
    {
        match TiktokenEstimator::for_model(model) {
            Ok(estimator) => return Arc::new(estimator),
            Err(e) => tracing::warn!(model, error = %e, "falling back to heuristic token estimate"),
        }
    }
    #[cfg(not(feature = "tokenizer"))]
    let _ = model;

    Arc::new(HeuristicEstimator)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heuristic_counts_quarter_chars() {
        let est = HeuristicEstimator;
        assert_eq!(est.estimate(""), 0);
        assert_eq!(est.estimate("ab"), 1);
        assert_eq!(est.estimate("abcdefgh"), 2);
        assert_eq!(est.estimate(&"x".repeat(4000)), 1000);
    }

    #[test]
    fn heuristic_counts_chars_not_bytes() {
        // "£" is two bytes in UTF-8
        assert_eq!(HeuristicEstimator.estimate("££££££££"), 2);
    }

    #[test]
    fn default_estimator_is_usable() {
        let est = default_estimator("gpt-5-mini");
        assert!(est.estimate("Who should I captain this week?") > 0);
    }
}
