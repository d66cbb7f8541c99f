//! Prompt assembly for FPL questions
//!
//! A prompt is a persona preamble, the formatted data context and the user's
//! question. When the whole assembly is estimated to be over the token
//! ceiling, the bulky data sections are cut to fixed character lengths.

use std::fmt::Write;
use std::sync::Arc;

use crate::config::LimitsConfig;
use crate::fpl::Snapshot;
use crate::session::{Message, serialize_history};
use crate::tokens::TokenEstimator;

/// Appended to a text-only prompt when an attached image could not be sent
pub const IMAGE_OMITTED_NOTE: &str = "[Image omitted from prompt because it was too large to include. Please crop or upload a smaller image if more detailed analysis is required.]";

const PERSONA: &str = "You are a friendly and knowledgeable Fantasy Premier League assistant.\n\
Your tone is conversational and you write in British English.";

const PLAYERS_MARKER: &str = "\n... (players list truncated for prompt size)";
const FIXTURES_MARKER: &str = "\n... (fixtures truncated for prompt size)";
const CURRENT_FIXTURES_MARKER: &str = "\n... (current fixtures truncated for prompt size)";

/// Which instruction block accompanies the data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersonaVariant {
    /// The user attached a screenshot of their team
    ImageAnalysis,
    /// A plain text question
    TextOnly,
}

impl PersonaVariant {
    #[must_use]
    pub const fn for_image(has_image: bool) -> Self {
        if has_image {
            Self::ImageAnalysis
        } else {
            Self::TextOnly
        }
    }

    const fn instructions(self) -> &'static str {
        match self {
            Self::ImageAnalysis => {
                "**About this request:**\n\
The user has shared a screenshot of their FPL team along with a question.\n\n\
**How to read the screenshot:**\n\
1. Work out which players are in the squad from the screenshot.\n\
2. The shirt a player wears shows the club they play for. The team name printed beneath them is their **next opponent**, not their club.\n\
3. Draw on both **season stats** and **live points / live scores** when advising.\n\
4. For transfers, captaincy or team selection, weigh longer-term output (season points, form) against this gameweek's performance (live points, live scores) where it is available.\n\n\
Answer the question helpfully and conversationally."
            }
            Self::TextOnly => {
                "**About this request:**\n\
The user has a general FPL question.\n\n\
**Guidance:**\n\
1. Reason with both **season stats** and **live points / live scores**.\n\
2. Balance longer-term output (season points, form) against this gameweek's performance (live points, live scores) where it is available.\n\
3. Keep the answer clear, accurate and conversational, in British English."
            }
        }
    }
}

/// Character and token limits for prompt assembly
#[derive(Debug, Clone, Copy)]
pub struct PromptLimits {
    pub max_prompt_tokens: usize,
    pub players_chars: usize,
    pub fixtures_chars: usize,
}

impl From<&LimitsConfig> for PromptLimits {
    fn from(limits: &LimitsConfig) -> Self {
        Self {
            max_prompt_tokens: limits.max_prompt_tokens,
            players_chars: limits.players_chars,
            fixtures_chars: limits.fixtures_chars,
        }
    }
}

/// Builds model prompts from FPL snapshots
#[derive(Clone)]
pub struct PromptBuilder {
    estimator: Arc<dyn TokenEstimator>,
    limits: PromptLimits,
}

impl PromptBuilder {
    #[must_use]
    pub fn new(estimator: Arc<dyn TokenEstimator>, limits: PromptLimits) -> Self {
        Self { estimator, limits }
    }

    /// Assemble the prompt, truncating data sections if it is over the token ceiling
    #[must_use]
    pub fn build(&self, snapshot: &Snapshot, question: &str, variant: PersonaVariant) -> String {
        let full = assemble(&data_context(snapshot), question, variant);
        let tokens = self.estimator.estimate(&full);
        if tokens <= self.limits.max_prompt_tokens {
            return full;
        }

        let truncated = truncate_sections(snapshot, &self.limits);
        let prompt = assemble(&data_context(&truncated), question, variant);
        tracing::info!(
            before = tokens,
            after = self.estimator.estimate(&prompt),
            ceiling = self.limits.max_prompt_tokens,
            "truncated FPL data sections"
        );
        prompt
    }
}

fn assemble(data_context: &str, question: &str, variant: PersonaVariant) -> String {
    format!(
        "{PERSONA}\n\n**FPL Data Context:**\n{data_context}\n\n{}\n\nUser's question: \"{question}\"",
        variant.instructions()
    )
}

/// Date, gameweek and the formatted data sections
#[must_use]
pub fn data_context(snapshot: &Snapshot) -> String {
    let gameweek = snapshot
        .current_gameweek
        .map_or_else(|| "N/A".to_string(), |gw| gw.to_string());

    let mut out = format!(
        "Current Date: {}\nCurrent Gameweek: {gameweek}\n\n\
**Players & Stats (Season + Live):**\n{}\n\n\
**Season Fixtures:**\n{}\n\n\
**This Gameweek's Fixtures (live scores where available):**\n{}",
        snapshot.fetched_at.format("%Y-%m-%d %H:%M:%S"),
        snapshot.players,
        snapshot.fixtures,
        snapshot.fixtures_current,
    );

    if let Some(squad) = &snapshot.squad {
        let _ = write!(out, "\n\n**User's Squad:**\n{squad}");
    }
    out
}

/// Copy of the snapshot with oversized sections cut to the configured lengths
#[must_use]
pub fn truncate_sections(snapshot: &Snapshot, limits: &PromptLimits) -> Snapshot {
    Snapshot {
        players: truncate_chars(&snapshot.players, limits.players_chars, PLAYERS_MARKER),
        fixtures: truncate_chars(&snapshot.fixtures, limits.fixtures_chars, FIXTURES_MARKER),
        fixtures_current: truncate_chars(
            &snapshot.fixtures_current,
            limits.fixtures_chars,
            CURRENT_FIXTURES_MARKER,
        ),
        ..snapshot.clone()
    }
}

/// Cut `text` to `limit` chars plus `marker`, only when that is shorter than the original
#[must_use]
pub fn truncate_chars(text: &str, limit: usize, marker: &str) -> String {
    let len = text.chars().count();
    if len <= limit + marker.chars().count() {
        return text.to_string();
    }
    let mut out: String = text.chars().take(limit).collect();
    out.push_str(marker);
    out
}

/// Prefix the prompt with the serialized conversation, if there is one
#[must_use]
pub fn with_history(prompt: &str, history: &[Message]) -> String {
    if history.is_empty() {
        return prompt.to_string();
    }
    format!("{}\n\n{prompt}", serialize_history(history))
}

/// Yes/no question deciding whether a message needs FPL data
#[must_use]
pub fn router_prompt(question: &str) -> String {
    format!(
        "You decide whether a Fantasy Premier League (FPL) question needs live FPL data. \
Would you need current player stats, fixtures or the user's team, budget and players to answer the \
following helpfully? Reply with the single word 'yes' or 'no'.\n\nUser Query: '{question}'"
    )
}

/// Whether a router reply asks for data
///
/// Plain substring test: `yes` present and `no` absent.
#[must_use]
pub fn router_wants_data(reply: &str) -> bool {
    let reply = reply.trim().to_lowercase();
    reply.contains("yes") && !reply.contains("no")
}

/// Prompt for small talk that needs no data
#[must_use]
pub fn conversational_prompt(question: &str) -> String {
    format!(
        "You are a friendly, helpful Fantasy Premier League assistant who writes in British English. \
Reply to the message below conversationally, keeping it brief and engaging. If it is not about FPL, \
politely bring the conversation back to fantasy football.\n\nUser: {question}\nAssistant:"
    )
}
