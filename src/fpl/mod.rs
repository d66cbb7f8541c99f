//! Fantasy Premier League data fetching and formatting

mod fetcher;
pub mod format;
pub mod retry;
pub mod types;

use async_trait::async_trait;
use chrono::{DateTime, Local};

pub use fetcher::FplClient;

use crate::Result;

/// Where snapshots are read from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DataSource {
    /// Static JSON mirror of the FPL API (no user-specific endpoints)
    #[default]
    Mirror,
    /// `fantasy.premierleague.com/api`
    Official,
}

impl DataSource {
    /// Parse a configuration value (case-insensitive)
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "mirror" | "github" => Some(Self::Mirror),
            "official" | "api" => Some(Self::Official),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Mirror => "mirror",
            Self::Official => "official",
        }
    }
}

/// Formatted FPL data for one request
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// One line per player
    pub players: String,
    /// Season fixtures
    pub fixtures: String,
    /// Current gameweek fixtures with live scores
    pub fixtures_current: String,
    pub current_gameweek: Option<u32>,
    pub fetched_at: DateTime<Local>,
    /// The user's squad when an entry id was supplied
    pub squad: Option<String>,
}

/// Produces FPL snapshots
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    /// Fetch a fresh snapshot, including the squad for `user_id` if given
    async fn fetch(&self, user_id: Option<&str>) -> Result<Snapshot>;
}
