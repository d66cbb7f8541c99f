//! Local user profile for the terminal chat
//!
//! A small JSON file holding the FPL entry id and a Gemini API key. It is read
//! on start and written back after the first-run prompts fill in missing values.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::Result;

/// Persisted terminal-chat profile
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct UserProfile {
    /// FPL entry id (found in the URL of the "Points" page)
    #[serde(rename = "FPL_USER_ID", default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    /// Google AI Studio key used for Gemini
    #[serde(rename = "GOOGLE_API_KEY", default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl UserProfile {
    /// Load a profile, returning an empty one if the file is missing or unreadable
    #[must_use]
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!(path = %path.display(), error = %e, "ignoring malformed profile");
                Self::default()
            }),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to read profile");
                Self::default()
            }
        }
    }

    /// Write the profile as JSON
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be written
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        tracing::debug!(path = %path.display(), "saved profile");
        Ok(())
    }

    /// Whether both values are present
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.user_id.is_some() && self.api_key.is_some()
    }
}

/// Default profile path: `~/.config/fpl-assistant/profile.json`
#[must_use]
pub fn default_profile_path() -> PathBuf {
    directories::BaseDirs::new().map_or_else(
        || PathBuf::from(".fpl_chatbot_config.json"),
        |d| d.config_dir().join("fpl-assistant").join("profile.json"),
    )
}
