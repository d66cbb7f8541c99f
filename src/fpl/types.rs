//! Wire types for the FPL API and its static mirror
//!
//! Only the fields the assistant reads are modelled; everything else in the
//! payloads is ignored.

use std::collections::HashMap;

use serde::Deserialize;

/// `bootstrap-static` payload
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Bootstrap {
    #[serde(default)]
    pub elements: Vec<Element>,
    #[serde(default)]
    pub teams: Vec<Team>,
    #[serde(default)]
    pub element_types: Vec<ElementType>,
    #[serde(default)]
    pub events: Vec<Event>,
}

/// A player
#[derive(Debug, Clone, Deserialize)]
pub struct Element {
    pub id: u32,
    pub web_name: String,
    pub team: u32,
    pub element_type: u32,
    /// Price in tenths of a million
    pub now_cost: u32,
    #[serde(default)]
    pub total_points: i32,
    #[serde(default)]
    pub form: String,
    #[serde(default)]
    pub status: String,
}

/// A Premier League club
#[derive(Debug, Clone, Deserialize)]
pub struct Team {
    pub id: u32,
    pub name: String,
}

/// A playing position (GKP, DEF, MID, FWD)
#[derive(Debug, Clone, Deserialize)]
pub struct ElementType {
    pub id: u32,
    pub singular_name_short: String,
}

/// A gameweek
#[derive(Debug, Clone, Deserialize)]
pub struct Event {
    pub id: u32,
    #[serde(default)]
    pub is_current: bool,
    #[serde(default)]
    pub is_next: bool,
}

/// A fixture
#[derive(Debug, Clone, Deserialize)]
pub struct Fixture {
    /// Gameweek, absent for unscheduled fixtures
    #[serde(default)]
    pub event: Option<u32>,
    pub team_h: u32,
    pub team_a: u32,
    #[serde(default)]
    pub team_h_score: Option<u32>,
    #[serde(default)]
    pub team_a_score: Option<u32>,
}

/// Live gameweek payload
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LiveData {
    #[serde(default)]
    pub elements: Option<LiveElements>,
}

/// Live stats keyed by player id (mirror) or listed with ids (official API)
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum LiveElements {
    Keyed(HashMap<String, LiveEntry>),
    Listed(Vec<LiveListedEntry>),
}

/// Live entry in the keyed form
#[derive(Debug, Clone, Deserialize)]
pub struct LiveEntry {
    pub stats: LiveStats,
}

/// Live entry in the listed form
#[derive(Debug, Clone, Deserialize)]
pub struct LiveListedEntry {
    pub id: u32,
    pub stats: LiveStats,
}

/// Per-player live stats
#[derive(Debug, Clone, Deserialize)]
pub struct LiveStats {
    #[serde(default)]
    pub total_points: i32,
}

impl LiveData {
    /// Live points for a player, if present
    #[must_use]
    pub fn points_for(&self, player_id: u32) -> Option<i32> {
        match self.elements.as_ref()? {
            LiveElements::Keyed(map) => map.get(&player_id.to_string()).map(|e| e.stats.total_points),
            LiveElements::Listed(list) => list
                .iter()
                .find(|e| e.id == player_id)
                .map(|e| e.stats.total_points),
        }
    }
}

/// `entry/{id}/` payload
#[derive(Debug, Clone, Deserialize)]
pub struct EntryInfo {
    /// Money in the bank in tenths of a million
    #[serde(default = "default_bank")]
    pub last_deadline_bank: i64,
}

const fn default_bank() -> i64 {
    1000
}

/// `entry/{id}/event/{gw}/picks/` payload
#[derive(Debug, Clone, Deserialize)]
pub struct Picks {
    #[serde(default)]
    pub picks: Vec<Pick>,
    #[serde(default)]
    pub entry_history: Option<EntryHistory>,
}

/// A player in a user's squad
#[derive(Debug, Clone, Deserialize)]
pub struct Pick {
    pub element: u32,
    /// Slot 1-11 starts, 12-15 is the bench
    pub position: u32,
    #[serde(default)]
    pub is_captain: bool,
    #[serde(default)]
    pub is_vice_captain: bool,
}

/// Gameweek summary for a user's entry
#[derive(Debug, Clone, Deserialize)]
pub struct EntryHistory {
    #[serde(default = "default_transfers")]
    pub event_transfers: u32,
}

const fn default_transfers() -> u32 {
    1
}
