//! Rendering FPL payloads as prompt-ready text

use std::collections::HashMap;
use std::fmt::Write;

use super::types::{Bootstrap, EntryInfo, Fixture, LiveData, Picks};

const UNKNOWN: &str = "N/A";

/// Id lookups built once from bootstrap data
pub struct Lookup<'a> {
    teams: HashMap<u32, &'a str>,
    positions: HashMap<u32, &'a str>,
    players: HashMap<u32, &'a str>,
}

impl<'a> Lookup<'a> {
    #[must_use]
    pub fn new(bootstrap: &'a Bootstrap) -> Self {
        Self {
            teams: bootstrap.teams.iter().map(|t| (t.id, t.name.as_str())).collect(),
            positions: bootstrap
                .element_types
                .iter()
                .map(|t| (t.id, t.singular_name_short.as_str()))
                .collect(),
            players: bootstrap
                .elements
                .iter()
                .map(|p| (p.id, p.web_name.as_str()))
                .collect(),
        }
    }

    /// Club name, `N/A` for unknown ids
    #[must_use]
    pub fn team(&self, id: u32) -> &'a str {
        self.teams.get(&id).copied().unwrap_or(UNKNOWN)
    }

    #[must_use]
    pub fn position(&self, id: u32) -> &'a str {
        self.positions.get(&id).copied().unwrap_or(UNKNOWN)
    }

    #[must_use]
    pub fn player(&self, id: u32) -> &'a str {
        self.players.get(&id).copied().unwrap_or("Unknown")
    }
}

/// Render tenths of a million as `£7.5m`
#[must_use]
pub fn money(tenths: i64) -> String {
    let sign = if tenths < 0 { "-" } else { "" };
    let abs = tenths.unsigned_abs();
    format!("{sign}£{}.{}m", abs / 10, abs % 10)
}

/// One line per player with season and live points
#[must_use]
pub fn players(bootstrap: &Bootstrap, live: &LiveData) -> String {
    let lookup = Lookup::new(bootstrap);
    bootstrap
        .elements
        .iter()
        .map(|p| {
            let live_points = live
                .points_for(p.id)
                .map_or_else(|| UNKNOWN.to_string(), |pts| pts.to_string());
            format!(
                "- {} ({}, {}, {}) - Season Points: {}, Live Points: {}, Form: {}, Status: {}",
                p.web_name,
                lookup.team(p.team),
                lookup.position(p.element_type),
                money(i64::from(p.now_cost)),
                p.total_points,
                live_points,
                p.form,
                p.status,
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn gameweek_label(event: Option<u32>) -> String {
    event.map_or_else(|| "TBC".to_string(), |gw| gw.to_string())
}

/// Season fixtures as `- GW n: Home vs Away`
#[must_use]
pub fn fixtures(bootstrap: &Bootstrap, fixtures: &[Fixture]) -> String {
    let lookup = Lookup::new(bootstrap);
    fixtures
        .iter()
        .map(|f| {
            format!(
                "- GW {}: {} vs {}",
                gameweek_label(f.event),
                lookup.team(f.team_h),
                lookup.team(f.team_a)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Current gameweek fixtures with live scores, `Not started` before kick-off
#[must_use]
pub fn current_fixtures(bootstrap: &Bootstrap, fixtures: &[Fixture]) -> String {
    let lookup = Lookup::new(bootstrap);
    fixtures
        .iter()
        .map(|f| {
            let score = match (f.team_h_score, f.team_a_score) {
                (Some(h), Some(a)) => format!("{h} - {a}"),
                _ => "Not started".to_string(),
            };
            format!(
                "- GW {}: {} {} {}",
                gameweek_label(f.event),
                lookup.team(f.team_h),
                score,
                lookup.team(f.team_a)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// The current gameweek, or the next one before the season starts
#[must_use]
pub fn current_gameweek(bootstrap: &Bootstrap) -> Option<u32> {
    bootstrap
        .events
        .iter()
        .find(|e| e.is_current)
        .or_else(|| bootstrap.events.iter().find(|e| e.is_next))
        .map(|e| e.id)
}

/// A user's squad with captaincy, bench and bank details
#[must_use]
pub fn squad(bootstrap: &Bootstrap, picks: &Picks, entry: &EntryInfo) -> String {
    let lookup = Lookup::new(bootstrap);
    let mut out = String::from("--- My FPL Squad ---");

    for pick in &picks.picks {
        let marker = if pick.is_captain {
            " (C)"
        } else if pick.is_vice_captain {
            " (VC)"
        } else {
            ""
        };
        let slot = if pick.position <= 11 { "Starter" } else { "Bench" };
        let _ = write!(out, "\n- {}{marker} [{slot}]", lookup.player(pick.element));
    }

    let free_transfers = picks.entry_history.as_ref().map_or(1, |h| h.event_transfers);
    let _ = write!(
        out,
        "\n\n--- Team Info ---\nBank: {}\nFree Transfers: {free_transfers}",
        money(entry.last_deadline_bank)
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bootstrap() -> Bootstrap {
        serde_json::from_value(serde_json::json!({
            "elements": [
                {"id": 1, "web_name": "Salah", "team": 10, "element_type": 3,
                 "now_cost": 125, "total_points": 211, "form": "7.5", "status": "a"},
                {"id": 2, "web_name": "Haaland", "team": 11, "element_type": 4,
                 "now_cost": 140, "total_points": 180, "form": "6.0", "status": "d"}
            ],
            "teams": [{"id": 10, "name": "Liverpool"}, {"id": 11, "name": "Man City"}],
            "element_types": [
                {"id": 3, "singular_name_short": "MID"},
                {"id": 4, "singular_name_short": "FWD"}
            ],
            "events": [
                {"id": 7, "is_current": false, "is_next": true},
                {"id": 6, "is_current": true, "is_next": false}
            ]
        }))
        .unwrap()
    }

    #[test]
    fn money_renders_one_decimal() {
        assert_eq!(money(75), "£7.5m");
        assert_eq!(money(100), "£10.0m");
        assert_eq!(money(5), "£0.5m");
    }

    #[test]
    fn player_lines_include_live_points_or_na() {
        let live: LiveData =
            serde_json::from_str(r#"{"elements": {"1": {"stats": {"total_points": 9}}}}"#).unwrap();
        let text = players(&bootstrap(), &live);

        assert_eq!(
            text.lines().next().unwrap(),
            "- Salah (Liverpool, MID, £12.5m) - Season Points: 211, Live Points: 9, Form: 7.5, Status: a"
        );
        assert!(text.lines().nth(1).unwrap().contains("Live Points: N/A"));
    }

    #[test]
    fn unknown_team_renders_na() {
        let fx = vec![Fixture {
            event: None,
            team_h: 10,
            team_a: 99,
            team_h_score: None,
            team_a_score: None,
        }];
        assert_eq!(fixtures(&bootstrap(), &fx), "- GW TBC: Liverpool vs N/A");
    }

    #[test]
    fn current_fixtures_show_score_or_not_started() {
        let fx = vec![
            Fixture {
                event: Some(6),
                team_h: 10,
                team_a: 11,
                team_h_score: Some(2),
                team_a_score: Some(1),
            },
            Fixture {
                event: Some(6),
                team_h: 11,
                team_a: 10,
                team_h_score: None,
                team_a_score: None,
            },
        ];
        let text = current_fixtures(&bootstrap(), &fx);
        assert_eq!(
            text,
            "- GW 6: Liverpool 2 - 1 Man City\n- GW 6: Man City Not started Liverpool"
        );
    }

    #[test]
    fn current_gameweek_prefers_current_then_next() {
        let mut b = bootstrap();
        assert_eq!(current_gameweek(&b), Some(6));

        b.events.retain(|e| !e.is_current);
        assert_eq!(current_gameweek(&b), Some(7));

        b.events.clear();
        assert_eq!(current_gameweek(&b), None);
    }

    #[test]
    fn squad_marks_captaincy_and_bench() {
        let picks: Picks = serde_json::from_value(serde_json::json!({
            "picks": [
                {"element": 1, "position": 1, "is_captain": true, "is_vice_captain": false},
                {"element": 2, "position": 2, "is_captain": false, "is_vice_captain": true},
                {"element": 3, "position": 12, "is_captain": false, "is_vice_captain": false}
            ],
            "entry_history": {"event_transfers": 2}
        }))
        .unwrap();
        let entry = EntryInfo { last_deadline_bank: 15 };

        let text = squad(&bootstrap(), &picks, &entry);
        assert!(text.contains("- Salah (C) [Starter]"));
        assert!(text.contains("- Haaland (VC) [Starter]"));
        assert!(text.contains("- Unknown [Bench]"));
        assert!(text.contains("Bank: £1.5m"));
        assert!(text.contains("Free Transfers: 2"));
    }
}
