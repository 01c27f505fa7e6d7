use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;

/// One club, keyed by id. First sighting across the corpus wins.
#[derive(Debug, Clone, PartialEq)]
pub struct Team {
    pub team_id: u32,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    pub player_id: u32,
    pub last_name: Option<String>,
}

/// One row per source document. Scores count accepted goal events only.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchRow {
    pub match_id: u64,
    pub date: Option<String>,
    pub home_team_id: Option<u32>,
    pub away_team_id: Option<u32>,
    pub duration: Option<i64>,
    pub period: Option<String>,
    pub championship: Option<u32>,
    pub home_formation: Option<String>,
    pub away_formation: Option<String>,
    pub odds_home: Option<f64>,
    pub odds_away: Option<f64>,
    pub odds_draw: Option<f64>,
    pub home_score: u32,
    pub away_score: u32,
}

/// One player's line in one match. `extra` holds whatever numeric stats the
/// source document carried for the player; the key set varies per document.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Appearance {
    pub player_id: Option<u32>,
    pub match_id: u64,
    pub team_id: Option<u32>,
    pub position: Option<String>,
    pub formation_slot: Option<i64>,
    pub minutes_played: Option<i64>,
    pub season_mark: Option<f64>,
    pub player_odds: Option<f64>,
    pub extra: BTreeMap<String, f64>,
}

/// A timestamped in-match event (goal or card) attributed to a player.
#[derive(Debug, Clone, PartialEq)]
pub struct Highlight {
    pub match_id: u64,
    pub minute: Option<f64>,
    pub player_id: Option<u32>,
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Substitution {
    pub match_id: u64,
    pub minute: Option<f64>,
    pub player_off: Option<u32>,
    pub player_on: Option<u32>,
    pub reason: String,
}

/// A contiguous date range during which a player is attributed to one club,
/// inferred from appearance records.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferPeriod {
    pub player_id: u32,
    pub player_name: String,
    pub team_name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// The seven materialized tables. Queries take this read-only; the store
/// writes and reloads it as a unit.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub teams: Vec<Team>,
    pub players: Vec<Player>,
    pub matches: Vec<MatchRow>,
    pub match_players: Vec<Appearance>,
    pub highlights: Vec<Highlight>,
    pub substitutions: Vec<Substitution>,
    pub transfers: Vec<TransferPeriod>,
}

impl Dataset {
    pub fn team_name(&self, team_id: u32) -> Option<&str> {
        self.teams
            .iter()
            .find(|t| t.team_id == team_id)
            .map(|t| t.name.as_str())
    }

    pub fn player_last_name(&self, player_id: u32) -> Option<&str> {
        self.players
            .iter()
            .find(|p| p.player_id == player_id)
            .and_then(|p| p.last_name.as_deref())
    }

    pub fn match_by_id(&self, match_id: u64) -> Option<&MatchRow> {
        self.matches.iter().find(|m| m.match_id == match_id)
    }
}

/// Display names for the championship codes seen in the corpus.
pub static CHAMPIONSHIP_NAMES: Lazy<BTreeMap<u32, &'static str>> = Lazy::new(|| {
    BTreeMap::from([
        (1, "Ligue 1"),
        (2, "Premier League"),
        (3, "La Liga"),
        (4, "Bundesliga"),
        (5, "Serie A"),
    ])
});

pub fn championship_name(code: u32) -> &'static str {
    CHAMPIONSHIP_NAMES.get(&code).copied().unwrap_or("Unknown")
}

/// Match dates arrive in whatever shape the upstream feed used. Accept
/// RFC 3339, a handful of naive datetime layouts, and bare dates.
pub fn parse_match_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.date_naive());
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Some(dt.date());
        }
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d").ok()
}
