use serde_json::Value;

use crate::tables::{Appearance, Highlight, MatchRow, Player, Substitution, Team};

/// Disallowed goal marker. Goals of this type count toward neither the score
/// nor the highlights table.
const ANNULLED_GOAL_TYPE: &str = "var";

const SIDES: [&str; 2] = ["Home", "Away"];

/// Flat rows produced from a single decoded match document.
#[derive(Debug, Clone)]
pub struct DocumentRows {
    pub teams: Vec<Team>,
    pub match_row: MatchRow,
    pub players: Vec<Player>,
    pub appearances: Vec<Appearance>,
    pub highlights: Vec<Highlight>,
    pub substitutions: Vec<Substitution>,
}

/// Flatten one match document. Missing fields default to `None`/empty rather
/// than failing; only a document without a usable top-level match id yields
/// `None` (nothing downstream can join such rows).
pub fn extract_document(doc: &Value) -> Option<DocumentRows> {
    let match_id = doc.get("id").and_then(as_u64_any)?;

    let mut teams = Vec::new();
    for side in SIDES {
        let side_val = doc.get(side);
        if let Some(team_id) = side_val.and_then(|v| v.get("id")).and_then(as_u32_any) {
            let name = side_val
                .and_then(|v| v.get("club"))
                .and_then(render_scalar)
                .unwrap_or_else(|| "Unknown".to_string());
            teams.push(Team { team_id, name });
        }
    }

    let mut out = DocumentRows {
        teams,
        match_row: build_match_row(doc, match_id),
        players: Vec::new(),
        appearances: Vec::new(),
        highlights: Vec::new(),
        substitutions: Vec::new(),
    };
    extract_rosters(doc, match_id, &mut out);
    extract_highlights(doc, match_id, &mut out.highlights);
    extract_substitutions(doc, match_id, &mut out.substitutions);

    Some(out)
}

fn build_match_row(doc: &Value, match_id: u64) -> MatchRow {
    let odds = doc.get("quotationPreGame");
    MatchRow {
        match_id,
        date: doc.get("dateMatch").and_then(render_scalar),
        home_team_id: side_team_id(doc, "Home"),
        away_team_id: side_team_id(doc, "Away"),
        duration: doc.get("matchTime").and_then(as_i64_any),
        period: doc.get("period").and_then(render_scalar),
        championship: doc.get("championship").and_then(as_u32_any),
        home_formation: side_formation(doc, "Home"),
        away_formation: side_formation(doc, "Away"),
        odds_home: odds.and_then(|v| v.get("Home")).and_then(as_f64_any),
        odds_away: odds.and_then(|v| v.get("Away")).and_then(as_f64_any),
        odds_draw: odds.and_then(|v| v.get("Draw")).and_then(as_f64_any),
        home_score: accepted_goals(doc, "home"),
        away_score: accepted_goals(doc, "away"),
    }
}

fn side_team_id(doc: &Value, side: &str) -> Option<u32> {
    doc.get(side).and_then(|v| v.get("id")).and_then(as_u32_any)
}

/// The upstream feed repeats the side's formation on every roster entry; the
/// first entry in document order is the one consulted. Empty roster, no
/// formation.
fn side_formation(doc: &Value, side: &str) -> Option<String> {
    let roster = doc.get(side)?.get("players")?.as_object()?;
    let (_, first) = roster.iter().next()?;
    first
        .get("info")
        .and_then(|v| v.get("formation_used"))
        .and_then(render_scalar)
}

fn goal_events<'a>(doc: &'a Value, side: &str) -> &'a [Value] {
    doc.get("matchData")
        .and_then(|v| v.get(side))
        .and_then(|v| v.get("goals"))
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn goal_is_accepted(event: &Value) -> bool {
    event.get("type").and_then(Value::as_str) != Some(ANNULLED_GOAL_TYPE)
}

fn accepted_goals(doc: &Value, side: &str) -> u32 {
    goal_events(doc, side)
        .iter()
        .filter(|e| goal_is_accepted(e))
        .count() as u32
}

fn extract_rosters(doc: &Value, match_id: u64, out: &mut DocumentRows) {
    for side in SIDES {
        let team_id = side_team_id(doc, side);
        let Some(roster) = doc
            .get(side)
            .and_then(|v| v.get("players"))
            .and_then(Value::as_object)
        else {
            continue;
        };

        for info in roster.values() {
            let pinfo = info.get("info");
            let player_id = pinfo.and_then(|v| v.get("idplayer")).and_then(as_u32_any);
            let last_name = pinfo.and_then(|v| v.get("lastname")).and_then(render_scalar);

            if let Some(player_id) = player_id {
                out.players.push(Player {
                    player_id,
                    last_name,
                });
            }

            let mut row = Appearance {
                player_id,
                match_id,
                team_id,
                position: pinfo.and_then(|v| v.get("position")).and_then(render_scalar),
                formation_slot: pinfo
                    .and_then(|v| v.get("formation_place"))
                    .and_then(as_i64_any),
                minutes_played: pinfo
                    .and_then(|v| v.get("mins_played"))
                    .and_then(as_i64_any),
                season_mark: pinfo
                    .and_then(|v| v.get("note_final_2015"))
                    .and_then(as_f64_any),
                player_odds: player_id.and_then(|id| {
                    doc.get("quotationPlayers")
                        .and_then(|v| v.get(format!("player_{id}")))
                        .and_then(as_f64_any)
                }),
                extra: Default::default(),
            };

            if let Some(stats) = info.get("stat").and_then(Value::as_object) {
                for (key, value) in stats {
                    merge_stat(&mut row, key, value);
                }
            }

            out.appearances.push(row);
        }
    }
}

/// Merge one dynamic stat into the appearance row, last write wins. A stat
/// whose key names a fixed column overwrites that column instead of landing
/// in `extra`.
fn merge_stat(row: &mut Appearance, key: &str, value: &Value) {
    match key {
        "position" => row.position = render_scalar(value).or(row.position.take()),
        "formation_slot" => row.formation_slot = as_i64_any(value).or(row.formation_slot),
        "minutes_played" => row.minutes_played = as_i64_any(value).or(row.minutes_played),
        "season_mark" => row.season_mark = as_f64_any(value).or(row.season_mark),
        "player_odds" => row.player_odds = as_f64_any(value).or(row.player_odds),
        "player_id" => row.player_id = as_u32_any(value).or(row.player_id),
        "team_id" => row.team_id = as_u32_any(value).or(row.team_id),
        _ => {
            if let Some(n) = as_f64_any(value) {
                row.extra.insert(key.to_string(), n);
            }
        }
    }
}

fn extract_highlights(doc: &Value, match_id: u64, out: &mut Vec<Highlight>) {
    for side in ["home", "away"] {
        for event in goal_events(doc, side) {
            if !goal_is_accepted(event) {
                continue;
            }
            out.push(Highlight {
                match_id,
                minute: event.get("time").and_then(as_f64_any),
                player_id: event.get("playerId").and_then(as_u32_any),
                kind: "goal".to_string(),
            });
        }

        let bookings = doc
            .get("matchData")
            .and_then(|v| v.get(side))
            .and_then(|v| v.get("bookings"))
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        for event in bookings {
            let raw = event
                .get("type")
                .and_then(render_scalar)
                .unwrap_or_default();
            out.push(Highlight {
                match_id,
                minute: event.get("time").and_then(as_f64_any),
                player_id: event.get("playerId").and_then(as_u32_any),
                kind: normalize_booking(&raw),
            });
        }
    }
}

/// Short booking codes from the feed are expanded; anything else passes
/// through unchanged.
pub fn normalize_booking(raw: &str) -> String {
    match raw {
        "yellow" => "yellowcard".to_string(),
        "red" => "redcard".to_string(),
        other => other.to_string(),
    }
}

fn extract_substitutions(doc: &Value, match_id: u64, out: &mut Vec<Substitution>) {
    // Structured per-side lists first, then the generic timeline. Both are
    // appended even when they describe the same event; the feed gives no key
    // to reconcile them on.
    for side in ["home", "away"] {
        let subs = doc
            .get("matchData")
            .and_then(|v| v.get(side))
            .and_then(|v| v.get("substitutions"))
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        for sub in subs {
            out.push(substitution_row(match_id, sub));
        }
    }

    let timeline = doc
        .get("timeline")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[]);
    for event in timeline {
        if event.get("type").and_then(Value::as_str) == Some("substitution") {
            out.push(substitution_row(match_id, event));
        }
    }
}

fn substitution_row(match_id: u64, event: &Value) -> Substitution {
    Substitution {
        match_id,
        minute: event.get("time").and_then(as_f64_any),
        player_off: event.get("subOff").and_then(as_u32_any),
        player_on: event.get("subOn").and_then(as_u32_any),
        reason: event
            .get("reason")
            .and_then(render_scalar)
            .unwrap_or_else(|| "Unknown".to_string()),
    }
}

pub fn as_u64_any(v: &Value) -> Option<u64> {
    if let Some(n) = v.as_u64() {
        return Some(n);
    }
    if let Some(f) = v.as_f64()
        && f >= 0.0
        && f.fract() == 0.0
        && f <= u64::MAX as f64
    {
        return Some(f as u64);
    }
    v.as_str()?.trim().parse::<u64>().ok()
}

pub fn as_u32_any(v: &Value) -> Option<u32> {
    let n = as_u64_any(v)?;
    u32::try_from(n).ok()
}

pub fn as_i64_any(v: &Value) -> Option<i64> {
    if let Some(n) = v.as_i64() {
        return Some(n);
    }
    if let Some(f) = v.as_f64()
        && f.fract() == 0.0
        && f >= i64::MIN as f64
        && f <= i64::MAX as f64
    {
        return Some(f as i64);
    }
    v.as_str()?.trim().parse::<i64>().ok()
}

pub fn as_f64_any(v: &Value) -> Option<f64> {
    if let Some(f) = v.as_f64() {
        return Some(f);
    }
    v.as_str()?.trim().parse::<f64>().ok()
}

/// String for strings, decimal rendering for numbers, `None` for everything
/// else (arrays, objects, null, booleans).
pub fn render_scalar(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn booking_codes_normalize() {
        assert_eq!(normalize_booking("yellow"), "yellowcard");
        assert_eq!(normalize_booking("red"), "redcard");
        assert_eq!(normalize_booking("secondyellow"), "secondyellow");
        assert_eq!(normalize_booking("straightred"), "straightred");
    }

    #[test]
    fn annulled_goals_are_rejected() {
        assert!(goal_is_accepted(&json!({"time": 12})));
        assert!(goal_is_accepted(&json!({"type": "penalty"})));
        assert!(!goal_is_accepted(&json!({"type": "var"})));
    }

    #[test]
    fn lenient_numbers_accept_strings_and_floats() {
        assert_eq!(as_u32_any(&json!("43")), Some(43));
        assert_eq!(as_u32_any(&json!(5.0)), Some(5));
        assert_eq!(as_u32_any(&json!(5.5)), None);
        assert_eq!(as_f64_any(&json!("2.35")), Some(2.35));
        assert_eq!(as_i64_any(&json!(-7)), Some(-7));
    }

    #[test]
    fn document_without_match_id_is_rejected() {
        assert!(extract_document(&json!({"Home": {"id": 1}})).is_none());
    }

    #[test]
    fn stat_collision_overwrites_fixed_column() {
        let mut row = Appearance {
            position: Some("midfielder".to_string()),
            ..Default::default()
        };
        merge_stat(&mut row, "position", &json!(4));
        merge_stat(&mut row, "passes", &json!(31));
        assert_eq!(row.position.as_deref(), Some("4"));
        assert_eq!(row.extra.get("passes"), Some(&31.0));
    }
}
