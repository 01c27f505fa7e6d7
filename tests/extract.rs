use std::fs;
use std::path::PathBuf;

use serde_json::Value;

use footdata::extract::extract_document;

fn read_fixture(name: &str) -> Value {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    let raw = fs::read_to_string(path).expect("fixture file should be readable");
    serde_json::from_str(&raw).expect("fixture should be valid json")
}

#[test]
fn scores_count_only_accepted_goals() {
    let rows = extract_document(&read_fixture("match_day.json")).expect("fixture has a match id");
    assert_eq!(rows.match_row.match_id, 2001);
    assert_eq!(rows.match_row.home_score, 2);
    assert_eq!(rows.match_row.away_score, 0);
}

#[test]
fn match_metadata_flattens() {
    let rows = extract_document(&read_fixture("match_day.json")).unwrap();
    let m = &rows.match_row;
    assert_eq!(m.date.as_deref(), Some("2019-08-10T19:00:00+00:00"));
    assert_eq!(m.home_team_id, Some(1));
    assert_eq!(m.away_team_id, Some(2));
    assert_eq!(m.duration, Some(94));
    assert_eq!(m.period.as_deref(), Some("fulltime"));
    assert_eq!(m.championship, Some(2));
    assert_eq!(m.odds_home, Some(1.5));
    assert_eq!(m.odds_away, Some(5.25));
    assert_eq!(m.odds_draw, Some(3.8));
}

#[test]
fn formation_comes_from_the_first_roster_entry() {
    let rows = extract_document(&read_fixture("match_day.json")).unwrap();
    assert_eq!(rows.match_row.home_formation.as_deref(), Some("433"));
    assert_eq!(rows.match_row.away_formation.as_deref(), Some("4231"));
}

#[test]
fn teams_and_players_are_emitted() {
    let rows = extract_document(&read_fixture("match_day.json")).unwrap();
    assert_eq!(rows.teams.len(), 2);
    assert_eq!(rows.teams[0].name, "Liverpool");
    assert_eq!(rows.teams[1].name, "Arsenal");

    // The trialist has no idplayer, so only three player rows appear; the
    // appearance row for the trialist is still emitted.
    let ids: Vec<u32> = rows.players.iter().map(|p| p.player_id).collect();
    assert_eq!(ids, vec![100, 101, 200]);
    assert_eq!(rows.appearances.len(), 4);
}

#[test]
fn appearances_merge_dynamic_stats() {
    let rows = extract_document(&read_fixture("match_day.json")).unwrap();

    let salah = rows
        .appearances
        .iter()
        .find(|a| a.player_id == Some(100))
        .unwrap();
    assert_eq!(salah.team_id, Some(1));
    assert_eq!(salah.position.as_deref(), Some("forward"));
    assert_eq!(salah.formation_slot, Some(9));
    assert_eq!(salah.minutes_played, Some(90));
    assert_eq!(salah.season_mark, Some(7.5));
    assert_eq!(salah.player_odds, Some(1.2));
    assert_eq!(salah.extra.get("goals"), Some(&2.0));
    assert_eq!(salah.extra.get("passes"), Some(&31.5));

    // A stat named after a fixed column overwrites it, last write wins.
    let robertson = rows
        .appearances
        .iter()
        .find(|a| a.player_id == Some(101))
        .unwrap();
    assert_eq!(robertson.position.as_deref(), Some("4"));
    assert_eq!(robertson.extra.get("tackles"), Some(&5.0));
    assert!(!robertson.extra.contains_key("position"));

    let trialist = rows
        .appearances
        .iter()
        .find(|a| a.player_id.is_none())
        .unwrap();
    assert_eq!(trialist.team_id, Some(2));
    assert_eq!(trialist.player_odds, None);
}

#[test]
fn highlights_filter_and_normalize() {
    let rows = extract_document(&read_fixture("match_day.json")).unwrap();

    let goals: Vec<_> = rows.highlights.iter().filter(|h| h.kind == "goal").collect();
    assert_eq!(goals.len(), 2, "the annulled away goal must not appear");
    assert!(goals.iter().all(|h| h.player_id == Some(100)));

    let kinds: Vec<&str> = rows
        .highlights
        .iter()
        .filter(|h| h.kind != "goal")
        .map(|h| h.kind.as_str())
        .collect();
    assert_eq!(kinds, vec!["yellowcard", "redcard", "secondyellow"]);
}

#[test]
fn substitutions_keep_both_sources() {
    let rows = extract_document(&read_fixture("match_day.json")).unwrap();
    // One structured home substitution, plus two timeline entries; the
    // duplicate of the structured one is kept as-is.
    assert_eq!(rows.substitutions.len(), 3);
    let dupes = rows
        .substitutions
        .iter()
        .filter(|s| s.minute == Some(61.0) && s.player_off == Some(101))
        .count();
    assert_eq!(dupes, 2);

    let unreasoned = rows
        .substitutions
        .iter()
        .find(|s| s.player_off == Some(200))
        .unwrap();
    assert_eq!(unreasoned.reason, "Unknown");
    assert_eq!(unreasoned.player_on, Some(201));
}

#[test]
fn sparse_documents_default_instead_of_failing() {
    let doc: Value = serde_json::from_str(r#"{"id": 9}"#).unwrap();
    let rows = extract_document(&doc).unwrap();
    assert!(rows.teams.is_empty());
    assert!(rows.players.is_empty());
    assert!(rows.appearances.is_empty());
    assert!(rows.highlights.is_empty());
    assert!(rows.substitutions.is_empty());
    let m = rows.match_row;
    assert_eq!(m.match_id, 9);
    assert_eq!(m.home_score, 0);
    assert_eq!(m.away_score, 0);
    assert!(m.date.is_none());
    assert!(m.home_formation.is_none());
}
