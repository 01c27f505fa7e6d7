use std::fs;
use std::path::Path;

use chrono::NaiveDate;

use footdata::store::{self, TABLE_FILES};

const MATCH_ONE: &str = r#"{
  "id": 1,
  "dateMatch": "2019-08-10",
  "championship": 2,
  "Home": {
    "id": 1,
    "club": "Reds",
    "players": {
      "player_100": { "info": { "idplayer": 100, "lastname": "Wanderer", "position": "forward", "mins_played": 90 } }
    }
  },
  "Away": { "id": 2, "club": "Blues", "players": {} },
  "matchData": {
    "home": { "goals": [ { "time": 41, "playerId": 100 } ] },
    "away": { "goals": [ { "time": 77, "playerId": 250, "type": "var" } ] }
  }
}"#;

const MATCH_TWO: &str = r#"{
  "id": 2,
  "dateMatch": "2019-08-17",
  "championship": 2,
  "Home": {
    "id": 3,
    "club": "Greens",
    "players": {
      "player_100": { "info": { "idplayer": 100, "lastname": "Wanderer", "position": "forward", "mins_played": 85 } }
    }
  },
  "Away": { "id": 1, "club": "Reds", "players": {} },
  "matchData": { "home": { "goals": [] }, "away": { "goals": [] } }
}"#;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn write_corpus(dir: &Path) {
    fs::create_dir_all(dir).unwrap();
    fs::write(dir.join("match_1.json"), MATCH_ONE).unwrap();
    fs::write(dir.join("match_2.json"), MATCH_TWO).unwrap();
}

#[test]
fn two_document_corpus_builds_the_expected_tables() {
    let tmp = tempfile::tempdir().unwrap();
    let raw_dir = tmp.path().join("data");
    let out_dir = tmp.path().join("csv_output");
    write_corpus(&raw_dir);

    let (dataset, report) = store::load_or_build(&raw_dir, &out_dir, false).unwrap();
    let report = report.expect("first run parses the corpus");
    assert_eq!(report.documents_parsed, 2);
    assert_eq!(report.documents_skipped, 0);

    let first = dataset.match_by_id(1).unwrap();
    assert_eq!(first.home_score, 1, "the accepted goal counts");
    assert_eq!(first.away_score, 0, "the annulled goal does not");

    assert_eq!(dataset.teams.len(), 3);
    assert_eq!(dataset.players.len(), 1);
    assert_eq!(dataset.matches.len(), 2);
    assert_eq!(dataset.match_players.len(), 2);

    let periods: Vec<_> = dataset
        .transfers
        .iter()
        .filter(|t| t.player_id == 100)
        .collect();
    assert_eq!(periods.len(), 2);
    assert_eq!(periods[0].team_name, "Reds");
    assert_eq!(periods[0].start_date, date(2019, 8, 10));
    assert_eq!(periods[0].end_date, date(2019, 8, 16));
    assert_eq!(periods[1].team_name, "Greens");
    assert_eq!(periods[1].start_date, date(2019, 8, 17));
    assert_eq!(periods[1].end_date, date(2019, 8, 17));

    for file in TABLE_FILES {
        assert!(out_dir.join(file).exists(), "{file} should be persisted");
    }
}

#[test]
fn cached_load_never_touches_the_raw_directory() {
    let tmp = tempfile::tempdir().unwrap();
    let raw_dir = tmp.path().join("data");
    let out_dir = tmp.path().join("csv_output");
    write_corpus(&raw_dir);

    let (built, _) = store::load_or_build(&raw_dir, &out_dir, false).unwrap();

    // Point the second run at a directory that does not exist: the cached
    // path must succeed without it, and must not create it.
    let gone = tmp.path().join("no_such_raw_dir");
    let (cached, report) = store::load_or_build(&gone, &out_dir, false).unwrap();
    assert!(report.is_none(), "cached load skips the parse path");
    assert!(!gone.exists());
    assert_eq!(cached.matches.len(), built.matches.len());
    assert_eq!(cached.transfers, built.transfers);
    assert_eq!(cached.match_players, built.match_players);
}

#[test]
fn force_refresh_reparses_the_corpus() {
    let tmp = tempfile::tempdir().unwrap();
    let raw_dir = tmp.path().join("data");
    let out_dir = tmp.path().join("csv_output");
    write_corpus(&raw_dir);

    store::load_or_build(&raw_dir, &out_dir, false).unwrap();
    fs::write(raw_dir.join("match_2.json"), "{ broken").unwrap();

    let (_, report) = store::load_or_build(&raw_dir, &out_dir, true).unwrap();
    let report = report.expect("forced refresh reparses");
    assert_eq!(report.documents_parsed, 1);
    assert_eq!(report.documents_skipped, 1);
}

#[test]
fn rerun_with_same_team_id_keeps_first_name() {
    let tmp = tempfile::tempdir().unwrap();
    let raw_dir = tmp.path().join("data");
    let out_dir = tmp.path().join("csv_output");
    fs::create_dir_all(&raw_dir).unwrap();
    fs::write(
        raw_dir.join("a.json"),
        r#"{"id": 1, "Home": {"id": 5, "club": "First Name"}, "Away": {"id": 6, "club": "Other"}}"#,
    )
    .unwrap();
    fs::write(
        raw_dir.join("b.json"),
        r#"{"id": 2, "Home": {"id": 5, "club": "Second Name"}, "Away": {"id": 7, "club": "Third"}}"#,
    )
    .unwrap();

    let (dataset, _) = store::load_or_build(&raw_dir, &out_dir, false).unwrap();
    assert_eq!(dataset.team_name(5), Some("First Name"));
    assert_eq!(dataset.teams.len(), 3);
}
