use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use footdata::extract::extract_document;
use footdata::tables::{Appearance, Dataset, MatchRow, Player, Team};
use footdata::transfers::infer_transfer_periods;

fn bench_extract_document(c: &mut Criterion) {
    let doc: serde_json::Value = serde_json::from_str(MATCH_JSON).expect("valid bench json");
    c.bench_function("extract_document", |b| {
        b.iter(|| {
            let rows = extract_document(black_box(&doc)).unwrap();
            black_box(rows.appearances.len());
        })
    });
}

/// 40 players over four seasons of weekly matches, changing club every
/// season, which is roughly the per-player density of a real corpus.
fn sample_history() -> Dataset {
    let teams: Vec<Team> = (1..=8)
        .map(|id| Team {
            team_id: id,
            name: format!("Club {id}"),
        })
        .collect();
    let players: Vec<Player> = (1..=40)
        .map(|id| Player {
            player_id: id,
            last_name: Some(format!("Player {id}")),
        })
        .collect();

    let mut matches = Vec::new();
    let mut match_players = Vec::new();
    let mut match_id = 0u64;
    for season in 0..4 {
        for week in 0..38u64 {
            match_id += 1;
            let day = chrono::NaiveDate::from_ymd_opt(2016 + season, 8, 1)
                .unwrap()
                .checked_add_days(chrono::Days::new(week * 7))
                .unwrap();
            matches.push(MatchRow {
                match_id,
                date: Some(day.format("%Y-%m-%d").to_string()),
                home_team_id: None,
                away_team_id: None,
                duration: None,
                period: None,
                championship: Some(1),
                home_formation: None,
                away_formation: None,
                odds_home: None,
                odds_away: None,
                odds_draw: None,
                home_score: 0,
                away_score: 0,
            });
            for player in 1..=40u32 {
                match_players.push(Appearance {
                    player_id: Some(player),
                    match_id,
                    team_id: Some(1 + (player + season as u32) % 8),
                    ..Default::default()
                });
            }
        }
    }

    Dataset {
        teams,
        players,
        matches,
        match_players,
        ..Default::default()
    }
}

fn bench_transfer_inference(c: &mut Criterion) {
    let dataset = sample_history();
    c.bench_function("infer_transfer_periods", |b| {
        b.iter(|| {
            let periods = infer_transfer_periods(black_box(&dataset));
            black_box(periods.len());
        })
    });
}

criterion_group!(benches, bench_extract_document, bench_transfer_inference);
criterion_main!(benches);

const MATCH_JSON: &str = r#"{
  "id": 3001,
  "dateMatch": "2020-09-12T16:00:00+00:00",
  "matchTime": 96,
  "period": "fulltime",
  "championship": 1,
  "Home": {
    "id": 21,
    "club": "Home FC",
    "players": {
      "player_1": {
        "info": {
          "idplayer": 1,
          "lastname": "One",
          "position": "goalkeeper",
          "formation_place": 1,
          "mins_played": 96,
          "note_final_2015": 6.0,
          "formation_used": "4231"
        },
        "stat": { "saves": 4, "passes": 22 }
      },
      "player_2": {
        "info": {
          "idplayer": 2,
          "lastname": "Two",
          "position": "defender",
          "formation_place": 4,
          "mins_played": 96,
          "note_final_2015": 5.5,
          "formation_used": "4231"
        },
        "stat": { "tackles": 3, "passes": 54, "interceptions": 2 }
      },
      "player_3": {
        "info": {
          "idplayer": 3,
          "lastname": "Three",
          "position": "forward",
          "formation_place": 9,
          "mins_played": 81,
          "note_final_2015": 7.5,
          "formation_used": "4231"
        },
        "stat": { "goals": 1, "shots": 5, "passes": 18 }
      }
    }
  },
  "Away": {
    "id": 22,
    "club": "Away FC",
    "players": {
      "player_4": {
        "info": {
          "idplayer": 4,
          "lastname": "Four",
          "position": "midfielder",
          "formation_place": 8,
          "mins_played": 96,
          "note_final_2015": 6.5,
          "formation_used": "352"
        },
        "stat": { "passes": 71, "key_passes": 2 }
      }
    }
  },
  "quotationPreGame": { "Home": 2.1, "Away": 3.4, "Draw": 3.2 },
  "quotationPlayers": { "player_3": 1.8 },
  "matchData": {
    "home": {
      "goals": [
        { "time": 23, "playerId": 3 },
        { "time": 67, "playerId": 3, "type": "var" }
      ],
      "bookings": [ { "time": 41, "playerId": 2, "type": "yellow" } ],
      "substitutions": [ { "time": 81, "subOff": 3, "subOn": 2, "reason": "tactical" } ]
    },
    "away": {
      "goals": [ { "time": 88, "playerId": 4 } ],
      "bookings": [],
      "substitutions": []
    }
  },
  "timeline": [
    { "type": "substitution", "time": 81, "subOff": 3, "subOn": 2, "reason": "tactical" }
  ]
}"#;
