use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::corpus::{self, CorpusReport, RawTables};
use crate::csv::{opt_cell, parse_cell, parse_rows, table_to_string};
use crate::tables::{
    Appearance, Dataset, Highlight, MatchRow, Player, Substitution, Team, TransferPeriod,
};
use crate::transfers;

pub const TEAMS_FILE: &str = "teams.csv";
pub const PLAYERS_FILE: &str = "players.csv";
pub const MATCHES_FILE: &str = "matches.csv";
pub const MATCH_PLAYERS_FILE: &str = "match_players.csv";
pub const HIGHLIGHTS_FILE: &str = "highlights.csv";
pub const SUBSTITUTIONS_FILE: &str = "substitutions.csv";
pub const TRANSFERS_FILE: &str = "transfers.csv";

pub const TABLE_FILES: [&str; 7] = [
    TEAMS_FILE,
    PLAYERS_FILE,
    MATCHES_FILE,
    MATCH_PLAYERS_FILE,
    HIGHLIGHTS_FILE,
    SUBSTITUTIONS_FILE,
    TRANSFERS_FILE,
];

const MANIFEST_FILE: &str = "manifest.json";
const MANIFEST_VERSION: u32 = 1;

const TEAM_COLUMNS: [&str; 2] = ["team_id", "name"];
const PLAYER_COLUMNS: [&str; 2] = ["player_id", "last_name"];
const MATCH_COLUMNS: [&str; 14] = [
    "match_id",
    "date",
    "home_team_id",
    "away_team_id",
    "duration",
    "period",
    "championship",
    "home_formation",
    "away_formation",
    "odds_home",
    "odds_away",
    "odds_draw",
    "home_score",
    "away_score",
];
const APPEARANCE_COLUMNS: [&str; 8] = [
    "player_id",
    "match_id",
    "team_id",
    "position",
    "formation_slot",
    "minutes_played",
    "season_mark",
    "player_odds",
];
const HIGHLIGHT_COLUMNS: [&str; 4] = ["match_id", "minute", "player_id", "kind"];
const SUBSTITUTION_COLUMNS: [&str; 5] = ["match_id", "minute", "player_off", "player_on", "reason"];
const TRANSFER_COLUMNS: [&str; 5] = [
    "player_id",
    "player_name",
    "team_name",
    "start_date",
    "end_date",
];

/// Written after the seven tables; its presence (with a matching version)
/// marks a complete, trustworthy output directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Manifest {
    version: u32,
    documents_parsed: usize,
    rows: Vec<(String, usize)>,
}

/// Table-level dedup, keep-first: Team by id, Player by id, Match by id.
/// Appearance/highlight/substitution rows pass through untouched.
pub fn materialize(raw: RawTables) -> Dataset {
    let mut seen_teams = HashSet::new();
    let mut seen_players = HashSet::new();
    let mut seen_matches = HashSet::new();

    Dataset {
        teams: raw
            .teams
            .into_iter()
            .filter(|t| seen_teams.insert(t.team_id))
            .collect(),
        players: raw
            .players
            .into_iter()
            .filter(|p| seen_players.insert(p.player_id))
            .collect(),
        matches: raw
            .matches
            .into_iter()
            .filter(|m| seen_matches.insert(m.match_id))
            .collect(),
        match_players: raw.match_players,
        highlights: raw.highlights,
        substitutions: raw.substitutions,
        transfers: Vec::new(),
    }
}

/// Cached load unless forced or incomplete, otherwise the full parse path:
/// corpus -> materialize -> transfer inference -> persist. The report is
/// `None` when the tables came straight from disk.
pub fn load_or_build(
    raw_dir: &Path,
    out_dir: &Path,
    force_refresh: bool,
) -> Result<(Dataset, Option<CorpusReport>)> {
    if !force_refresh
        && let Some(dataset) = load_cached(out_dir)?
    {
        info!(dir = %out_dir.display(), "tables loaded from cache");
        return Ok((dataset, None));
    }

    let (raw, report) = corpus::load_corpus(raw_dir)?;
    let mut dataset = materialize(raw);
    dataset.transfers = transfers::infer_transfer_periods(&dataset);
    write_tables(&dataset, out_dir, report.documents_parsed)?;
    Ok((dataset, Some(report)))
}

/// Persist all seven tables. Every file is staged as a `.tmp` sibling first
/// and the whole group is renamed into place only once all writes succeeded,
/// so a crash mid-write never leaves a mix of old and new tables behind the
/// manifest.
pub fn write_tables(dataset: &Dataset, out_dir: &Path, documents_parsed: usize) -> Result<()> {
    fs::create_dir_all(out_dir)
        .with_context(|| format!("create output directory {}", out_dir.display()))?;

    let rendered: [(&str, String); 7] = [
        (TEAMS_FILE, render_teams(&dataset.teams)),
        (PLAYERS_FILE, render_players(&dataset.players)),
        (MATCHES_FILE, render_matches(&dataset.matches)),
        (
            MATCH_PLAYERS_FILE,
            render_appearances(&dataset.match_players),
        ),
        (HIGHLIGHTS_FILE, render_highlights(&dataset.highlights)),
        (
            SUBSTITUTIONS_FILE,
            render_substitutions(&dataset.substitutions),
        ),
        (TRANSFERS_FILE, render_transfers(&dataset.transfers)),
    ];

    let mut staged: Vec<(PathBuf, PathBuf)> = Vec::with_capacity(rendered.len());
    for (name, content) in &rendered {
        let target = out_dir.join(name);
        let tmp = out_dir.join(format!("{name}.tmp"));
        fs::write(&tmp, content).with_context(|| format!("write table {}", tmp.display()))?;
        staged.push((tmp, target));
    }
    for (tmp, target) in &staged {
        fs::rename(tmp, target).with_context(|| format!("swap table {}", target.display()))?;
    }

    let manifest = Manifest {
        version: MANIFEST_VERSION,
        documents_parsed,
        rows: vec![
            (TEAMS_FILE.to_string(), dataset.teams.len()),
            (PLAYERS_FILE.to_string(), dataset.players.len()),
            (MATCHES_FILE.to_string(), dataset.matches.len()),
            (MATCH_PLAYERS_FILE.to_string(), dataset.match_players.len()),
            (HIGHLIGHTS_FILE.to_string(), dataset.highlights.len()),
            (SUBSTITUTIONS_FILE.to_string(), dataset.substitutions.len()),
            (TRANSFERS_FILE.to_string(), dataset.transfers.len()),
        ],
    };
    let manifest_path = out_dir.join(MANIFEST_FILE);
    let tmp = manifest_path.with_extension("json.tmp");
    let json = serde_json::to_string_pretty(&manifest).context("serialize manifest")?;
    fs::write(&tmp, json).with_context(|| format!("write manifest {}", tmp.display()))?;
    fs::rename(&tmp, &manifest_path)
        .with_context(|| format!("swap manifest {}", manifest_path.display()))?;

    info!(dir = %out_dir.display(), "tables written");
    Ok(())
}

/// Reload the persisted tables without touching the raw corpus. `None` when
/// the manifest is absent, from another format version, or any table file is
/// missing; a present-but-unreadable table is a hard error.
pub fn load_cached(out_dir: &Path) -> Result<Option<Dataset>> {
    let Ok(raw) = fs::read_to_string(out_dir.join(MANIFEST_FILE)) else {
        return Ok(None);
    };
    let Ok(manifest) = serde_json::from_str::<Manifest>(&raw) else {
        return Ok(None);
    };
    if manifest.version != MANIFEST_VERSION {
        return Ok(None);
    }
    if TABLE_FILES.iter().any(|f| !out_dir.join(f).exists()) {
        return Ok(None);
    }

    let dataset = Dataset {
        teams: parse_teams(&read_table(out_dir, TEAMS_FILE)?)
            .with_context(|| format!("parse {}", TEAMS_FILE))?,
        players: parse_players(&read_table(out_dir, PLAYERS_FILE)?)
            .with_context(|| format!("parse {}", PLAYERS_FILE))?,
        matches: parse_matches(&read_table(out_dir, MATCHES_FILE)?)
            .with_context(|| format!("parse {}", MATCHES_FILE))?,
        match_players: parse_appearances(&read_table(out_dir, MATCH_PLAYERS_FILE)?)
            .with_context(|| format!("parse {}", MATCH_PLAYERS_FILE))?,
        highlights: parse_highlights(&read_table(out_dir, HIGHLIGHTS_FILE)?)
            .with_context(|| format!("parse {}", HIGHLIGHTS_FILE))?,
        substitutions: parse_substitutions(&read_table(out_dir, SUBSTITUTIONS_FILE)?)
            .with_context(|| format!("parse {}", SUBSTITUTIONS_FILE))?,
        transfers: parse_transfers(&read_table(out_dir, TRANSFERS_FILE)?)
            .with_context(|| format!("parse {}", TRANSFERS_FILE))?,
    };
    Ok(Some(dataset))
}

fn read_table(out_dir: &Path, name: &str) -> Result<String> {
    let path = out_dir.join(name);
    fs::read_to_string(&path).with_context(|| format!("read table {}", path.display()))
}

fn header_of(columns: &[&str]) -> Vec<String> {
    columns.iter().map(|c| c.to_string()).collect()
}

/// Split a parsed CSV into header + data rows and check the fixed prefix of
/// the header. Returns the full header for tables with dynamic columns.
fn split_table<'a>(
    rows: &'a [Vec<String>],
    fixed: &[&str],
) -> Result<(&'a [String], &'a [Vec<String>])> {
    let Some((header, data)) = rows.split_first() else {
        return Err(anyhow!("table is empty, missing header"));
    };
    if header.len() < fixed.len() || !header.iter().zip(fixed).all(|(a, b)| a == b) {
        return Err(anyhow!("unexpected header {header:?}"));
    }
    Ok((header.as_slice(), data))
}

fn cell<'a>(row: &'a [String], idx: usize) -> &'a str {
    row.get(idx).map(String::as_str).unwrap_or("")
}

fn render_teams(teams: &[Team]) -> String {
    let rows: Vec<Vec<String>> = teams
        .iter()
        .map(|t| vec![t.team_id.to_string(), t.name.clone()])
        .collect();
    table_to_string(&header_of(&TEAM_COLUMNS), &rows)
}

fn parse_teams(text: &str) -> Result<Vec<Team>> {
    let rows = parse_rows(text);
    let (_, data) = split_table(&rows, &TEAM_COLUMNS)?;
    data.iter()
        .map(|row| {
            Ok(Team {
                team_id: parse_cell(cell(row, 0))
                    .ok_or_else(|| anyhow!("bad team id in {row:?}"))?,
                name: cell(row, 1).to_string(),
            })
        })
        .collect()
}

fn render_players(players: &[Player]) -> String {
    let rows: Vec<Vec<String>> = players
        .iter()
        .map(|p| vec![p.player_id.to_string(), opt_cell(&p.last_name)])
        .collect();
    table_to_string(&header_of(&PLAYER_COLUMNS), &rows)
}

fn parse_players(text: &str) -> Result<Vec<Player>> {
    let rows = parse_rows(text);
    let (_, data) = split_table(&rows, &PLAYER_COLUMNS)?;
    data.iter()
        .map(|row| {
            Ok(Player {
                player_id: parse_cell(cell(row, 0))
                    .ok_or_else(|| anyhow!("bad player id in {row:?}"))?,
                last_name: non_empty(cell(row, 1)),
            })
        })
        .collect()
}

fn render_matches(matches: &[MatchRow]) -> String {
    let rows: Vec<Vec<String>> = matches
        .iter()
        .map(|m| {
            vec![
                m.match_id.to_string(),
                opt_cell(&m.date),
                opt_cell(&m.home_team_id),
                opt_cell(&m.away_team_id),
                opt_cell(&m.duration),
                opt_cell(&m.period),
                opt_cell(&m.championship),
                opt_cell(&m.home_formation),
                opt_cell(&m.away_formation),
                opt_cell(&m.odds_home),
                opt_cell(&m.odds_away),
                opt_cell(&m.odds_draw),
                m.home_score.to_string(),
                m.away_score.to_string(),
            ]
        })
        .collect();
    table_to_string(&header_of(&MATCH_COLUMNS), &rows)
}

fn parse_matches(text: &str) -> Result<Vec<MatchRow>> {
    let rows = parse_rows(text);
    let (_, data) = split_table(&rows, &MATCH_COLUMNS)?;
    data.iter()
        .map(|row| {
            Ok(MatchRow {
                match_id: parse_cell(cell(row, 0))
                    .ok_or_else(|| anyhow!("bad match id in {row:?}"))?,
                date: non_empty(cell(row, 1)),
                home_team_id: parse_cell(cell(row, 2)),
                away_team_id: parse_cell(cell(row, 3)),
                duration: parse_cell(cell(row, 4)),
                period: non_empty(cell(row, 5)),
                championship: parse_cell(cell(row, 6)),
                home_formation: non_empty(cell(row, 7)),
                away_formation: non_empty(cell(row, 8)),
                odds_home: parse_cell(cell(row, 9)),
                odds_away: parse_cell(cell(row, 10)),
                odds_draw: parse_cell(cell(row, 11)),
                home_score: parse_cell(cell(row, 12)).unwrap_or(0),
                away_score: parse_cell(cell(row, 13)).unwrap_or(0),
            })
        })
        .collect()
}

/// The appearance table carries the union of every dynamic stat key seen in
/// the corpus as extra columns, sorted for a stable order. Rows lacking a key
/// leave the cell empty.
fn render_appearances(appearances: &[Appearance]) -> String {
    let extra_keys: BTreeSet<&str> = appearances
        .iter()
        .flat_map(|a| a.extra.keys().map(String::as_str))
        .collect();

    let mut header = header_of(&APPEARANCE_COLUMNS);
    header.extend(extra_keys.iter().map(|k| k.to_string()));

    let rows: Vec<Vec<String>> = appearances
        .iter()
        .map(|a| {
            let mut row = vec![
                opt_cell(&a.player_id),
                a.match_id.to_string(),
                opt_cell(&a.team_id),
                opt_cell(&a.position),
                opt_cell(&a.formation_slot),
                opt_cell(&a.minutes_played),
                opt_cell(&a.season_mark),
                opt_cell(&a.player_odds),
            ];
            for key in &extra_keys {
                row.push(
                    a.extra
                        .get(*key)
                        .map(|v| v.to_string())
                        .unwrap_or_default(),
                );
            }
            row
        })
        .collect();
    table_to_string(&header, &rows)
}

fn parse_appearances(text: &str) -> Result<Vec<Appearance>> {
    let rows = parse_rows(text);
    let (header, data) = split_table(&rows, &APPEARANCE_COLUMNS)?;
    let extra_keys: Vec<&String> = header[APPEARANCE_COLUMNS.len()..].iter().collect();

    data.iter()
        .map(|row| {
            let mut extra = std::collections::BTreeMap::new();
            for (offset, key) in extra_keys.iter().enumerate() {
                if let Some(v) = parse_cell::<f64>(cell(row, APPEARANCE_COLUMNS.len() + offset)) {
                    extra.insert((*key).clone(), v);
                }
            }
            Ok(Appearance {
                player_id: parse_cell(cell(row, 0)),
                match_id: parse_cell(cell(row, 1))
                    .ok_or_else(|| anyhow!("bad match id in {row:?}"))?,
                team_id: parse_cell(cell(row, 2)),
                position: non_empty(cell(row, 3)),
                formation_slot: parse_cell(cell(row, 4)),
                minutes_played: parse_cell(cell(row, 5)),
                season_mark: parse_cell(cell(row, 6)),
                player_odds: parse_cell(cell(row, 7)),
                extra,
            })
        })
        .collect()
}

fn render_highlights(highlights: &[Highlight]) -> String {
    let rows: Vec<Vec<String>> = highlights
        .iter()
        .map(|h| {
            vec![
                h.match_id.to_string(),
                opt_cell(&h.minute),
                opt_cell(&h.player_id),
                h.kind.clone(),
            ]
        })
        .collect();
    table_to_string(&header_of(&HIGHLIGHT_COLUMNS), &rows)
}

fn parse_highlights(text: &str) -> Result<Vec<Highlight>> {
    let rows = parse_rows(text);
    let (_, data) = split_table(&rows, &HIGHLIGHT_COLUMNS)?;
    data.iter()
        .map(|row| {
            Ok(Highlight {
                match_id: parse_cell(cell(row, 0))
                    .ok_or_else(|| anyhow!("bad match id in {row:?}"))?,
                minute: parse_cell(cell(row, 1)),
                player_id: parse_cell(cell(row, 2)),
                kind: cell(row, 3).to_string(),
            })
        })
        .collect()
}

fn render_substitutions(substitutions: &[Substitution]) -> String {
    let rows: Vec<Vec<String>> = substitutions
        .iter()
        .map(|s| {
            vec![
                s.match_id.to_string(),
                opt_cell(&s.minute),
                opt_cell(&s.player_off),
                opt_cell(&s.player_on),
                s.reason.clone(),
            ]
        })
        .collect();
    table_to_string(&header_of(&SUBSTITUTION_COLUMNS), &rows)
}

fn parse_substitutions(text: &str) -> Result<Vec<Substitution>> {
    let rows = parse_rows(text);
    let (_, data) = split_table(&rows, &SUBSTITUTION_COLUMNS)?;
    data.iter()
        .map(|row| {
            Ok(Substitution {
                match_id: parse_cell(cell(row, 0))
                    .ok_or_else(|| anyhow!("bad match id in {row:?}"))?,
                minute: parse_cell(cell(row, 1)),
                player_off: parse_cell(cell(row, 2)),
                player_on: parse_cell(cell(row, 3)),
                reason: cell(row, 4).to_string(),
            })
        })
        .collect()
}

fn render_transfers(transfers: &[TransferPeriod]) -> String {
    let rows: Vec<Vec<String>> = transfers
        .iter()
        .map(|t| {
            vec![
                t.player_id.to_string(),
                t.player_name.clone(),
                t.team_name.clone(),
                t.start_date.format("%Y-%m-%d").to_string(),
                t.end_date.format("%Y-%m-%d").to_string(),
            ]
        })
        .collect();
    table_to_string(&header_of(&TRANSFER_COLUMNS), &rows)
}

fn parse_transfers(text: &str) -> Result<Vec<TransferPeriod>> {
    let rows = parse_rows(text);
    let (_, data) = split_table(&rows, &TRANSFER_COLUMNS)?;
    data.iter()
        .map(|row| {
            Ok(TransferPeriod {
                player_id: parse_cell(cell(row, 0))
                    .ok_or_else(|| anyhow!("bad player id in {row:?}"))?,
                player_name: cell(row, 1).to_string(),
                team_name: cell(row, 2).to_string(),
                start_date: parse_date_cell(cell(row, 3))?,
                end_date: parse_date_cell(cell(row, 4))?,
            })
        })
        .collect()
}

fn parse_date_cell(cell: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(cell.trim(), "%Y-%m-%d")
        .with_context(|| format!("bad date cell {cell:?}"))
}

fn non_empty(cell: &str) -> Option<String> {
    if cell.is_empty() {
        None
    } else {
        Some(cell.to_string())
    }
}
