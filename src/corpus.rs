use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::{info, warn};

use crate::extract;
use crate::tables::{Appearance, Highlight, MatchRow, Player, Substitution, Team};

/// Accumulated rows from one pass over the raw corpus, before table-level
/// dedup and persistence.
#[derive(Debug, Clone, Default)]
pub struct RawTables {
    pub teams: Vec<Team>,
    pub players: Vec<Player>,
    pub matches: Vec<MatchRow>,
    pub match_players: Vec<Appearance>,
    pub highlights: Vec<Highlight>,
    pub substitutions: Vec<Substitution>,
}

#[derive(Debug, Clone, Default)]
pub struct CorpusReport {
    pub documents_parsed: usize,
    pub documents_skipped: usize,
    pub errors: Vec<String>,
}

/// Walk every `.json` document under `dir` and flatten it. A missing
/// directory is created and yields empty tables; a malformed document is
/// skipped and reported, never fatal. All tables come from the same
/// successfully-parsed document set.
pub fn load_corpus(dir: &Path) -> Result<(RawTables, CorpusReport)> {
    let mut tables = RawTables::default();
    let mut report = CorpusReport::default();

    if !dir.exists() {
        warn!(dir = %dir.display(), "raw data directory missing, creating it empty");
        fs::create_dir_all(dir)
            .with_context(|| format!("create raw data directory {}", dir.display()))?;
        return Ok((tables, report));
    }

    let mut seen_teams: HashSet<u32> = HashSet::new();
    let mut seen_players: HashSet<u32> = HashSet::new();

    for path in document_paths(dir)? {
        let doc = match read_document(&path) {
            Ok(doc) => doc,
            Err(err) => {
                warn!(file = %path.display(), %err, "skipping document");
                report.errors.push(format!("{}: {err:#}", path.display()));
                report.documents_skipped += 1;
                continue;
            }
        };

        let Some(rows) = extract::extract_document(&doc) else {
            warn!(file = %path.display(), "skipping document without a match id");
            report
                .errors
                .push(format!("{}: missing match id", path.display()));
            report.documents_skipped += 1;
            continue;
        };

        for team in rows.teams {
            if seen_teams.insert(team.team_id) {
                tables.teams.push(team);
            }
        }
        for player in rows.players {
            if seen_players.insert(player.player_id) {
                tables.players.push(player);
            }
        }
        tables.matches.push(rows.match_row);
        tables.match_players.extend(rows.appearances);
        tables.highlights.extend(rows.highlights);
        tables.substitutions.extend(rows.substitutions);
        report.documents_parsed += 1;
    }

    info!(
        parsed = report.documents_parsed,
        skipped = report.documents_skipped,
        "corpus loaded"
    );
    Ok((tables, report))
}

/// Recognized documents only, in filename order so accumulation (and
/// first-seen dedup) is deterministic across runs.
fn document_paths(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries =
        fs::read_dir(dir).with_context(|| format!("read raw data directory {}", dir.display()))?;
    let mut paths = Vec::new();
    for entry in entries {
        let entry = entry.with_context(|| format!("list {}", dir.display()))?;
        let path = entry.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

fn read_document(path: &Path) -> Result<Value> {
    let raw =
        fs::read_to_string(path).with_context(|| format!("read document {}", path.display()))?;
    serde_json::from_str::<Value>(raw.trim())
        .with_context(|| format!("invalid json in {}", path.display()))
}
