use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;

use crate::tables::{Dataset, TransferPeriod, parse_match_date};

/// Fallback when a player id has no name row. Team names already default at
/// extraction time, so only player lookups can miss here.
const UNKNOWN_PLAYER: &str = "Unknown";

/// One appearance joined with its match date and team name, the unit the
/// inference walks over.
#[derive(Debug, Clone)]
struct DatedAppearance {
    date: NaiveDate,
    match_id: u64,
    team_name: String,
}

/// Reconstruct per-player club-tenure intervals from the appearance table.
///
/// Appearances are grouped by player and walked in `(date, match_id)` order;
/// a change of team name closes the open period one day before the new
/// team's first appearance. Every player with at least one dated appearance
/// yields at least one period, covering their first through last appearance
/// date with no gaps and no overlaps.
pub fn infer_transfer_periods(dataset: &Dataset) -> Vec<TransferPeriod> {
    let match_dates: HashMap<u64, NaiveDate> = dataset
        .matches
        .iter()
        .filter_map(|m| {
            let date = m.date.as_deref().and_then(parse_match_date)?;
            Some((m.match_id, date))
        })
        .collect();
    let team_names: HashMap<u32, &str> = dataset
        .teams
        .iter()
        .map(|t| (t.team_id, t.name.as_str()))
        .collect();

    // BTreeMap so the output is ordered by player id, matching the sort the
    // persisted table is expected to have.
    let mut by_player: BTreeMap<u32, Vec<DatedAppearance>> = BTreeMap::new();
    for row in &dataset.match_players {
        let Some(player_id) = row.player_id else {
            continue;
        };
        let Some(date) = match_dates.get(&row.match_id).copied() else {
            continue;
        };
        let Some(team_name) = row.team_id.and_then(|id| team_names.get(&id).copied()) else {
            continue;
        };
        by_player.entry(player_id).or_default().push(DatedAppearance {
            date,
            match_id: row.match_id,
            team_name: team_name.to_string(),
        });
    }

    let mut periods = Vec::new();
    for (player_id, mut rows) in by_player {
        rows.sort_by(|a, b| (a.date, a.match_id).cmp(&(b.date, b.match_id)));
        let player_name = dataset
            .player_last_name(player_id)
            .unwrap_or(UNKNOWN_PLAYER)
            .to_string();
        walk_player(player_id, &player_name, &rows, &mut periods);
    }
    periods
}

fn walk_player(
    player_id: u32,
    player_name: &str,
    rows: &[DatedAppearance],
    out: &mut Vec<TransferPeriod>,
) {
    let Some(first) = rows.first() else {
        return;
    };
    let mut current_team = first.team_name.as_str();
    let mut start_date = first.date;

    for row in &rows[1..] {
        if row.team_name != current_team {
            out.push(TransferPeriod {
                player_id,
                player_name: player_name.to_string(),
                team_name: current_team.to_string(),
                start_date,
                end_date: row.date.pred_opt().unwrap_or(row.date),
            });
            current_team = row.team_name.as_str();
            start_date = row.date;
        }
    }

    // Close whatever is open at the last appearance; a single-team history
    // yields exactly this one period.
    let last_date = rows.last().map(|r| r.date).unwrap_or(start_date);
    out.push(TransferPeriod {
        player_id,
        player_name: player_name.to_string(),
        team_name: current_team.to_string(),
        start_date,
        end_date: last_date,
    });
}
