//! Read-only aggregates over a loaded [`Dataset`]. Every function here backs
//! one presentation widget; none of them mutate or re-read the tables, and
//! lookup misses surface as `Option`/empty collections rather than panics.

use std::collections::{BTreeMap, HashMap};

use chrono::{Datelike, NaiveDate};
use rand::Rng;

use crate::tables::{Dataset, MatchRow, Player, parse_match_date};

/// Sentinel for ids that resolve to no name row.
pub const UNKNOWN_NAME: &str = "Unknown";

#[derive(Debug, Clone, PartialEq)]
pub struct ClubRecord {
    pub team_id: u32,
    pub name: String,
    pub wins: u32,
    pub draws: u32,
    pub losses: u32,
}

impl ClubRecord {
    pub fn played(&self) -> u32 {
        self.wins + self.draws + self.losses
    }

    pub fn win_ratio(&self) -> f64 {
        if self.played() == 0 {
            0.0
        } else {
            f64::from(self.wins) / f64::from(self.played())
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScorerEntry {
    pub player_id: u32,
    pub name: String,
    pub goals: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CardCounts {
    pub yellow: u32,
    pub red: u32,
}

/// Venue-by-outcome contingency counts: one row per venue, columns are
/// win/draw/loss from that venue's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VenueContingency {
    pub home: [u32; 3],
    pub away: [u32; 3],
}

impl VenueContingency {
    /// Row percentages, `None` for an empty row.
    pub fn row_percentages(&self) -> [Option<[f64; 3]>; 2] {
        [percentages(&self.home), percentages(&self.away)]
    }
}

fn percentages(row: &[u32; 3]) -> Option<[f64; 3]> {
    let total: u32 = row.iter().sum();
    if total == 0 {
        return None;
    }
    Some(row.map(|n| 100.0 * f64::from(n) / f64::from(total)))
}

#[derive(Debug, Clone, PartialEq)]
pub struct FormationRecord {
    pub formation: String,
    pub played: u32,
    pub wins: u32,
}

impl FormationRecord {
    pub fn win_rate(&self) -> f64 {
        if self.played == 0 {
            0.0
        } else {
            f64::from(self.wins) / f64::from(self.played)
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BettingEntry {
    pub team_id: u32,
    pub name: String,
    pub matches_considered: u32,
    pub gain: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FormPoint {
    pub date: NaiveDate,
    pub mark: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyMark {
    pub month: NaiveDate,
    pub position: String,
    pub avg_mark: f64,
}

pub fn find_player_by_lastname<'a>(dataset: &'a Dataset, last_name: &str) -> Option<&'a Player> {
    dataset.players.iter().find(|p| {
        p.last_name
            .as_deref()
            .is_some_and(|n| n.eq_ignore_ascii_case(last_name))
    })
}

/// Win/draw/loss tally per club over the given championship, optionally
/// restricted to a date window (exclusive bounds, matching the season
/// filters the dashboard applies).
pub fn club_results(
    dataset: &Dataset,
    championship: u32,
    window: Option<(NaiveDate, NaiveDate)>,
) -> Vec<ClubRecord> {
    let mut records: BTreeMap<u32, ClubRecord> = BTreeMap::new();

    for m in filtered_matches(dataset, championship, window) {
        let (Some(home_id), Some(away_id)) = (m.home_team_id, m.away_team_id) else {
            continue;
        };
        for (team_id, for_score, against_score) in [
            (home_id, m.home_score, m.away_score),
            (away_id, m.away_score, m.home_score),
        ] {
            let entry = records.entry(team_id).or_insert_with(|| ClubRecord {
                team_id,
                name: dataset
                    .team_name(team_id)
                    .unwrap_or(UNKNOWN_NAME)
                    .to_string(),
                wins: 0,
                draws: 0,
                losses: 0,
            });
            if for_score > against_score {
                entry.wins += 1;
            } else if for_score < against_score {
                entry.losses += 1;
            } else {
                entry.draws += 1;
            }
        }
    }

    let mut out: Vec<ClubRecord> = records.into_values().collect();
    out.sort_by(|a, b| a.name.cmp(&b.name));
    out
}

/// Clubs ordered by win ratio, best first, ties broken by games played then
/// name so the ranking is stable.
pub fn win_ratio_ranking(
    dataset: &Dataset,
    championship: u32,
    window: Option<(NaiveDate, NaiveDate)>,
    top_n: usize,
) -> Vec<ClubRecord> {
    let mut records = club_results(dataset, championship, window);
    records.sort_by(|a, b| {
        b.win_ratio()
            .partial_cmp(&a.win_ratio())
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(b.played().cmp(&a.played()))
            .then(a.name.cmp(&b.name))
    });
    records.truncate(top_n);
    records
}

fn filtered_matches<'a>(
    dataset: &'a Dataset,
    championship: u32,
    window: Option<(NaiveDate, NaiveDate)>,
) -> impl Iterator<Item = &'a MatchRow> {
    dataset
        .matches
        .iter()
        .filter(move |m| m.championship == Some(championship))
        .filter(move |m| match window {
            None => true,
            Some((start, end)) => match_date(m).is_some_and(|d| d > start && d < end),
        })
}

fn match_date(m: &MatchRow) -> Option<NaiveDate> {
    m.date.as_deref().and_then(parse_match_date)
}

pub fn matches_on(dataset: &Dataset, date: NaiveDate) -> Vec<&MatchRow> {
    dataset
        .matches
        .iter()
        .filter(|m| match_date(m) == Some(date))
        .collect()
}

pub fn matches_involving(dataset: &Dataset, team_id: u32) -> Vec<&MatchRow> {
    dataset
        .matches
        .iter()
        .filter(|m| m.home_team_id == Some(team_id) || m.away_team_id == Some(team_id))
        .collect()
}

pub fn head_to_head<'a>(dataset: &'a Dataset, team_a: u32, team_b: u32) -> Vec<&'a MatchRow> {
    dataset
        .matches
        .iter()
        .filter(|m| {
            (m.home_team_id == Some(team_a) && m.away_team_id == Some(team_b))
                || (m.home_team_id == Some(team_b) && m.away_team_id == Some(team_a))
        })
        .collect()
}

/// Distinct clubs a player has appeared for, in tenure order.
pub fn player_clubs(dataset: &Dataset, player_id: u32) -> Vec<String> {
    let mut clubs: Vec<String> = Vec::new();
    for period in dataset
        .transfers
        .iter()
        .filter(|t| t.player_id == player_id)
    {
        if !clubs.contains(&period.team_name) {
            clubs.push(period.team_name.clone());
        }
    }
    clubs
}

/// Yellow counts plain yellows; red counts both second yellows and straight
/// reds, the two codes the feed files red cards under.
pub fn card_counts(dataset: &Dataset, player_id: u32) -> CardCounts {
    let mut counts = CardCounts { yellow: 0, red: 0 };
    for h in dataset
        .highlights
        .iter()
        .filter(|h| h.player_id == Some(player_id))
    {
        match h.kind.as_str() {
            "yellowcard" => counts.yellow += 1,
            "secondyellow" | "straightred" => counts.red += 1,
            _ => {}
        }
    }
    counts
}

/// Accepted goals per player within one championship, most first. Names
/// resolve through the player table with the unknown sentinel on a miss.
pub fn top_scorers(dataset: &Dataset, championship: u32, top_n: usize) -> Vec<ScorerEntry> {
    let championship_of: HashMap<u64, Option<u32>> = dataset
        .matches
        .iter()
        .map(|m| (m.match_id, m.championship))
        .collect();

    let mut goals: BTreeMap<u32, u32> = BTreeMap::new();
    for h in &dataset.highlights {
        if h.kind != "goal" {
            continue;
        }
        let Some(player_id) = h.player_id else {
            continue;
        };
        if championship_of.get(&h.match_id).copied().flatten() != Some(championship) {
            continue;
        }
        *goals.entry(player_id).or_insert(0) += 1;
    }

    let mut out: Vec<ScorerEntry> = goals
        .into_iter()
        .map(|(player_id, goals)| ScorerEntry {
            player_id,
            name: dataset
                .player_last_name(player_id)
                .unwrap_or(UNKNOWN_NAME)
                .to_string(),
            goals,
        })
        .collect();
    out.sort_by(|a, b| b.goals.cmp(&a.goals).then(a.player_id.cmp(&b.player_id)));
    out.truncate(top_n);
    out
}

/// A player's rank among a championship's scorers, 1-based. `None` when the
/// player never scored there.
pub fn scorer_rank(dataset: &Dataset, championship: u32, player_id: u32) -> Option<(usize, usize)> {
    let scorers = top_scorers(dataset, championship, usize::MAX);
    let rank = scorers.iter().position(|s| s.player_id == player_id)? + 1;
    Some((rank, scorers.len()))
}

/// A random window of three consecutive rated appearances, oldest first.
/// `None` when the player has fewer than three marked, dated appearances.
pub fn mark_form_sample<R: Rng>(
    dataset: &Dataset,
    player_id: u32,
    rng: &mut R,
) -> Option<[FormPoint; 3]> {
    let mut points: Vec<FormPoint> = dataset
        .match_players
        .iter()
        .filter(|a| a.player_id == Some(player_id))
        .filter_map(|a| {
            let mark = a.season_mark?;
            let date = dataset.match_by_id(a.match_id).and_then(match_date)?;
            Some(FormPoint { date, mark })
        })
        .collect();
    if points.len() < 3 {
        return None;
    }
    points.sort_by_key(|p| p.date);
    let start = rng.gen_range(0..=points.len() - 3);
    Some([
        points[start].clone(),
        points[start + 1].clone(),
        points[start + 2].clone(),
    ])
}

/// Mean substitution count over a team's matches; matches with no recorded
/// substitutions count as zero. `None` when the team has no matches at all.
pub fn average_substitutions(dataset: &Dataset, team_id: u32) -> Option<f64> {
    let matches = matches_involving(dataset, team_id);
    if matches.is_empty() {
        return None;
    }

    let mut subs_per_match: HashMap<u64, u32> = HashMap::new();
    for s in &dataset.substitutions {
        *subs_per_match.entry(s.match_id).or_insert(0) += 1;
    }

    let total: u32 = matches
        .iter()
        .map(|m| subs_per_match.get(&m.match_id).copied().unwrap_or(0))
        .sum();
    Some(f64::from(total) / matches.len() as f64)
}

/// 2x3 venue-by-outcome counts over every match in the dataset. The
/// significance test run over this table lives with the presentation layer.
pub fn venue_contingency(dataset: &Dataset) -> VenueContingency {
    let mut table = VenueContingency::default();
    for m in &dataset.matches {
        if m.home_score > m.away_score {
            table.home[0] += 1;
            table.away[2] += 1;
        } else if m.home_score < m.away_score {
            table.home[2] += 1;
            table.away[0] += 1;
        } else {
            table.home[1] += 1;
            table.away[1] += 1;
        }
    }
    table
}

/// Formation strings arrive as "433", "4-3-3", sometimes with trailing
/// letters; normalize to digits joined by dashes before grouping.
pub fn normalize_formation(raw: &str) -> Option<String> {
    let digits: Vec<String> = raw
        .chars()
        .filter(char::is_ascii_digit)
        .map(|c| c.to_string())
        .collect();
    if digits.is_empty() {
        return None;
    }
    Some(digits.join("-"))
}

/// Win rate per normalized formation across both sides of every match,
/// sorted by win rate then sample size. Sides without a formation are
/// skipped.
pub fn formation_win_rates(dataset: &Dataset) -> Vec<FormationRecord> {
    let mut stats: BTreeMap<String, FormationRecord> = BTreeMap::new();

    for m in &dataset.matches {
        for (formation, for_score, against_score) in [
            (m.home_formation.as_deref(), m.home_score, m.away_score),
            (m.away_formation.as_deref(), m.away_score, m.home_score),
        ] {
            let Some(formation) = formation.and_then(normalize_formation) else {
                continue;
            };
            let entry = stats
                .entry(formation.clone())
                .or_insert_with(|| FormationRecord {
                    formation,
                    played: 0,
                    wins: 0,
                });
            entry.played += 1;
            if for_score > against_score {
                entry.wins += 1;
            }
        }
    }

    let mut out: Vec<FormationRecord> = stats.into_values().collect();
    out.sort_by(|a, b| {
        b.win_rate()
            .partial_cmp(&a.win_rate())
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(b.played.cmp(&a.played))
            .then(a.formation.cmp(&b.formation))
    });
    out
}

/// Net gain of a unit stake on every win of each club at its pre-match odds.
/// Only matches where that club's odds are present are considered: a win
/// pays odds minus the stake, anything else loses the stake.
pub fn betting_gains(dataset: &Dataset) -> Vec<BettingEntry> {
    let mut gains: BTreeMap<u32, (u32, f64)> = BTreeMap::new();

    for m in &dataset.matches {
        for (team_id, odds, for_score, against_score) in [
            (m.home_team_id, m.odds_home, m.home_score, m.away_score),
            (m.away_team_id, m.odds_away, m.away_score, m.home_score),
        ] {
            let (Some(team_id), Some(odds)) = (team_id, odds) else {
                continue;
            };
            let entry = gains.entry(team_id).or_insert((0, 0.0));
            entry.0 += 1;
            entry.1 += if for_score > against_score {
                odds - 1.0
            } else {
                -1.0
            };
        }
    }

    let mut out: Vec<BettingEntry> = gains
        .into_iter()
        .map(|(team_id, (matches_considered, gain))| BettingEntry {
            team_id,
            name: dataset
                .team_name(team_id)
                .unwrap_or(UNKNOWN_NAME)
                .to_string(),
            matches_considered,
            gain,
        })
        .collect();
    out.sort_by(|a, b| {
        b.gain
            .partial_cmp(&a.gain)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.name.cmp(&b.name))
    });
    out
}

/// "striker" and "forward" are the same slot under two feed spellings.
pub fn canonical_position(raw: &str) -> String {
    let position = raw.trim().to_lowercase();
    if position == "striker" {
        "forward".to_string()
    } else {
        position
    }
}

/// Average season mark per (month, position) over one team's appearances,
/// ordered by month then position.
pub fn monthly_position_marks(dataset: &Dataset, team_id: u32) -> Vec<MonthlyMark> {
    let mut sums: BTreeMap<(NaiveDate, String), (f64, u32)> = BTreeMap::new();

    for a in &dataset.match_players {
        if a.team_id != Some(team_id) {
            continue;
        }
        let (Some(mark), Some(position)) = (a.season_mark, a.position.as_deref()) else {
            continue;
        };
        let Some(date) = dataset.match_by_id(a.match_id).and_then(match_date) else {
            continue;
        };
        let Some(month) = NaiveDate::from_ymd_opt(date.year(), date.month(), 1) else {
            continue;
        };
        let entry = sums
            .entry((month, canonical_position(position)))
            .or_insert((0.0, 0));
        entry.0 += mark;
        entry.1 += 1;
    }

    sums.into_iter()
        .map(|((month, position), (sum, count))| MonthlyMark {
            month,
            position,
            avg_mark: sum / f64::from(count),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formations_normalize_to_dashed_digits() {
        assert_eq!(normalize_formation("433"), Some("4-3-3".to_string()));
        assert_eq!(normalize_formation("4-4-2"), Some("4-4-2".to_string()));
        assert_eq!(normalize_formation("343d"), Some("3-4-3".to_string()));
        assert_eq!(normalize_formation("diamond"), None);
    }

    #[test]
    fn positions_fold_striker_into_forward() {
        assert_eq!(canonical_position(" Striker "), "forward");
        assert_eq!(canonical_position("Midfielder"), "midfielder");
    }
}
