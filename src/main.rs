use std::path::PathBuf;

use anyhow::Result;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use footdata::config::PipelineConfig;
use footdata::queries;
use footdata::store;
use footdata::tables::{Dataset, championship_name};

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_logging();

    let mut config = PipelineConfig::from_env();
    if let Some(dir) = parse_path_arg("--data-dir") {
        config.raw_dir = dir;
    }
    if let Some(dir) = parse_path_arg("--out-dir") {
        config.table_dir = dir;
    }
    if has_flag("--refresh") {
        config.force_refresh = true;
    }
    let with_report = has_flag("--report");

    let (dataset, report) =
        store::load_or_build(&config.raw_dir, &config.table_dir, config.force_refresh)?;

    match report {
        Some(report) => {
            println!("Export complete");
            println!("Raw documents: {}", config.raw_dir.display());
            println!(
                "Parsed: {} Skipped: {}",
                report.documents_parsed, report.documents_skipped
            );
            if !report.errors.is_empty() {
                println!("  errors: {}", report.errors.len());
                for err in report.errors.iter().take(6) {
                    println!("   - {err}");
                }
            }
        }
        None => println!("Tables loaded from {}", config.table_dir.display()),
    }
    print_counts(&dataset);

    if with_report {
        print_report(&dataset);
    }

    Ok(())
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}

fn print_counts(dataset: &Dataset) {
    println!("Teams: {}", dataset.teams.len());
    println!("Players: {}", dataset.players.len());
    println!("Matches: {}", dataset.matches.len());
    println!("Match players: {}", dataset.match_players.len());
    println!("Highlights: {}", dataset.highlights.len());
    println!("Substitutions: {}", dataset.substitutions.len());
    println!("Transfer periods: {}", dataset.transfers.len());
}

/// Textual digest of the descriptive aggregates the interactive views are
/// built on.
fn print_report(dataset: &Dataset) {
    let contingency = queries::venue_contingency(dataset);
    let percentages = contingency.row_percentages();
    println!();
    println!("Result by venue (win/draw/loss):");
    for (label, row, pct) in [
        ("home", contingency.home, percentages[0]),
        ("away", contingency.away, percentages[1]),
    ] {
        match pct {
            Some(pct) => println!(
                "  {label}: {}/{}/{} ({:.1}% / {:.1}% / {:.1}%)",
                row[0], row[1], row[2], pct[0], pct[1], pct[2]
            ),
            None => println!("  {label}: no data"),
        }
    }

    let formations = queries::formation_win_rates(dataset);
    if !formations.is_empty() {
        println!();
        println!("Formations by win rate:");
        for f in formations.iter().take(8) {
            println!(
                "  {}: {:.1}% over {} matches",
                f.formation,
                100.0 * f.win_rate(),
                f.played
            );
        }
    }

    let mut championships: Vec<u32> = dataset
        .matches
        .iter()
        .filter_map(|m| m.championship)
        .collect();
    championships.sort_unstable();
    championships.dedup();
    for code in championships {
        let scorers = queries::top_scorers(dataset, code, 10);
        if scorers.is_empty() {
            continue;
        }
        println!();
        println!("Top scorers, {}:", championship_name(code));
        for s in scorers {
            println!("  {} ({}): {}", s.name, s.player_id, s.goals);
        }
    }

    let gains = queries::betting_gains(dataset);
    if !gains.is_empty() {
        println!();
        println!("Flat-stake gain by club:");
        for entry in gains.iter().take(10) {
            println!(
                "  {}: {:+.2} over {} matches",
                entry.name, entry.gain, entry.matches_considered
            );
        }
    }
}

fn parse_path_arg(name: &str) -> Option<PathBuf> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let prefix = format!("{name}=");
    for (idx, arg) in args.iter().enumerate() {
        if let Some(path) = arg.strip_prefix(&prefix) {
            let trimmed = path.trim();
            if !trimmed.is_empty() {
                return Some(PathBuf::from(trimmed));
            }
        }
        if arg == name
            && let Some(next) = args.get(idx + 1)
            && !next.trim().is_empty()
        {
            return Some(PathBuf::from(next));
        }
    }
    None
}

fn has_flag(name: &str) -> bool {
    std::env::args().skip(1).any(|arg| arg == name)
}
