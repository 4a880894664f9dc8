use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};

use nhl_comparables::closest::SingleSeasonFinder;
use nhl_comparables::config::PipelineConfig;

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");

    let config = PipelineConfig::from_env();
    let stats_dir = parse_path_arg("--stats-dir").unwrap_or_else(|| PathBuf::from("stats"));
    let season = parse_string_arg("--season").ok_or_else(|| anyhow!("--season is required"))?;
    let player = parse_string_arg("--player").ok_or_else(|| anyhow!("--player is required"))?;
    let k = parse_usize_arg("--k").unwrap_or(config.k_neighbors).max(1);

    let finder = SingleSeasonFinder::from_dir(&stats_dir, k)
        .with_context(|| format!("index seasons under {}", stats_dir.display()))?;
    eprintln!(
        "[INFO] indexed seasons: {}",
        finder.seasons().collect::<Vec<_>>().join(", ")
    );

    let (observed, matches) = finder.closest_players(&season, &player)?;

    println!(
        "{} in {}: {} GP, {} P ({:.2} P/GP)",
        observed.player,
        season,
        observed.games_played,
        observed.points,
        observed.points_per_game
    );
    if matches.is_empty() {
        println!("No comparables found in other seasons");
        return Ok(());
    }
    println!("Closest {} skater-seasons elsewhere:", matches.len());
    for (rank, m) in matches.iter().enumerate() {
        println!(
            "{:>2}. {} ({}) {} GP, {} P ({:.2} P/GP), pos {}",
            rank + 1,
            m.record.player,
            m.season,
            m.record.games_played,
            m.record.points,
            m.record.points_per_game,
            m.record.position
        );
    }
    Ok(())
}

fn parse_path_arg(name: &str) -> Option<PathBuf> {
    parse_string_arg(name).map(PathBuf::from)
}

fn parse_string_arg(name: &str) -> Option<String> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    for (idx, arg) in args.iter().enumerate() {
        if let Some(raw) = arg.strip_prefix(&format!("{name}="))
            && !raw.trim().is_empty()
        {
            return Some(raw.trim().to_string());
        }
        if arg == name
            && let Some(next) = args.get(idx + 1)
            && !next.trim().is_empty()
        {
            return Some(next.trim().to_string());
        }
    }
    None
}

fn parse_usize_arg(name: &str) -> Option<usize> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    for (idx, arg) in args.iter().enumerate() {
        if let Some(raw) = arg.strip_prefix(&format!("{name}="))
            && let Ok(v) = raw.trim().parse::<usize>()
        {
            return Some(v);
        }
        if arg == name
            && let Some(next) = args.get(idx + 1)
            && let Ok(v) = next.trim().parse::<usize>()
        {
            return Some(v);
        }
    }
    None
}
