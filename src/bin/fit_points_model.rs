use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};

use nhl_comparables::persist::load_artifact;
use nhl_comparables::regression::k_fold_r2;

const DEFAULT_FOLDS: usize = 10;
const DEFAULT_SEED: u64 = 42;

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");

    let artifact_path = parse_path_arg("--matrix")
        .unwrap_or_else(|| PathBuf::from("assets/feature_matrix_v1.json"));
    let folds = parse_usize_arg("--folds").unwrap_or(DEFAULT_FOLDS).max(2);
    let seed = parse_u64_arg("--seed").unwrap_or(DEFAULT_SEED);

    let artifact = load_artifact(&artifact_path)
        .with_context(|| format!("load {}", artifact_path.display()))?;
    if artifact.rows.is_empty() {
        return Err(anyhow!(
            "{} holds an empty feature matrix",
            artifact_path.display()
        ));
    }
    eprintln!(
        "[INFO] {} rows of length {} (generated {})",
        artifact.rows.len(),
        artifact.feature_len,
        artifact.generated_at
    );

    // The naive prediction to beat: the most recent observed season's
    // points-per-game, carried forward unchanged.
    let baseline_col = artifact.observed_seasons.len().saturating_sub(1);
    let report = k_fold_r2(&artifact.rows, baseline_col, folds, seed)?;

    println!(
        "Label season: {} ({} players)",
        artifact.last_finished_season,
        artifact.rows.len()
    );
    println!("Folds: {}", report.folds);
    println!("Prediction R^2: {:.4}", report.prediction_r2);
    println!(
        "Baseline R^2:   {:.4} (column {}, season {})",
        report.baseline_r2,
        baseline_col,
        artifact
            .observed_seasons
            .last()
            .map(String::as_str)
            .unwrap_or("?")
    );
    Ok(())
}

fn parse_path_arg(name: &str) -> Option<PathBuf> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    for (idx, arg) in args.iter().enumerate() {
        if let Some(raw) = arg.strip_prefix(&format!("{name}="))
            && !raw.trim().is_empty()
        {
            return Some(PathBuf::from(raw.trim()));
        }
        if arg == name
            && let Some(next) = args.get(idx + 1)
            && !next.trim().is_empty()
        {
            return Some(PathBuf::from(next.trim()));
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

fn parse_u64_arg(name: &str) -> Option<u64> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    for (idx, arg) in args.iter().enumerate() {
        if let Some(raw) = arg.strip_prefix(&format!("{name}="))
            && let Ok(v) = raw.trim().parse::<u64>()
        {
            return Some(v);
        }
        if arg == name
            && let Some(next) = args.get(idx + 1)
            && let Ok(v) = next.trim().parse::<u64>()
        {
            return Some(v);
        }
    }
    None
}
