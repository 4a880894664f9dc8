use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};

use nhl_comparables::config::PipelineConfig;
use nhl_comparables::features::extract_features;
use nhl_comparables::matcher::comparables_for_all_players;
use nhl_comparables::outcome::build_points_feature_matrix;
use nhl_comparables::persist::{FeatureMatrixArtifact, save_artifact};
use nhl_comparables::season_table::{load_season_csv, load_seasons};
use nhl_comparables::windows::build_windows;

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");

    let config = PipelineConfig::from_env();
    let stats_dir = parse_path_arg("--stats-dir").unwrap_or_else(|| PathBuf::from("stats"));
    let out_path =
        parse_path_arg("--out").unwrap_or_else(|| PathBuf::from("assets/feature_matrix_v1.json"));

    let mut seasons = load_seasons(&stats_dir, &config.last_finished_season)
        .with_context(|| format!("load seasons from {}", stats_dir.display()))?;
    if seasons.is_empty() {
        return Err(anyhow!(
            "no season tables found under {}",
            stats_dir.display()
        ));
    }
    eprintln!(
        "[INFO] loaded {} seasons ({} .. {})",
        seasons.len(),
        seasons[0].season(),
        seasons[seasons.len() - 1].season()
    );

    let mut tables = Vec::with_capacity(seasons.len());
    for season in &seasons {
        let table = extract_features(season)
            .with_context(|| format!("extract features for {}", season.season()))?;
        eprintln!(
            "[INFO] {}: {} of {} skaters kept",
            season.season(),
            table.len(),
            season.len()
        );
        tables.push(table);
    }

    let windows = build_windows(&tables, config.window_size);
    eprintln!(
        "[INFO] {} rolling windows of {} seasons",
        windows.len(),
        config.window_size
    );

    let comparables = comparables_for_all_players(&windows, config.k_neighbors)?;
    if comparables.is_empty() {
        eprintln!("[WARN] no comparables produced; writing an empty matrix");
    }

    // Labels come from the held-out season, so it joins the lookup pool
    // here without ever having fed the windows.
    let label_path = stats_dir.join(format!("{}.csv", config.last_finished_season));
    match load_season_csv(&label_path) {
        Ok(table) => seasons.push(table),
        Err(err) => eprintln!(
            "[WARN] no label season at {}: {err}; labels default to 0",
            label_path.display()
        ),
    }

    let matrix = build_points_feature_matrix(
        &seasons,
        &comparables,
        &config.observed_seasons,
        &config.last_finished_season,
        config.k_neighbors,
        config.window_size,
    )?;

    let artifact = FeatureMatrixArtifact::from_matrix(
        &matrix,
        config.window_size,
        config.k_neighbors,
        &config.observed_seasons,
        &config.last_finished_season,
    );
    save_artifact(&out_path, &artifact)?;

    println!("Feature matrix written: {}", out_path.display());
    println!("Players: {}", matrix.players.len());
    println!(
        "Row length: {} (observed {} + {} comparables x {} + label)",
        matrix.feature_len,
        config.observed_seasons.len(),
        config.k_neighbors,
        config.window_size + 1
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
