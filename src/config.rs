use std::env;

use crate::outcome::feature_row_len;

/// Pipeline knobs, overridable through `COMPS_*` environment variables
/// (loaded from `.env` by the binaries before construction).
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Seasons per rolling window.
    pub window_size: usize,
    /// Comparables kept per player, globally across windows.
    pub k_neighbors: usize,
    /// Seasons whose points-per-game open each feature row, oldest
    /// first. The last one is the baseline column for model evaluation.
    pub observed_seasons: Vec<String>,
    /// Held out of the pipeline; supplies the regression label.
    pub last_finished_season: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            window_size: 3,
            k_neighbors: 3,
            observed_seasons: ["2017-18", "2018-19", "2019-20"].map(String::from).to_vec(),
            last_finished_season: "2020-21".to_string(),
        }
    }
}

impl PipelineConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let window_size = env::var("COMPS_WINDOW_SIZE")
            .ok()
            .and_then(|val| val.trim().parse::<usize>().ok())
            .unwrap_or(defaults.window_size)
            .clamp(1, 10);
        let k_neighbors = env::var("COMPS_K_NEIGHBORS")
            .ok()
            .and_then(|val| val.trim().parse::<usize>().ok())
            .unwrap_or(defaults.k_neighbors)
            .clamp(1, 50);
        let observed_seasons = env::var("COMPS_OBSERVED_SEASONS")
            .ok()
            .map(|raw| parse_season_list(&raw))
            .filter(|seasons| !seasons.is_empty())
            .unwrap_or(defaults.observed_seasons);
        let last_finished_season = env::var("COMPS_LAST_FINISHED_SEASON")
            .ok()
            .map(|val| val.trim().to_string())
            .filter(|val| !val.is_empty())
            .unwrap_or(defaults.last_finished_season);

        Self {
            window_size,
            k_neighbors,
            observed_seasons,
            last_finished_season,
        }
    }

    pub fn feature_row_len(&self) -> usize {
        feature_row_len(self.observed_seasons.len(), self.k_neighbors, self.window_size)
    }

    /// Feature column holding the most recent observed season, which the
    /// fitted model has to beat.
    pub fn baseline_column(&self) -> usize {
        self.observed_seasons.len().saturating_sub(1)
    }
}

fn parse_season_list(raw: &str) -> Vec<String> {
    raw.split([',', ';', ' '])
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}
