use std::collections::BTreeMap;

use anyhow::{Context, Result};

use crate::identity::PlayerId;
use crate::neighbors::NeighborIndex;
use crate::windows::SeasonWindow;

/// One matched comparable: who, and the season range the match was found
/// in. The outcome builder later looks one season past that range.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparablePlayer {
    pub id: PlayerId,
    pub name: String,
    pub seasons: Vec<String>,
}

/// Fits one index per window except the most recent. The last window has
/// no season after it to evaluate a comparable's future against, so it is
/// only ever queried from, never matched into.
pub fn build_window_indices(windows: &[SeasonWindow]) -> Result<Vec<NeighborIndex>> {
    let queryable = windows.len().saturating_sub(1);
    windows[..queryable]
        .iter()
        .map(|window| {
            NeighborIndex::fit(window.vectors().to_vec())
                .with_context(|| format!("fit index for window starting {:?}", window.seasons().first()))
        })
        .collect()
}

/// Pools each window index's k nearest neighbors to `query` and keeps the
/// global top-k by distance. Ties are broken by window order, then by
/// in-window order (the pooled list is stably sorted).
pub fn find_comparables(
    indices: &[NeighborIndex],
    windows: &[SeasonWindow],
    query: &[f64],
    k: usize,
) -> Vec<ComparablePlayer> {
    let mut pooled: Vec<(f64, usize, usize)> = Vec::new();
    for (window_idx, index) in indices.iter().enumerate() {
        for neighbor in index.nearest(query, k) {
            pooled.push((neighbor.distance, window_idx, neighbor.index));
        }
    }
    pooled.sort_by(|a, b| a.0.total_cmp(&b.0));
    pooled.truncate(k);

    pooled
        .into_iter()
        .filter_map(|(_, window_idx, row_idx)| {
            let window = windows.get(window_idx)?;
            let id = window.players().get(row_idx)?.clone();
            let name = window.player_name(row_idx)?.to_string();
            Some(ComparablePlayer {
                id,
                name,
                seasons: window.seasons().to_vec(),
            })
        })
        .collect()
}

/// Batch mode: comparables for every player in the most recent window.
/// With fewer than two windows there is nothing to match against and the
/// result is empty rather than an error.
pub fn comparables_for_all_players(
    windows: &[SeasonWindow],
    k: usize,
) -> Result<BTreeMap<PlayerId, Vec<ComparablePlayer>>> {
    let mut out = BTreeMap::new();
    let Some(latest) = windows.last() else {
        return Ok(out);
    };
    let indices = build_window_indices(windows)?;
    if indices.is_empty() {
        return Ok(out);
    }

    let total = latest.len();
    for (done, (id, vector)) in latest.players().iter().zip(latest.vectors()).enumerate() {
        let comparables = find_comparables(&indices, windows, vector, k);
        out.insert(id.clone(), comparables);
        if (done + 1) % 100 == 0 {
            eprintln!("[INFO] matched {}/{} players", done + 1, total);
        }
    }
    Ok(out)
}
