use std::collections::{BTreeMap, HashMap};

use anyhow::{Result, bail};

use crate::identity::PlayerId;
use crate::matcher::ComparablePlayer;
use crate::season_table::{SeasonTable, next_season_label};

/// Prediction-ready feature rows, one per matched player, in sorted
/// player-id order.
#[derive(Debug, Clone)]
pub struct FeatureMatrix {
    pub players: Vec<(PlayerId, String)>,
    pub rows: Vec<Vec<f64>>,
    pub feature_len: usize,
}

/// Row layout, all values points-per-game from the raw season tables:
///
///   [observed seasons...]
///   then per comparable: [its window seasons..., one season past]
///   then the player's realized value in the last finished season (label)
///
/// Any lookup that misses (player absent from a season, or a season label
/// past the loaded range) contributes 0.0. A row that comes out the wrong
/// length or non-finite aborts the whole build.
pub fn build_points_feature_matrix(
    seasons: &[SeasonTable],
    comparables: &BTreeMap<PlayerId, Vec<ComparablePlayer>>,
    observed_seasons: &[String],
    last_finished: &str,
    k: usize,
    window_size: usize,
) -> Result<FeatureMatrix> {
    let by_season: HashMap<&str, &SeasonTable> =
        seasons.iter().map(|t| (t.season(), t)).collect();
    let pgp = |season: &str, id: &PlayerId| -> f64 {
        by_season
            .get(season)
            .and_then(|table| table.points_per_game(id))
            .unwrap_or(0.0)
    };

    let feature_len = feature_row_len(observed_seasons.len(), k, window_size);
    let mut players = Vec::with_capacity(comparables.len());
    let mut rows = Vec::with_capacity(comparables.len());

    for (id, matched) in comparables {
        let mut row = Vec::with_capacity(feature_len);
        for season in observed_seasons {
            row.push(pgp(season, id));
        }

        for comparable in matched.iter().take(k) {
            for season in &comparable.seasons {
                row.push(pgp(season, &comparable.id));
            }
            let next = comparable
                .seasons
                .last()
                .and_then(|last| next_season_label(last));
            row.push(match next {
                Some(label) => pgp(&label, &comparable.id),
                None => 0.0,
            });
        }
        // Fewer matches than k (tiny candidate pools) zero-fill the
        // remaining comparable slots so every row keeps one length.
        for _ in matched.len()..k {
            row.extend(std::iter::repeat_n(0.0, window_size + 1));
        }

        row.push(pgp(last_finished, id));

        if row.len() != feature_len {
            bail!(
                "feature row for {id} has length {} but expected {feature_len}",
                row.len()
            );
        }
        if let Some(bad) = row.iter().find(|v| !v.is_finite()) {
            bail!("feature row for {id} contains non-finite value {bad}");
        }

        players.push((id.clone(), display_name(seasons, id)));
        rows.push(row);
    }

    Ok(FeatureMatrix {
        players,
        rows,
        feature_len,
    })
}

/// `observed + k * (window_size + 1) + 1`: observed-season values, per
/// comparable its window plus one-past value, and the label.
pub fn feature_row_len(observed_seasons: usize, k: usize, window_size: usize) -> usize {
    observed_seasons + k * (window_size + 1) + 1
}

fn display_name(seasons: &[SeasonTable], id: &PlayerId) -> String {
    seasons
        .iter()
        .rev()
        .find_map(|table| table.get(id).map(|r| r.player.clone()))
        .unwrap_or_else(|| id.as_str().to_string())
}
