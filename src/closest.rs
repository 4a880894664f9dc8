use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result, anyhow};

use crate::features::{FeatureTable, prepare_features};
use crate::identity::{IdentityResolver, NameIdentity};
use crate::neighbors::NeighborIndex;
use crate::season_table::{PlayerSeasonRecord, SeasonTable, load_all_seasons};

/// One matched raw row, with the season it was matched in.
#[derive(Debug, Clone)]
pub struct ClosestMatch {
    pub season: String,
    pub record: PlayerSeasonRecord,
}

struct SeasonEntry {
    raw: SeasonTable,
    prepared: FeatureTable,
    index: NeighborIndex,
}

/// Ad-hoc cross-season comparable lookup over raw single-season vectors.
/// Unlike the temporal pipeline this matches one season at a time, every
/// loaded season except the observed one, so a player can be compared
/// against any era in the directory.
pub struct SingleSeasonFinder {
    seasons: BTreeMap<String, SeasonEntry>,
    k: usize,
}

impl SingleSeasonFinder {
    pub fn from_dir(dir: &Path, k: usize) -> Result<Self> {
        let mut seasons = BTreeMap::new();
        for raw in load_all_seasons(dir)? {
            let prepared = prepare_features(&raw)
                .with_context(|| format!("prepare features for season {}", raw.season()))?;
            let vectors = prepared
                .rows()
                .iter()
                .map(|row| row.features.knn_vector())
                .collect();
            let index = NeighborIndex::fit(vectors)
                .with_context(|| format!("fit index for season {}", raw.season()))?;
            seasons.insert(
                raw.season().to_string(),
                SeasonEntry {
                    raw,
                    prepared,
                    index,
                },
            );
        }
        Ok(Self { seasons, k })
    }

    pub fn seasons(&self) -> impl Iterator<Item = &str> {
        self.seasons.keys().map(|s| s.as_str())
    }

    /// Observed raw row plus the k closest raw rows pooled from every
    /// other loaded season, ascending by distance.
    pub fn closest_players(
        &self,
        season: &str,
        player: &str,
    ) -> Result<(PlayerSeasonRecord, Vec<ClosestMatch>)> {
        let id = NameIdentity.resolve(player);
        let entry = self
            .seasons
            .get(season)
            .ok_or_else(|| anyhow!("season {season} is not loaded"))?;
        let observed = entry
            .raw
            .get(&id)
            .ok_or_else(|| anyhow!("no row for {player:?} in {season}"))?
            .clone();
        let query = entry
            .prepared
            .get(&id)
            .ok_or_else(|| anyhow!("{player:?} was filtered out of {season}"))?
            .knn_vector();

        let mut pooled: Vec<(f64, &str, usize)> = Vec::new();
        for (label, other) in &self.seasons {
            if label == season {
                continue;
            }
            for neighbor in other.index.nearest(&query, self.k) {
                pooled.push((neighbor.distance, label, neighbor.index));
            }
        }
        pooled.sort_by(|a, b| a.0.total_cmp(&b.0));
        pooled.truncate(self.k);

        let mut matches = Vec::with_capacity(pooled.len());
        for (_, label, row_idx) in pooled {
            let other = &self.seasons[label];
            let row = &other.prepared.rows()[row_idx];
            let record = other
                .raw
                .get(&row.id)
                .ok_or_else(|| anyhow!("prepared row {} missing from raw {label}", row.name))?
                .clone();
            matches.push(ClosestMatch {
                season: label.to_string(),
                record,
            });
        }
        Ok((observed, matches))
    }
}
