use std::collections::{BTreeMap, HashMap};

use crate::features::{FeatureTable, PER_SEASON_DIM};
use crate::identity::PlayerId;

/// Aggregated feature table spanning `window_size` consecutive seasons.
///
/// Row layout: one block of [`PER_SEASON_DIM`] season-suffixed features
/// per season (zero-filled where the player did not appear), then the two
/// window-collapsed columns: forward indicator (max across seasons
/// present) and shots-per-game rate (mean across seasons present).
#[derive(Debug, Clone)]
pub struct SeasonWindow {
    start: usize,
    seasons: Vec<String>,
    players: Vec<PlayerId>,
    names: Vec<String>,
    vectors: Vec<Vec<f64>>,
    by_player: HashMap<PlayerId, usize>,
}

impl SeasonWindow {
    /// Index of the window's first season in the loaded season sequence.
    pub fn start(&self) -> usize {
        self.start
    }

    /// Season labels covered by this window, in order.
    pub fn seasons(&self) -> &[String] {
        &self.seasons
    }

    pub fn players(&self) -> &[PlayerId] {
        &self.players
    }

    pub fn player_name(&self, idx: usize) -> Option<&str> {
        self.names.get(idx).map(|s| s.as_str())
    }

    pub fn vectors(&self) -> &[Vec<f64>] {
        &self.vectors
    }

    pub fn vector(&self, id: &PlayerId) -> Option<&[f64]> {
        self.by_player
            .get(id)
            .map(|&idx| self.vectors[idx].as_slice())
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}

/// Vector length of a window over `window_size` seasons.
pub fn window_dim(window_size: usize) -> usize {
    window_size * PER_SEASON_DIM + 2
}

/// Rolling outer join of `window_size` consecutive season feature tables
/// on player id. Players absent from a season contribute zeros for that
/// season's block. Fewer than `window_size` tables produce no windows.
pub fn build_windows(tables: &[FeatureTable], window_size: usize) -> Vec<SeasonWindow> {
    if window_size == 0 || tables.len() < window_size {
        return Vec::new();
    }

    (0..=tables.len() - window_size)
        .map(|start| build_window(&tables[start..start + window_size], start))
        .collect()
}

fn build_window(tables: &[FeatureTable], start: usize) -> SeasonWindow {
    // Sorted union of all players appearing anywhere in the window.
    let mut union: BTreeMap<PlayerId, String> = BTreeMap::new();
    for table in tables {
        for row in table.rows() {
            union.entry(row.id.clone()).or_insert_with(|| row.name.clone());
        }
    }

    let dim = window_dim(tables.len());
    let mut players = Vec::with_capacity(union.len());
    let mut names = Vec::with_capacity(union.len());
    let mut vectors = Vec::with_capacity(union.len());
    let mut by_player = HashMap::with_capacity(union.len());

    for (id, name) in union {
        let mut vector = Vec::with_capacity(dim);
        let mut forward = 0.0_f64;
        let mut shot_rate_sum = 0.0_f64;
        let mut seasons_present = 0usize;

        for table in tables {
            match table.get(&id) {
                Some(features) => {
                    vector.extend_from_slice(&features.window_block());
                    forward = forward.max(features.forward);
                    shot_rate_sum += features.shot_rate;
                    seasons_present += 1;
                }
                None => vector.extend_from_slice(&[0.0; PER_SEASON_DIM]),
            }
        }

        vector.push(forward);
        vector.push(if seasons_present > 0 {
            shot_rate_sum / seasons_present as f64
        } else {
            0.0
        });

        by_player.insert(id.clone(), players.len());
        players.push(id);
        names.push(name);
        vectors.push(vector);
    }

    SeasonWindow {
        start,
        seasons: tables.iter().map(|t| t.season().to_string()).collect(),
        players,
        names,
        vectors,
        by_player,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::extract_features;
    use crate::identity::{IdentityResolver, NameIdentity};
    use crate::season_table::{PlayerSeasonRecord, SeasonTable};

    fn record(name: &str, season: &str) -> PlayerSeasonRecord {
        PlayerSeasonRecord {
            rank: 1,
            player: name.to_string(),
            season: season.to_string(),
            team: "TST".to_string(),
            shoots: "L".to_string(),
            position: "C".to_string(),
            games_played: 20,
            goals: 10,
            assists: 10,
            points: 20,
            plus_minus: 3,
            penalty_minutes: 8,
            points_per_game: 1.0,
            ev_goals: 7,
            ev_points: 15,
            pp_goals: 3,
            pp_points: 5,
            sh_goals: 0,
            sh_points: 0,
            ot_goals: 0,
            gw_goals: 1,
            shots: 60,
            shooting_pct: "10".to_string(),
            avg_toi: "18:00".to_string(),
            faceoff_pct: "50.0".to_string(),
        }
    }

    fn season_features(names: &[&str], season: &str) -> FeatureTable {
        let table = SeasonTable::from_records(
            season,
            names.iter().map(|n| record(n, season)).collect(),
        );
        extract_features(&table).unwrap()
    }

    #[test]
    fn too_few_seasons_produce_no_windows() {
        let tables = vec![
            season_features(&["A"], "2017-18"),
            season_features(&["A"], "2018-19"),
        ];
        assert!(build_windows(&tables, 3).is_empty());
        assert!(build_windows(&tables, 0).is_empty());
    }

    #[test]
    fn rolling_window_count_and_season_ranges() {
        let tables = vec![
            season_features(&["A"], "2016-17"),
            season_features(&["A"], "2017-18"),
            season_features(&["A"], "2018-19"),
            season_features(&["A"], "2019-20"),
        ];
        let windows = build_windows(&tables, 3);
        assert_eq!(windows.len(), 2);
        assert_eq!(windows[0].seasons(), ["2016-17", "2017-18", "2018-19"]);
        assert_eq!(windows[1].seasons(), ["2017-18", "2018-19", "2019-20"]);
        assert_eq!(windows[1].start(), 1);
    }

    #[test]
    fn identical_seasons_collapse_to_single_season_values() {
        let tables = vec![
            season_features(&["A", "B"], "2016-17"),
            season_features(&["A", "B"], "2017-18"),
            season_features(&["A", "B"], "2018-19"),
        ];
        let single = &tables[0];
        let windows = build_windows(&tables, 3);
        let id = NameIdentity.resolve("A");

        let vector = windows[0].vector(&id).unwrap();
        assert_eq!(vector.len(), window_dim(3));
        let single_features = single.get(&id).unwrap();
        // Mean of three identical shot rates is the rate itself; max of
        // three identical forward flags is the flag.
        assert_eq!(vector[window_dim(3) - 2], single_features.forward);
        assert!((vector[window_dim(3) - 1] - single_features.shot_rate).abs() < 1e-12);
    }

    #[test]
    fn absent_seasons_zero_fill_and_forward_survives() {
        let tables = vec![
            season_features(&["A", "B"], "2016-17"),
            season_features(&["B"], "2017-18"),
            season_features(&["B"], "2018-19"),
        ];
        let windows = build_windows(&tables, 3);
        let id = NameIdentity.resolve("A");
        let vector = windows[0].vector(&id).unwrap();

        // Season 1 block is populated, seasons 2-3 blocks are zero.
        assert!(vector[..PER_SEASON_DIM].iter().any(|v| *v != 0.0));
        assert!(
            vector[PER_SEASON_DIM..3 * PER_SEASON_DIM]
                .iter()
                .all(|v| *v == 0.0)
        );
        // Forward flag from the one present season is kept.
        assert_eq!(vector[window_dim(3) - 2], 1.0);
    }

    #[test]
    fn collapsed_columns_appear_exactly_once() {
        let tables = vec![
            season_features(&["A"], "2016-17"),
            season_features(&["A"], "2017-18"),
            season_features(&["A"], "2018-19"),
        ];
        let windows = build_windows(&tables, 3);
        // Window dimension accounts for one forward column and one shot
        // rate column, not one per season.
        assert_eq!(windows[0].vectors()[0].len(), 3 * PER_SEASON_DIM + 2);
    }

    #[test]
    fn players_are_sorted_for_deterministic_index_order() {
        let tables = vec![
            season_features(&["Zed Last", "Abe First"], "2016-17"),
            season_features(&["Zed Last", "Abe First"], "2017-18"),
            season_features(&["Zed Last", "Abe First"], "2018-19"),
        ];
        let windows = build_windows(&tables, 3);
        let players = windows[0].players();
        assert!(players[0] < players[1]);
    }
}
