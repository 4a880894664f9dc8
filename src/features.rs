use std::collections::HashMap;

use anyhow::{Context, Result, bail};

use crate::identity::PlayerId;
use crate::season_table::{PlayerSeasonRecord, SeasonTable};

/// Per-season features that stay season-suffixed inside a window vector
/// (the forward indicator and shot rate are collapsed across the window
/// instead, see `windows`).
pub const PER_SEASON_DIM: usize = 6;

/// Normalized per-player features derived from one raw season row.
///
/// Rates are per games played; in the temporal pipeline each rate is
/// additionally scaled by its column maximum so every feature lands in
/// [0, 1] regardless of era scoring levels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SeasonFeatures {
    /// Shooting percentage as a 0-1 fraction.
    pub shooting_pct: f64,
    /// Average ice time as a fraction of a full hour.
    pub toi_frac: f64,
    /// Even-strength assists (points minus goals) rate.
    pub ev_assists: f64,
    /// Even-strength goals rate.
    pub ev_goals: f64,
    /// Power-play assists rate.
    pub pp_assists: f64,
    /// Power-play goals rate.
    pub pp_goals: f64,
    /// Shots-per-game rate.
    pub shot_rate: f64,
    /// 1.0 for C/L/R, 0.0 otherwise.
    pub forward: f64,
}

impl SeasonFeatures {
    /// Season-suffixed portion of a window vector.
    pub fn window_block(&self) -> [f64; PER_SEASON_DIM] {
        [
            self.shooting_pct,
            self.toi_frac,
            self.ev_assists,
            self.ev_goals,
            self.pp_assists,
            self.pp_goals,
        ]
    }

    /// Full single-season vector used by the standalone finder. No ice
    /// time here: the single-pass prepare variant never derives it.
    pub fn knn_vector(&self) -> Vec<f64> {
        vec![
            self.shooting_pct,
            self.ev_assists,
            self.ev_goals,
            self.pp_assists,
            self.pp_goals,
            self.shot_rate,
            self.forward,
        ]
    }
}

#[derive(Debug, Clone)]
pub struct FeatureRow {
    pub id: PlayerId,
    pub name: String,
    pub features: SeasonFeatures,
}

/// Normalized feature table for one season, sorted by player id for
/// deterministic downstream joins and index order.
#[derive(Debug, Clone)]
pub struct FeatureTable {
    season: String,
    rows: Vec<FeatureRow>,
    by_player: HashMap<PlayerId, usize>,
}

impl FeatureTable {
    fn from_rows(season: String, mut rows: Vec<FeatureRow>) -> Self {
        rows.sort_by(|a, b| a.id.cmp(&b.id));
        let by_player = rows
            .iter()
            .enumerate()
            .map(|(idx, row)| (row.id.clone(), idx))
            .collect();
        Self {
            season,
            rows,
            by_player,
        }
    }

    pub fn season(&self) -> &str {
        &self.season
    }

    pub fn rows(&self) -> &[FeatureRow] {
        &self.rows
    }

    pub fn get(&self, id: &PlayerId) -> Option<&SeasonFeatures> {
        self.by_player.get(id).map(|&idx| &self.rows[idx].features)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Minimum-participation thresholds for the temporal pipeline: a player
/// must clear both to contribute a season to a window.
const MIN_GAMES_PLAYED: u32 = 8;
const MIN_POINTS: i32 = 0;

/// Temporal-pipeline extraction: participation filters, hour-normalized
/// ice time, and max-scaled per-game rates.
pub fn extract_features(table: &SeasonTable) -> Result<FeatureTable> {
    let kept: Vec<(&PlayerId, &PlayerSeasonRecord)> = table
        .iter()
        .filter(|(_, r)| {
            r.has_shooting_pct() && r.games_played > MIN_GAMES_PLAYED && r.points > MIN_POINTS
        })
        .collect();

    let mut rows = Vec::with_capacity(kept.len());
    for (id, record) in &kept {
        let features = base_features(record, table.season())?;
        rows.push(FeatureRow {
            id: (*id).clone(),
            name: record.player.clone(),
            features,
        });
    }

    max_scale_rates(&mut rows);
    Ok(FeatureTable::from_rows(table.season().to_string(), rows))
}

/// Single-pass variant for the standalone finder: only the shooting
/// percentage placeholder filter, plain per-game rates, no ice time.
pub fn prepare_features(table: &SeasonTable) -> Result<FeatureTable> {
    let mut rows = Vec::new();
    for (id, record) in table.iter() {
        if !record.has_shooting_pct() {
            continue;
        }
        let mut features = base_features(record, table.season())?;
        features.toi_frac = 0.0;
        rows.push(FeatureRow {
            id: id.clone(),
            name: record.player.clone(),
            features,
        });
    }
    Ok(FeatureTable::from_rows(table.season().to_string(), rows))
}

fn base_features(record: &PlayerSeasonRecord, season: &str) -> Result<SeasonFeatures> {
    if record.games_played == 0 {
        bail!(
            "{} has zero games played in {} but survived filtering",
            record.player,
            season
        );
    }
    let gp = f64::from(record.games_played);

    let shooting_pct = record
        .shooting_pct
        .trim()
        .parse::<f64>()
        .with_context(|| {
            format!(
                "shooting percentage {:?} for {} in {}",
                record.shooting_pct, record.player, season
            )
        })?
        / 100.0;

    let toi_frac = parse_avg_toi(&record.avg_toi)
        .with_context(|| format!("ice time for {} in {}", record.player, season))?;

    let ev_assists = f64::from(record.ev_points - record.ev_goals) / gp;
    let pp_assists = f64::from(record.pp_points - record.pp_goals) / gp;

    Ok(SeasonFeatures {
        shooting_pct,
        toi_frac,
        ev_assists,
        ev_goals: f64::from(record.ev_goals) / gp,
        pp_assists,
        pp_goals: f64::from(record.pp_goals) / gp,
        shot_rate: f64::from(record.shots) / gp,
        forward: if is_forward(&record.position) { 1.0 } else { 0.0 },
    })
}

fn is_forward(position: &str) -> bool {
    matches!(position.trim(), "C" | "L" | "R")
}

/// Divides every rate column by its table maximum, anchoring each at 0.
/// An all-zero column stays zero rather than going 0/0.
fn max_scale_rates(rows: &mut [FeatureRow]) {
    let maxes = rows.iter().fold([0.0_f64; 5], |acc, row| {
        let f = &row.features;
        [
            acc[0].max(f.ev_assists),
            acc[1].max(f.ev_goals),
            acc[2].max(f.pp_assists),
            acc[3].max(f.pp_goals),
            acc[4].max(f.shot_rate),
        ]
    });

    let scale = |value: f64, max: f64| if max > 0.0 { value / max } else { 0.0 };
    for row in rows {
        let f = &mut row.features;
        f.ev_assists = scale(f.ev_assists, maxes[0]);
        f.ev_goals = scale(f.ev_goals, maxes[1]);
        f.pp_assists = scale(f.pp_assists, maxes[2]);
        f.pp_goals = scale(f.pp_goals, maxes[3]);
        f.shot_rate = scale(f.shot_rate, maxes[4]);
    }
}

/// `"mm:ss"` average ice time as a fraction of 3600 seconds.
fn parse_avg_toi(raw: &str) -> Result<f64> {
    let (minutes, seconds) = raw
        .trim()
        .split_once(':')
        .with_context(|| format!("ice time {raw:?} is not mm:ss"))?;
    let minutes = minutes
        .trim()
        .parse::<f64>()
        .with_context(|| format!("ice time minutes in {raw:?}"))?;
    let seconds = seconds
        .trim()
        .parse::<f64>()
        .with_context(|| format!("ice time seconds in {raw:?}"))?;
    Ok((minutes * 60.0 + seconds) / 3600.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{IdentityResolver, NameIdentity};
    use crate::season_table::PlayerSeasonRecord;

    fn record(name: &str, gp: u32, points: i32, s_pct: &str, pos: &str) -> PlayerSeasonRecord {
        PlayerSeasonRecord {
            rank: 1,
            player: name.to_string(),
            season: "2018-19".to_string(),
            team: "TST".to_string(),
            shoots: "L".to_string(),
            position: pos.to_string(),
            games_played: gp,
            goals: points / 2,
            assists: points - points / 2,
            points,
            plus_minus: 0,
            penalty_minutes: 10,
            points_per_game: if gp > 0 { points as f64 / gp as f64 } else { 0.0 },
            ev_goals: 10,
            ev_points: 30,
            pp_goals: 4,
            pp_points: 12,
            sh_goals: 0,
            sh_points: 0,
            ot_goals: 0,
            gw_goals: 1,
            shots: 160,
            shooting_pct: s_pct.to_string(),
            avg_toi: "18:00".to_string(),
            faceoff_pct: "--".to_string(),
        }
    }

    #[test]
    fn placeholder_and_participation_filters_apply() {
        let table = SeasonTable::from_records(
            "2018-19",
            vec![
                record("Keeper", 40, 50, "12.5", "C"),
                record("No Shots", 40, 50, "--", "C"),
                record("Few Games", 8, 50, "12.5", "C"),
                record("No Points", 40, 0, "12.5", "C"),
            ],
        );
        let features = extract_features(&table).unwrap();
        assert_eq!(features.len(), 1);
        assert_eq!(features.rows()[0].name, "Keeper");
    }

    #[test]
    fn prepare_variant_skips_participation_thresholds() {
        let table = SeasonTable::from_records(
            "2018-19",
            vec![
                record("Few Games", 3, 0, "5.0", "D"),
                record("No Shots", 40, 50, "--", "C"),
            ],
        );
        let features = prepare_features(&table).unwrap();
        assert_eq!(features.len(), 1);
        assert_eq!(features.rows()[0].name, "Few Games");
    }

    #[test]
    fn shooting_pct_is_a_fraction_after_extraction() {
        let table = SeasonTable::from_records(
            "2018-19",
            vec![
                record("One", 40, 50, "12.5", "C"),
                record("Two", 40, 40, "8.0", "D"),
            ],
        );
        let features = extract_features(&table).unwrap();
        for row in features.rows() {
            assert!(row.features.shooting_pct >= 0.0 && row.features.shooting_pct <= 1.0);
        }
    }

    #[test]
    fn rates_are_max_scaled_in_temporal_variant() {
        let mut heavy = record("Heavy", 40, 50, "10.0", "C");
        heavy.shots = 200;
        let mut light = record("Light", 40, 40, "10.0", "C");
        light.shots = 100;

        let table = SeasonTable::from_records("2018-19", vec![heavy, light]);
        let features = extract_features(&table).unwrap();
        let heavy_rate = features
            .get(&NameIdentity.resolve("Heavy"))
            .map(|f| f.shot_rate)
            .unwrap();
        let light_rate = features
            .get(&NameIdentity.resolve("Light"))
            .map(|f| f.shot_rate)
            .unwrap();
        assert_eq!(heavy_rate, 1.0);
        assert!((light_rate - 0.5).abs() < 1e-12);
    }

    #[test]
    fn forward_indicator_covers_wings_and_centers_only() {
        for (pos, expected) in [("C", 1.0), ("L", 1.0), ("R", 1.0), ("D", 0.0), ("G", 0.0)] {
            let table = SeasonTable::from_records(
                "2018-19",
                vec![record("Player", 40, 40, "9.0", pos)],
            );
            let features = extract_features(&table).unwrap();
            assert_eq!(features.rows()[0].features.forward, expected, "pos {pos}");
        }
    }

    #[test]
    fn ice_time_is_hour_normalized() {
        let table =
            SeasonTable::from_records("2018-19", vec![record("Player", 40, 40, "9.0", "C")]);
        let features = extract_features(&table).unwrap();
        // 18:00 of a 60:00 hour.
        assert!((features.rows()[0].features.toi_frac - 0.3).abs() < 1e-12);
    }

    #[test]
    fn zero_games_played_is_a_hard_error() {
        let table =
            SeasonTable::from_records("2018-19", vec![record("Ghost", 0, 0, "5.0", "C")]);
        assert!(prepare_features(&table).is_err());
    }

    #[test]
    fn identity_resolver_uses_crate_default() {
        let table =
            SeasonTable::from_records("2018-19", vec![record("Some Name", 40, 40, "9.0", "C")]);
        let features = extract_features(&table).unwrap();
        assert!(features.get(&NameIdentity.resolve("Some Name")).is_some());
    }
}
