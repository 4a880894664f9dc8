use std::collections::HashMap;
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::Deserialize;

use crate::identity::{IdentityResolver, NameIdentity, PlayerId};

/// One skater's raw box-score line for one season, as published in the
/// league summary tables. Shooting percentage and faceoff percentage stay
/// strings because the source uses `"--"` for players with no shots or
/// draws taken; average ice time is the raw `"mm:ss"` string.
#[derive(Debug, Clone, Deserialize)]
pub struct PlayerSeasonRecord {
    #[serde(rename = "#")]
    pub rank: u32,
    #[serde(rename = "Player")]
    pub player: String,
    #[serde(rename = "Season")]
    pub season: String,
    #[serde(rename = "Team")]
    pub team: String,
    #[serde(rename = "Shoots")]
    pub shoots: String,
    #[serde(rename = "Pos")]
    pub position: String,
    #[serde(rename = "GP")]
    pub games_played: u32,
    #[serde(rename = "G")]
    pub goals: i32,
    #[serde(rename = "A")]
    pub assists: i32,
    #[serde(rename = "P")]
    pub points: i32,
    #[serde(rename = "+/-")]
    pub plus_minus: i32,
    #[serde(rename = "PIM")]
    pub penalty_minutes: i32,
    #[serde(rename = "P/GP")]
    pub points_per_game: f64,
    #[serde(rename = "EVG")]
    pub ev_goals: i32,
    #[serde(rename = "EVP")]
    pub ev_points: i32,
    #[serde(rename = "PPG")]
    pub pp_goals: i32,
    #[serde(rename = "PPP")]
    pub pp_points: i32,
    #[serde(rename = "SHG")]
    pub sh_goals: i32,
    #[serde(rename = "SHP")]
    pub sh_points: i32,
    #[serde(rename = "OTG")]
    pub ot_goals: i32,
    #[serde(rename = "GWG")]
    pub gw_goals: i32,
    #[serde(rename = "S")]
    pub shots: i32,
    #[serde(rename = "S%")]
    pub shooting_pct: String,
    #[serde(rename = "TOI/GP")]
    pub avg_toi: String,
    #[serde(rename = "FOW%")]
    pub faceoff_pct: String,
}

pub const SHOOTING_PCT_PLACEHOLDER: &str = "--";

impl PlayerSeasonRecord {
    /// False for players who took no shots (`"--"` in the source table).
    pub fn has_shooting_pct(&self) -> bool {
        self.shooting_pct.trim() != SHOOTING_PCT_PLACEHOLDER
    }
}

/// One season's raw table, keyed by surrogate player id. Immutable once
/// loaded; duplicate ids within the season collapse to the entry with
/// more points.
#[derive(Debug, Clone)]
pub struct SeasonTable {
    season: String,
    rows: Vec<PlayerSeasonRecord>,
    ids: Vec<PlayerId>,
    by_player: HashMap<PlayerId, usize>,
}

impl SeasonTable {
    pub fn from_records(season: impl Into<String>, records: Vec<PlayerSeasonRecord>) -> Self {
        Self::from_records_with(season, records, &NameIdentity)
    }

    pub fn from_records_with(
        season: impl Into<String>,
        records: Vec<PlayerSeasonRecord>,
        resolver: &dyn IdentityResolver,
    ) -> Self {
        let mut rows: Vec<PlayerSeasonRecord> = Vec::with_capacity(records.len());
        let mut ids: Vec<PlayerId> = Vec::with_capacity(records.len());
        let mut by_player: HashMap<PlayerId, usize> = HashMap::with_capacity(records.len());

        for record in records {
            let id = resolver.resolve(&record.player);
            match by_player.get(&id) {
                Some(&idx) => {
                    if record.points > rows[idx].points {
                        rows[idx] = record;
                    }
                }
                None => {
                    by_player.insert(id.clone(), rows.len());
                    ids.push(id);
                    rows.push(record);
                }
            }
        }

        Self {
            season: season.into(),
            rows,
            ids,
            by_player,
        }
    }

    pub fn season(&self) -> &str {
        &self.season
    }

    pub fn rows(&self) -> &[PlayerSeasonRecord] {
        &self.rows
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PlayerId, &PlayerSeasonRecord)> {
        self.ids.iter().zip(self.rows.iter())
    }

    pub fn get(&self, id: &PlayerId) -> Option<&PlayerSeasonRecord> {
        self.by_player.get(id).map(|&idx| &self.rows[idx])
    }

    /// Raw-table lookup consumed by the outcome feature builder. Absent
    /// players map to `None`; callers decide the default.
    pub fn points_per_game(&self, id: &PlayerId) -> Option<f64> {
        self.get(id).map(|r| r.points_per_game)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Reads one season CSV. Non-UTF-8 bytes in player names are replaced
/// rather than rejected; the source exports are not consistently encoded.
pub fn load_season_csv(path: &Path) -> Result<SeasonTable> {
    let bytes = fs::read(path).with_context(|| format!("read season csv {}", path.display()))?;
    let text = String::from_utf8_lossy(&bytes).into_owned();

    let mut reader = csv::Reader::from_reader(Cursor::new(text));
    let mut records = Vec::new();
    for row in reader.deserialize::<PlayerSeasonRecord>() {
        let record = row.with_context(|| format!("decode row in {}", path.display()))?;
        records.push(record);
    }

    let season = season_label_for(path, &records)
        .ok_or_else(|| anyhow!("cannot determine season label for {}", path.display()))?;
    Ok(SeasonTable::from_records(season, records))
}

/// Loads every season CSV under `dir` in chronological order, stopping
/// before `last_finished` (the most recent completed season is held out
/// as the regression label source, never as pipeline input).
pub fn load_seasons(dir: &Path, last_finished: &str) -> Result<Vec<SeasonTable>> {
    let mut paths = season_csv_paths(dir)?;
    paths.sort_by_key(|(year, _)| *year);

    let mut out = Vec::with_capacity(paths.len());
    for (_, path) in paths {
        let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("");
        if stem == last_finished {
            break;
        }
        out.push(load_season_csv(&path)?);
    }
    Ok(out)
}

/// Loads every season CSV under `dir`, including the most recent one.
/// Used by the single-season finder, which matches across all seasons.
pub fn load_all_seasons(dir: &Path) -> Result<Vec<SeasonTable>> {
    let mut paths = season_csv_paths(dir)?;
    paths.sort_by_key(|(year, _)| *year);
    paths
        .into_iter()
        .map(|(_, path)| load_season_csv(&path))
        .collect()
}

fn season_csv_paths(dir: &Path) -> Result<Vec<(i32, PathBuf)>> {
    let entries =
        fs::read_dir(dir).with_context(|| format!("list season directory {}", dir.display()))?;

    let mut out = Vec::new();
    for entry in entries {
        let path = entry.context("read season directory entry")?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("csv") {
            continue;
        }
        let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("");
        let Some(year) = season_start_year(stem) else {
            eprintln!("[WARN] skipping {} (stem is not a season label)", path.display());
            continue;
        };
        out.push((year, path));
    }
    Ok(out)
}

fn season_label_for(path: &Path, records: &[PlayerSeasonRecord]) -> Option<String> {
    if let Some(first) = records.first()
        && !first.season.trim().is_empty()
    {
        return Some(first.season.trim().to_string());
    }
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(|s| s.to_string())
}

/// Leading year of a `"YYYY-YY"` (or `"YYYY-YYYY"`) season label.
pub fn season_start_year(label: &str) -> Option<i32> {
    label.split('-').next()?.trim().parse::<i32>().ok()
}

/// `"2019-20"` → `"2020-21"`. Returns `None` for labels that do not carry
/// a parseable start year.
pub fn next_season_label(label: &str) -> Option<String> {
    let start = season_start_year(label)?;
    Some(format!("{}-{:02}", start + 1, (start + 2) % 100))
}
