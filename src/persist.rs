use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use crate::outcome::FeatureMatrix;

pub const ARTIFACT_VERSION: u32 = 1;

/// On-disk form of the prediction feature matrix, with enough of the
/// producing configuration echoed back that the fitting binary can
/// derive its baseline column without re-reading the environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureMatrixArtifact {
    pub version: u32,
    pub generated_at: String,
    pub window_size: usize,
    pub k_neighbors: usize,
    pub observed_seasons: Vec<String>,
    pub last_finished_season: String,
    pub feature_len: usize,
    pub players: Vec<ArtifactPlayer>,
    pub rows: Vec<Vec<f64>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactPlayer {
    pub id: String,
    pub name: String,
}

impl FeatureMatrixArtifact {
    pub fn from_matrix(
        matrix: &FeatureMatrix,
        window_size: usize,
        k_neighbors: usize,
        observed_seasons: &[String],
        last_finished_season: &str,
    ) -> Self {
        Self {
            version: ARTIFACT_VERSION,
            generated_at: chrono::Utc::now().to_rfc3339(),
            window_size,
            k_neighbors,
            observed_seasons: observed_seasons.to_vec(),
            last_finished_season: last_finished_season.to_string(),
            feature_len: matrix.feature_len,
            players: matrix
                .players
                .iter()
                .map(|(id, name)| ArtifactPlayer {
                    id: id.as_str().to_string(),
                    name: name.clone(),
                })
                .collect(),
            rows: matrix.rows.clone(),
        }
    }
}

/// Writes via a temp file in the same directory so a crash mid-write
/// never leaves a torn artifact behind.
pub fn save_artifact(path: &Path, artifact: &FeatureMatrixArtifact) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("create artifact directory {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(artifact).context("serialize feature matrix")?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json).with_context(|| format!("write {}", tmp.display()))?;
    fs::rename(&tmp, path)
        .with_context(|| format!("rename {} into place", tmp.display()))?;
    Ok(())
}

pub fn load_artifact(path: &Path) -> Result<FeatureMatrixArtifact> {
    let raw =
        fs::read_to_string(path).with_context(|| format!("read artifact {}", path.display()))?;
    let artifact: FeatureMatrixArtifact =
        serde_json::from_str(&raw).with_context(|| format!("decode artifact {}", path.display()))?;
    if artifact.version != ARTIFACT_VERSION {
        bail!(
            "artifact {} has version {} but this build expects {ARTIFACT_VERSION}",
            path.display(),
            artifact.version
        );
    }
    Ok(artifact)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{IdentityResolver, NameIdentity};

    fn sample_artifact() -> FeatureMatrixArtifact {
        let matrix = FeatureMatrix {
            players: vec![(NameIdentity.resolve("Some Player"), "Some Player".to_string())],
            rows: vec![vec![0.5; 16]],
            feature_len: 16,
        };
        let observed = ["2017-18", "2018-19", "2019-20"].map(String::from);
        FeatureMatrixArtifact::from_matrix(&matrix, 3, 3, &observed, "2020-21")
    }

    #[test]
    fn save_load_round_trip() {
        let dir = std::env::temp_dir().join(format!("persist_rt_{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        let path = dir.join("matrix.json");

        let artifact = sample_artifact();
        save_artifact(&path, &artifact).unwrap();
        let loaded = load_artifact(&path).unwrap();
        assert_eq!(loaded.version, ARTIFACT_VERSION);
        assert_eq!(loaded.players[0].name, "Some Player");
        assert_eq!(loaded.rows, artifact.rows);
        assert_eq!(loaded.feature_len, 16);
        // No temp file left behind.
        assert!(!dir.join("matrix.json.tmp").exists());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn version_mismatch_is_an_error() {
        let dir = std::env::temp_dir().join(format!("persist_ver_{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        let path = dir.join("matrix.json");

        let mut artifact = sample_artifact();
        artifact.version = ARTIFACT_VERSION + 1;
        let json = serde_json::to_string(&artifact).unwrap();
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(&path, json).unwrap();
        assert!(load_artifact(&path).is_err());

        let _ = std::fs::remove_dir_all(&dir);
    }
}
