use anyhow::{Result, bail};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub index: usize,
    pub distance: f64,
}

/// Exhaustive Euclidean nearest-neighbor index over a fixed set of
/// vectors. Built once and read-only afterwards; when the underlying
/// table changes, callers discard the index and fit a new one.
///
/// The rest of the crate treats this as a black-box "k nearest by
/// Euclidean distance" capability.
#[derive(Debug, Clone)]
pub struct NeighborIndex {
    vectors: Vec<Vec<f64>>,
    dim: usize,
}

impl NeighborIndex {
    pub fn fit(vectors: Vec<Vec<f64>>) -> Result<Self> {
        let dim = vectors.first().map(|v| v.len()).unwrap_or(0);
        for (idx, vector) in vectors.iter().enumerate() {
            if vector.len() != dim {
                bail!(
                    "vector {idx} has dimension {} but the index expects {dim}",
                    vector.len()
                );
            }
            if vector.iter().any(|v| !v.is_finite()) {
                bail!("vector {idx} contains a non-finite value");
            }
        }
        Ok(Self { vectors, dim })
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    /// The `k` closest vectors to `query`, ascending by distance. Ties
    /// keep insertion order. Dimension mismatches yield no neighbors
    /// rather than a panic.
    pub fn nearest(&self, query: &[f64], k: usize) -> Vec<Neighbor> {
        if k == 0 || self.vectors.is_empty() || query.len() != self.dim {
            return Vec::new();
        }

        let mut out: Vec<Neighbor> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(index, vector)| Neighbor {
                index,
                distance: euclidean(query, vector),
            })
            .collect();
        out.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        out.truncate(k);
        out
    }
}

fn euclidean(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}
