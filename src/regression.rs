use anyhow::{Result, bail};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

/// Ordinary least squares with a small ridge term so rank-deficient
/// designs (more columns than training rows in a fold) still solve.
const RIDGE_LAMBDA: f64 = 1e-6;

#[derive(Debug, Clone)]
pub struct LinearModel {
    coeffs: Vec<f64>,
    intercept: f64,
}

impl LinearModel {
    pub fn predict(&self, features: &[f64]) -> f64 {
        self.intercept
            + self
                .coeffs
                .iter()
                .zip(features)
                .map(|(c, x)| c * x)
                .sum::<f64>()
    }

    pub fn coeffs(&self) -> &[f64] {
        &self.coeffs
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }
}

/// Fits `y ~ X` by solving the ridge-stabilized normal equations.
pub fn fit_least_squares(xs: &[Vec<f64>], ys: &[f64]) -> Result<LinearModel> {
    if xs.is_empty() || xs.len() != ys.len() {
        bail!(
            "cannot fit on {} feature rows against {} labels",
            xs.len(),
            ys.len()
        );
    }
    let n_features = xs[0].len();
    if xs.iter().any(|x| x.len() != n_features) {
        bail!("feature rows have inconsistent lengths");
    }

    // Augmented design: n_features coefficients plus an intercept column.
    let dim = n_features + 1;
    let mut normal = vec![vec![0.0_f64; dim]; dim];
    let mut rhs = vec![0.0_f64; dim];

    for (x, &y) in xs.iter().zip(ys) {
        for i in 0..dim {
            let xi = if i < n_features { x[i] } else { 1.0 };
            rhs[i] += xi * y;
            for j in 0..dim {
                let xj = if j < n_features { x[j] } else { 1.0 };
                normal[i][j] += xi * xj;
            }
        }
    }
    for (i, row) in normal.iter_mut().enumerate() {
        row[i] += RIDGE_LAMBDA;
    }

    let solution = solve(normal, rhs)?;
    let intercept = solution[n_features];
    let mut coeffs = solution;
    coeffs.truncate(n_features);
    Ok(LinearModel { coeffs, intercept })
}

/// Gaussian elimination with partial pivoting.
fn solve(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Result<Vec<f64>> {
    let n = b.len();
    for col in 0..n {
        let pivot = (col..n)
            .max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))
            .unwrap_or(col);
        if a[pivot][col].abs() < 1e-12 {
            bail!("singular normal matrix at column {col}");
        }
        a.swap(col, pivot);
        b.swap(col, pivot);

        for row in col + 1..n {
            let factor = a[row][col] / a[col][col];
            for k in col..n {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = vec![0.0_f64; n];
    for row in (0..n).rev() {
        let tail: f64 = (row + 1..n).map(|k| a[row][k] * x[k]).sum();
        x[row] = (b[row] - tail) / a[row][row];
    }
    Ok(x)
}

/// Coefficient of determination. A zero-variance target yields 0.0
/// rather than a division by zero.
pub fn r2_score(actual: &[f64], predicted: &[f64]) -> f64 {
    if actual.is_empty() || actual.len() != predicted.len() {
        return 0.0;
    }
    let mean = actual.iter().sum::<f64>() / actual.len() as f64;
    let ss_tot: f64 = actual.iter().map(|y| (y - mean) * (y - mean)).sum();
    if ss_tot == 0.0 {
        return 0.0;
    }
    let ss_res: f64 = actual
        .iter()
        .zip(predicted)
        .map(|(y, p)| (y - p) * (y - p))
        .sum();
    1.0 - ss_res / ss_tot
}

#[derive(Debug, Clone, Copy)]
pub struct CrossValReport {
    pub folds: usize,
    /// Mean per-fold R² of the fitted model.
    pub prediction_r2: f64,
    /// Mean per-fold R² of predicting the label directly from one
    /// feature column, with no model in between.
    pub baseline_r2: f64,
}

/// Shuffled k-fold cross validation over rows whose last column is the
/// label. `baseline_col` names the feature column used as the naive
/// prediction to beat.
pub fn k_fold_r2(
    rows: &[Vec<f64>],
    baseline_col: usize,
    folds: usize,
    seed: u64,
) -> Result<CrossValReport> {
    if folds < 2 {
        bail!("cross validation needs at least 2 folds, got {folds}");
    }
    if rows.len() < folds {
        bail!(
            "cannot split {} rows into {folds} folds",
            rows.len()
        );
    }
    let width = rows[0].len();
    if width < 2 || rows.iter().any(|r| r.len() != width) {
        bail!("feature matrix rows are ragged or too short");
    }
    if baseline_col >= width - 1 {
        bail!("baseline column {baseline_col} is out of the feature range");
    }

    let mut order: Vec<usize> = (0..rows.len()).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    order.shuffle(&mut rng);

    let mut prediction_sum = 0.0;
    let mut baseline_sum = 0.0;
    for fold in 0..folds {
        let test: Vec<usize> = order
            .iter()
            .copied()
            .skip(fold)
            .step_by(folds)
            .collect();
        let train: Vec<usize> = order
            .iter()
            .copied()
            .filter(|idx| !test.contains(idx))
            .collect();

        let train_xs: Vec<Vec<f64>> = train
            .iter()
            .map(|&idx| rows[idx][..width - 1].to_vec())
            .collect();
        let train_ys: Vec<f64> = train.iter().map(|&idx| rows[idx][width - 1]).collect();
        let model = fit_least_squares(&train_xs, &train_ys)?;

        let actual: Vec<f64> = test.iter().map(|&idx| rows[idx][width - 1]).collect();
        let predicted: Vec<f64> = test
            .iter()
            .map(|&idx| model.predict(&rows[idx][..width - 1]))
            .collect();
        let baseline: Vec<f64> = test.iter().map(|&idx| rows[idx][baseline_col]).collect();

        prediction_sum += r2_score(&actual, &predicted);
        baseline_sum += r2_score(&actual, &baseline);
    }

    Ok(CrossValReport {
        folds,
        prediction_r2: prediction_sum / folds as f64,
        baseline_r2: baseline_sum / folds as f64,
    })
}
