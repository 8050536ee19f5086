//! Weighted ridge regression and feature selection for local surrogates.
//!
//! Fits follow the usual centred formulation: columns and target are
//! centred on their weighted means, the normal equations
//! `(XᵀWX + αI) β = XᵀWy` are solved by Cholesky factorisation and the
//! intercept restores the means. An unregularised fit on a rank-deficient
//! design is reported as singular rather than patched up.

use crate::error::{Result, XaiError};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};

const SINGULAR_TOLERANCE: f64 = 1e-10;

/// Regularisation of the final surrogate.
pub const SURROGATE_ALPHA: f64 = 1.0;
/// Regularisation of the ranking fit in [`highest_weights`].
pub const RANKING_ALPHA: f64 = 0.01;
/// Above this many requested features, selection ranks by weight instead
/// of growing the set greedily.
pub const FORWARD_SELECTION_LIMIT: usize = 6;

#[derive(Debug, Clone, PartialEq)]
pub struct RidgeFit {
    pub coef: Array1<f64>,
    pub intercept: f64,
}

impl RidgeFit {
    pub fn predict(&self, x: ArrayView2<f64>) -> Array1<f64> {
        x.dot(&self.coef) + self.intercept
    }
}

/// Ridge regression with sample weights and an intercept.
pub fn weighted_ridge(
    x: ArrayView2<f64>,
    y: ArrayView1<f64>,
    weights: ArrayView1<f64>,
    alpha: f64,
) -> Result<RidgeFit> {
    let n = x.nrows();
    if n == 0 || y.len() != n || weights.len() != n {
        return Err(XaiError::Explanation(format!(
            "surrogate needs matching samples: {} rows, {} targets, {} weights",
            n,
            y.len(),
            weights.len()
        )));
    }
    let total = weights.sum();
    if !(total > 0.0) {
        return Err(XaiError::Explanation(
            "surrogate sample weights sum to zero".to_string(),
        ));
    }

    let x_mean = x.t().dot(&weights) / total;
    let y_mean = y.dot(&weights) / total;
    let xc = &x - &x_mean;
    let yc = &y - y_mean;

    let xw = &xc * &weights.view().insert_axis(Axis(1));
    let mut gram = xw.t().dot(&xc);
    gram.diag_mut().map_inplace(|v| *v += alpha);
    let rhs = xw.t().dot(&yc);

    let coef = cholesky_solve(gram, rhs)?;
    let intercept = y_mean - x_mean.dot(&coef);
    Ok(RidgeFit { coef, intercept })
}

/// Weighted coefficient of determination.
///
/// A constant target counts as perfectly explained when the residuals vanish
/// too, and as not explained at all otherwise.
pub fn r2_score(y: ArrayView1<f64>, predicted: ArrayView1<f64>, weights: ArrayView1<f64>) -> f64 {
    let total = weights.sum();
    let mean = if total > 0.0 { y.dot(&weights) / total } else { 0.0 };

    let mut ss_res = 0.0;
    let mut ss_tot = 0.0;
    for ((&t, &p), &w) in y.iter().zip(predicted.iter()).zip(weights.iter()) {
        ss_res += w * (t - p) * (t - p);
        ss_tot += w * (t - mean) * (t - mean);
    }

    if ss_tot == 0.0 {
        if ss_res == 0.0 {
            1.0
        } else {
            0.0
        }
    } else {
        1.0 - ss_res / ss_tot
    }
}

/// Pick up to `num_features` columns for the surrogate.
pub fn select_features(
    x: ArrayView2<f64>,
    y: ArrayView1<f64>,
    weights: ArrayView1<f64>,
    num_features: usize,
) -> Result<Vec<usize>> {
    if num_features <= FORWARD_SELECTION_LIMIT {
        forward_selection(x, y, weights, num_features)
    } else {
        highest_weights(x, y, weights, num_features)
    }
}

/// Grow the feature set one column at a time, each time adding the column
/// whose unregularised fit has the best weighted R².
///
/// Candidates whose fit is singular are skipped; it is an error only if no
/// candidate can be fitted at all.
pub fn forward_selection(
    x: ArrayView2<f64>,
    y: ArrayView1<f64>,
    weights: ArrayView1<f64>,
    num_features: usize,
) -> Result<Vec<usize>> {
    let d = x.ncols();
    let mut used: Vec<usize> = Vec::new();

    for _ in 0..num_features.min(d) {
        let mut best: Option<(usize, f64)> = None;
        for candidate in (0..d).filter(|c| !used.contains(c)) {
            let mut columns = used.clone();
            columns.push(candidate);
            let sub = x.select(Axis(1), &columns);

            let fit = match weighted_ridge(sub.view(), y, weights, 0.0) {
                Ok(fit) => fit,
                Err(_) => continue,
            };
            let score = r2_score(y, fit.predict(sub.view()).view(), weights);
            if best.map_or(true, |(_, s)| score > s) {
                best = Some((candidate, score));
            }
        }

        match best {
            Some((feature, _)) => used.push(feature),
            None if used.is_empty() => {
                return Err(XaiError::Explanation(
                    "surrogate system is singular for every feature".to_string(),
                ))
            }
            None => break,
        }
    }
    Ok(used)
}

/// The `num_features` columns with the largest |coefficient| in a lightly
/// regularised fit on all columns.
pub fn highest_weights(
    x: ArrayView2<f64>,
    y: ArrayView1<f64>,
    weights: ArrayView1<f64>,
    num_features: usize,
) -> Result<Vec<usize>> {
    let fit = weighted_ridge(x, y, weights, RANKING_ALPHA)?;
    let mut order: Vec<usize> = (0..x.ncols()).collect();
    order.sort_by(|&a, &b| fit.coef[b].abs().total_cmp(&fit.coef[a].abs()));
    order.truncate(num_features);
    Ok(order)
}

fn cholesky_solve(a: Array2<f64>, b: Array1<f64>) -> Result<Array1<f64>> {
    let n = b.len();
    let scale = a.diag().iter().fold(1.0f64, |m, v| m.max(v.abs()));
    let mut l = Array2::<f64>::zeros((n, n));

    for j in 0..n {
        let mut diag = a[[j, j]];
        for k in 0..j {
            diag -= l[[j, k]] * l[[j, k]];
        }
        if !(diag > SINGULAR_TOLERANCE * scale) {
            return Err(XaiError::Explanation(
                "surrogate system is singular".to_string(),
            ));
        }
        let pivot = diag.sqrt();
        l[[j, j]] = pivot;
        for i in (j + 1)..n {
            let mut s = a[[i, j]];
            for k in 0..j {
                s -= l[[i, k]] * l[[j, k]];
            }
            l[[i, j]] = s / pivot;
        }
    }

    // L z = b
    let mut z = Array1::<f64>::zeros(n);
    for i in 0..n {
        let mut s = b[i];
        for k in 0..i {
            s -= l[[i, k]] * z[k];
        }
        z[i] = s / l[[i, i]];
    }
    // Lᵀ x = z
    let mut x = Array1::<f64>::zeros(n);
    for i in (0..n).rev() {
        let mut s = z[i];
        for k in (i + 1)..n {
            s -= l[[k, i]] * x[k];
        }
        x[i] = s / l[[i, i]];
    }
    Ok(x)
}
