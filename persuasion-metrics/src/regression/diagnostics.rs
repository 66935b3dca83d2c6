use persuasion_core::{CoreError, Result};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ChiSquared, ContinuousCDF, Normal, StudentsT};

use super::ols::DesignMatrix;
use crate::statistical::StatisticalAnalyzer;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JarqueBera {
    pub statistic: f64,
    pub p_value: f64,
    pub skew: f64,
    pub kurtosis: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QqPoint {
    pub theoretical: f64,
    pub sample: f64,
}

/// Least-squares line of one response on one regressor, with its 95% confidence band.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimpleFit {
    pub intercept: f64,
    pub slope: f64,
    pub r_squared: f64,
    /// `(x, fitted, lower, upper)` over an even grid spanning the observed x range.
    pub band: Vec<(f64, f64, f64, f64)>,
}

/// `sum((e_t - e_{t-1})^2) / sum(e_t^2)`; 0 for an all-zero series.
pub fn durbin_watson(residuals: &[f64]) -> f64 {
    let denom: f64 = residuals.iter().map(|e| e * e).sum();
    if denom == 0.0 {
        return 0.0;
    }
    let num: f64 = residuals.windows(2).map(|w| (w[1] - w[0]).powi(2)).sum();
    num / denom
}

pub fn jarque_bera(residuals: &[f64]) -> Result<JarqueBera> {
    let n = residuals.len();
    if n < 3 {
        return Err(CoreError::InsufficientData(format!(
            "Jarque-Bera needs at least 3 residuals, got {}",
            n
        )));
    }

    let nf = n as f64;
    let mean = residuals.iter().sum::<f64>() / nf;
    let moment = |p: i32| residuals.iter().map(|e| (e - mean).powi(p)).sum::<f64>() / nf;
    let m2 = moment(2);
    if m2 == 0.0 {
        return Err(CoreError::DegenerateSample("residuals have zero variance".to_string()));
    }

    let skew = moment(3) / m2.powf(1.5);
    let kurtosis = moment(4) / (m2 * m2);
    let statistic = nf / 6.0 * (skew * skew + (kurtosis - 3.0).powi(2) / 4.0);

    let chi_sq = ChiSquared::new(2.0).map_err(|e| CoreError::Distribution(e.to_string()))?;

    Ok(JarqueBera {
        statistic,
        p_value: chi_sq.sf(statistic),
        skew,
        kurtosis,
    })
}

/// `sqrt(lambda_max / lambda_min)` of `X'X`; infinite when `X'X` is singular.
pub fn condition_number(design: &DesignMatrix) -> f64 {
    let x = design.matrix();
    if x.ncols() == 0 {
        return f64::NAN;
    }
    let eigen = (x.transpose() * x).symmetric_eigen();
    let max = eigen.eigenvalues.max();
    let min = eigen.eigenvalues.min();
    if min <= 0.0 {
        return f64::INFINITY;
    }
    (max / min).sqrt()
}

/// Locally weighted linear smoother (tricube weights, bisquare robustness iterations).
///
/// Returns `(x, smoothed)` sorted by `x`.
pub fn lowess(x: &[f64], y: &[f64], frac: f64, iterations: usize) -> Vec<(f64, f64)> {
    let n = x.len().min(y.len());
    if n == 0 {
        return vec![];
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| x[a].total_cmp(&x[b]));
    let xs: Vec<f64> = order.iter().map(|&i| x[i]).collect();
    let ys: Vec<f64> = order.iter().map(|&i| y[i]).collect();

    if n < 3 {
        return xs.into_iter().zip(ys).collect();
    }

    let k = ((frac * n as f64).floor() as usize).clamp(2, n);
    let y_scale = ys.iter().fold(0.0_f64, |acc, y| acc.max(y.abs()));
    let mut robustness = vec![1.0; n];
    let mut smoothed = vec![0.0; n];

    for iteration in 0..=iterations {
        for i in 0..n {
            smoothed[i] = local_fit(&xs, &ys, &robustness, i, k);
        }

        if iteration == iterations {
            break;
        }

        let residuals: Vec<f64> = ys.iter().zip(&smoothed).map(|(y, s)| y - s).collect();
        let abs: Vec<f64> = residuals.iter().map(|r| r.abs()).collect();
        let scale = 6.0 * StatisticalAnalyzer::median(&abs).unwrap_or(0.0);
        // Residuals at rounding level: the fit is already exact.
        if scale <= 1e-10 * (1.0 + y_scale) {
            break;
        }
        for (w, r) in robustness.iter_mut().zip(&residuals) {
            let u = r / scale;
            *w = if u.abs() < 1.0 { (1.0 - u * u).powi(2) } else { 0.0 };
        }
    }

    xs.into_iter().zip(smoothed).collect()
}

fn local_fit(xs: &[f64], ys: &[f64], robustness: &[f64], i: usize, k: usize) -> f64 {
    let x0 = xs[i];
    let mut distances: Vec<f64> = xs.iter().map(|x| (x - x0).abs()).collect();
    distances.sort_by(|a, b| a.total_cmp(b));
    let h = distances[k - 1];

    let weights: Vec<f64> = xs
        .iter()
        .zip(robustness)
        .map(|(x, r)| {
            let d = (x - x0).abs();
            let u = if h > 0.0 { d / h } else if d == 0.0 { 0.0 } else { 1.0 };
            let tricube = if u < 1.0 { (1.0 - u.powi(3)).powi(3) } else { 0.0 };
            tricube * r
        })
        .collect();

    let sw: f64 = weights.iter().sum();
    if sw <= 0.0 {
        return ys[i];
    }
    let mx = weights.iter().zip(xs).map(|(w, x)| w * x).sum::<f64>() / sw;
    let my = weights.iter().zip(ys).map(|(w, y)| w * y).sum::<f64>() / sw;
    let sxx: f64 = weights.iter().zip(xs).map(|(w, x)| w * (x - mx).powi(2)).sum();
    let sxy: f64 = weights
        .iter()
        .zip(xs.iter().zip(ys))
        .map(|(w, (x, y))| w * (x - mx) * (y - my))
        .sum();

    if sxx <= f64::EPSILON * sw {
        return my;
    }
    my + sxy / sxx * (x0 - mx)
}

/// Sorted sample against standard normal quantiles at plotting positions `i / (n + 1)`.
pub fn qq_points(values: &[f64]) -> Result<Vec<QqPoint>> {
    let normal = Normal::new(0.0, 1.0).map_err(|e| CoreError::Distribution(e.to_string()))?;
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let n = sorted.len() as f64;

    Ok(sorted
        .into_iter()
        .enumerate()
        .map(|(i, sample)| QqPoint {
            theoretical: normal.inverse_cdf((i as f64 + 1.0) / (n + 1.0)),
            sample,
        })
        .collect())
}

/// Simple linear regression of `y` on `x` with a t-based 95% band for the mean response.
pub fn simple_linear_fit(x: &[f64], y: &[f64], grid_points: usize) -> Result<SimpleFit> {
    if x.len() != y.len() {
        return Err(CoreError::Validation("x and y differ in length".to_string()));
    }
    let n = x.len();
    if n < 3 {
        return Err(CoreError::InsufficientData(format!(
            "a fitted line with a band needs at least 3 points, got {}",
            n
        )));
    }

    let nf = n as f64;
    let mx = x.iter().sum::<f64>() / nf;
    let my = y.iter().sum::<f64>() / nf;
    let sxx: f64 = x.iter().map(|v| (v - mx).powi(2)).sum();
    if sxx == 0.0 {
        return Err(CoreError::DegenerateSample("regressor has zero variance".to_string()));
    }
    let sxy: f64 = x.iter().zip(y).map(|(a, b)| (a - mx) * (b - my)).sum();
    let syy: f64 = y.iter().map(|v| (v - my).powi(2)).sum();

    let slope = sxy / sxx;
    let intercept = my - slope * mx;
    let sse: f64 = x
        .iter()
        .zip(y)
        .map(|(a, b)| (b - intercept - slope * a).powi(2))
        .sum();
    let r_squared = if syy > 0.0 { 1.0 - sse / syy } else { 0.0 };
    let s = (sse / (nf - 2.0)).sqrt();

    let t = StudentsT::new(0.0, 1.0, nf - 2.0).map_err(|e| CoreError::Distribution(e.to_string()))?;
    let q = t.inverse_cdf(0.975);

    let lo = x.iter().cloned().fold(f64::INFINITY, f64::min);
    let hi = x.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let points = grid_points.max(2);
    let step = (hi - lo) / (points - 1) as f64;

    let band = (0..points)
        .map(|i| {
            let gx = lo + i as f64 * step;
            let fitted = intercept + slope * gx;
            let half = q * s * (1.0 / nf + (gx - mx).powi(2) / sxx).sqrt();
            (gx, fitted, fitted - half, fitted + half)
        })
        .collect();

    Ok(SimpleFit {
        intercept,
        slope,
        r_squared,
        band,
    })
}
