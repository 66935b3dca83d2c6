use nalgebra::{DMatrix, DVector};
use persuasion_core::{CoreError, Result};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, FisherSnedecor, Normal, StudentsT};

pub const INTERCEPT_NAME: &str = "const";

/// Regression design: named columns over the same observations.
#[derive(Debug, Clone, PartialEq)]
pub struct DesignMatrix {
    names: Vec<String>,
    matrix: DMatrix<f64>,
}

impl DesignMatrix {
    pub fn from_columns(names: Vec<String>, columns: &[Vec<f64>]) -> Result<Self> {
        if names.len() != columns.len() {
            return Err(CoreError::Validation(format!(
                "{} column names for {} columns",
                names.len(),
                columns.len()
            )));
        }
        let nrows = columns.first().map_or(0, Vec::len);
        if columns.iter().any(|c| c.len() != nrows) {
            return Err(CoreError::Validation("design columns differ in length".to_string()));
        }

        let matrix = DMatrix::from_fn(nrows, columns.len(), |i, j| columns[j][i]);
        Ok(Self { names, matrix })
    }

    /// Prepends an intercept column of ones named [`INTERCEPT_NAME`].
    pub fn with_intercept(names: &[String], columns: &[Vec<f64>]) -> Result<Self> {
        let nrows = columns.first().map_or(0, Vec::len);
        let mut all_names = Vec::with_capacity(names.len() + 1);
        all_names.push(INTERCEPT_NAME.to_string());
        all_names.extend(names.iter().cloned());

        let mut all_columns = Vec::with_capacity(columns.len() + 1);
        all_columns.push(vec![1.0; nrows]);
        all_columns.extend(columns.iter().cloned());

        Self::from_columns(all_names, &all_columns)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn matrix(&self) -> &DMatrix<f64> {
        &self.matrix
    }

    pub fn nrows(&self) -> usize {
        self.matrix.nrows()
    }

    pub fn ncols(&self) -> usize {
        self.matrix.ncols()
    }

    pub fn column(&self, j: usize) -> Vec<f64> {
        self.matrix.column(j).iter().copied().collect()
    }

    pub fn without_column(&self, j: usize) -> Self {
        let mut names = self.names.clone();
        names.remove(j);
        Self {
            names,
            matrix: self.matrix.clone().remove_column(j),
        }
    }

    /// Index of the first non-zero constant column, if any.
    pub fn constant_column(&self) -> Option<usize> {
        (0..self.ncols()).find(|&j| {
            let col = self.matrix.column(j);
            let first = col[0];
            first != 0.0 && col.iter().all(|&v| v == first)
        })
    }

    pub fn has_constant(&self) -> bool {
        self.nrows() > 0 && self.constant_column().is_some()
    }

    /// Numerical rank from the singular values, `tol = max(n, p) * s_max * eps`.
    pub fn rank(&self) -> usize {
        if self.nrows() == 0 || self.ncols() == 0 {
            return 0;
        }
        let singular = self.matrix.clone().svd(false, false).singular_values;
        let s_max = singular.max();
        let tol = self.nrows().max(self.ncols()) as f64 * s_max * f64::EPSILON;
        singular.iter().filter(|&&s| s > tol).count()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CovarianceType {
    NonRobust,
    HC3,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Coefficient {
    pub name: String,
    pub estimate: f64,
    pub std_error: f64,
    /// t-statistic for non-robust fits, z-statistic for robust ones.
    pub statistic: f64,
    pub p_value: f64,
    pub ci_lower: f64,
    pub ci_upper: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OlsFit {
    pub covariance_type: CovarianceType,
    pub coefficients: Vec<Coefficient>,
    pub nobs: usize,
    pub df_model: f64,
    pub df_resid: f64,
    pub r_squared: f64,
    pub adj_r_squared: f64,
    pub f_statistic: Option<f64>,
    pub f_p_value: Option<f64>,
    pub log_likelihood: f64,
    pub aic: f64,
    pub bic: f64,
    pub ssr: f64,
    pub fitted: Vec<f64>,
    pub residuals: Vec<f64>,
}

impl OlsFit {
    pub fn coefficient(&self, name: &str) -> Option<&Coefficient> {
        self.coefficients.iter().find(|c| c.name == name)
    }
}

/// Least-squares coefficients through the SVD pseudo-inverse; tolerates rank deficiency.
pub fn least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Result<DVector<f64>> {
    if x.nrows() == 0 || x.ncols() == 0 {
        return Err(CoreError::InsufficientData(format!(
            "cannot solve a {}x{} system",
            x.nrows(),
            x.ncols()
        )));
    }
    let svd = x.clone().svd(true, true);
    let s_max = svd.singular_values.max();
    let eps = x.nrows().max(x.ncols()) as f64 * s_max * f64::EPSILON;
    svd.solve(y, eps)
        .map_err(|e| CoreError::SingularDesign(e.to_string()))
}

/// Coefficient of determination of `y` on `x`; centered when `centered` is set.
/// `None` when the reference sum of squares is zero.
pub fn r_squared(y: &DVector<f64>, residuals: &DVector<f64>, centered: bool) -> Option<f64> {
    let ssr = residuals.norm_squared();
    let tss = if centered {
        let mean = y.mean();
        y.iter().map(|v| (v - mean).powi(2)).sum::<f64>()
    } else {
        y.norm_squared()
    };
    if tss <= f64::EPSILON * y.len().max(1) as f64 {
        return None;
    }
    Some(1.0 - ssr / tss)
}

/// Fit `y = X b + e` by ordinary least squares.
///
/// Fails with [`CoreError::SingularDesign`] when `X` is not of full column rank.
pub fn fit_ols(design: &DesignMatrix, y: &[f64], covariance: CovarianceType) -> Result<OlsFit> {
    let n = design.nrows();
    let p = design.ncols();

    if y.len() != n {
        return Err(CoreError::Validation(format!(
            "response has {} values for {} design rows",
            y.len(),
            n
        )));
    }
    if n <= p {
        return Err(CoreError::InsufficientData(format!(
            "{} observations cannot identify {} coefficients",
            n, p
        )));
    }

    let rank = design.rank();
    if rank < p {
        return Err(CoreError::SingularDesign(format!(
            "design has rank {} but {} columns ({})",
            rank,
            p,
            design.names().join(", ")
        )));
    }

    let x = design.matrix();
    let yv = DVector::from_column_slice(y);
    let xt = x.transpose();
    let chol = (&xt * x)
        .cholesky()
        .ok_or_else(|| CoreError::SingularDesign("X'X is not positive definite".to_string()))?;
    let xtx_inv = chol.inverse();
    let beta = chol.solve(&(&xt * &yv));

    let fitted = x * &beta;
    let residuals = &yv - &fitted;
    let ssr = residuals.norm_squared();

    let has_constant = design.has_constant();
    let k_constant = if has_constant { 1.0 } else { 0.0 };
    let nf = n as f64;
    let df_resid = (n - p) as f64;
    let df_model = p as f64 - k_constant;

    let r2 = r_squared(&yv, &residuals, has_constant).ok_or_else(|| {
        CoreError::DegenerateSample("response has zero variance".to_string())
    })?;
    if ssr <= 1e-20 * yv.norm_squared() {
        return Err(CoreError::DegenerateSample(
            "perfect fit: residuals are all zero".to_string(),
        ));
    }
    let adj_r2 = 1.0 - (nf - k_constant) / df_resid * (1.0 - r2);

    let cov = match covariance {
        CovarianceType::NonRobust => &xtx_inv * (ssr / df_resid),
        CovarianceType::HC3 => hc3_covariance(x, &xtx_inv, &residuals)?,
    };

    let std_errors: Vec<f64> = (0..p).map(|j| cov[(j, j)].max(0.0).sqrt()).collect();

    let (tail, quantile): (Box<dyn Fn(f64) -> f64>, f64) = match covariance {
        CovarianceType::NonRobust => {
            let t = StudentsT::new(0.0, 1.0, df_resid).map_err(|e| CoreError::Distribution(e.to_string()))?;
            let q = t.inverse_cdf(0.975);
            (Box::new(move |s: f64| 2.0 * t.sf(s.abs())), q)
        }
        CovarianceType::HC3 => {
            let z = Normal::new(0.0, 1.0).map_err(|e| CoreError::Distribution(e.to_string()))?;
            let q = z.inverse_cdf(0.975);
            (Box::new(move |s: f64| 2.0 * z.sf(s.abs())), q)
        }
    };

    let coefficients = design
        .names()
        .iter()
        .enumerate()
        .map(|(j, name)| {
            let estimate = beta[j];
            let se = std_errors[j];
            let statistic = estimate / se;
            Coefficient {
                name: name.clone(),
                estimate,
                std_error: se,
                statistic,
                p_value: tail(statistic),
                ci_lower: estimate - quantile * se,
                ci_upper: estimate + quantile * se,
            }
        })
        .collect();

    let (f_statistic, f_p_value) = if df_model > 0.0 {
        let f = match covariance {
            CovarianceType::NonRobust => {
                let tss = if has_constant {
                    let mean = yv.mean();
                    yv.iter().map(|v| (v - mean).powi(2)).sum::<f64>()
                } else {
                    yv.norm_squared()
                };
                Some(((tss - ssr) / df_model) / (ssr / df_resid))
            }
            CovarianceType::HC3 => wald_f(&beta, &cov, design.constant_column()),
        };
        match f {
            Some(f) => {
                let dist = FisherSnedecor::new(df_model, df_resid)
                    .map_err(|e| CoreError::Distribution(e.to_string()))?;
                (Some(f), Some(dist.sf(f)))
            }
            None => (None, None),
        }
    } else {
        (None, None)
    };

    let log_likelihood = -nf / 2.0 * ((2.0 * std::f64::consts::PI).ln() + (ssr / nf).ln() + 1.0);
    let k = p as f64;

    tracing::debug!(nobs = n, r_squared = r2, ?covariance, "ols fit");

    Ok(OlsFit {
        covariance_type: covariance,
        coefficients,
        nobs: n,
        df_model,
        df_resid,
        r_squared: r2,
        adj_r_squared: adj_r2,
        f_statistic,
        f_p_value,
        log_likelihood,
        aic: -2.0 * log_likelihood + 2.0 * k,
        bic: -2.0 * log_likelihood + nf.ln() * k,
        ssr,
        fitted: fitted.iter().copied().collect(),
        residuals: residuals.iter().copied().collect(),
    })
}

/// Diagonal of the hat matrix `X (X'X)^-1 X'`.
pub fn leverage(x: &DMatrix<f64>, xtx_inv: &DMatrix<f64>) -> Vec<f64> {
    (0..x.nrows())
        .map(|i| {
            let row = x.row(i);
            (row * xtx_inv * row.transpose())[(0, 0)]
        })
        .collect()
}

/// `(X'X)^-1 X' diag(e_i^2 / (1 - h_ii)^2) X (X'X)^-1`
fn hc3_covariance(x: &DMatrix<f64>, xtx_inv: &DMatrix<f64>, residuals: &DVector<f64>) -> Result<DMatrix<f64>> {
    let h = leverage(x, xtx_inv);
    let mut weighted = x.clone();

    for (i, &hii) in h.iter().enumerate() {
        let denom = 1.0 - hii;
        if denom <= 1e-12 {
            return Err(CoreError::DegenerateSample(format!(
                "observation {} has leverage 1; HC3 is undefined",
                i
            )));
        }
        let omega = residuals[i].powi(2) / (denom * denom);
        weighted.row_mut(i).scale_mut(omega);
    }

    let meat = x.transpose() * weighted;
    Ok(xtx_inv * meat * xtx_inv)
}

/// Wald F-statistic for all slope coefficients being zero.
fn wald_f(beta: &DVector<f64>, cov: &DMatrix<f64>, constant: Option<usize>) -> Option<f64> {
    let slopes: Vec<usize> = (0..beta.len()).filter(|&j| Some(j) != constant).collect();
    let q = slopes.len();
    if q == 0 {
        return None;
    }

    let b = DVector::from_fn(q, |i, _| beta[slopes[i]]);
    let v = DMatrix::from_fn(q, q, |i, j| cov[(slopes[i], slopes[j])]);
    let v_inv = v.try_inverse()?;
    let w = (b.transpose() * v_inv * &b)[(0, 0)];
    Some(w / q as f64)
}
