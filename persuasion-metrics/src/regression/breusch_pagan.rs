use nalgebra::DVector;
use persuasion_core::{CoreError, Result};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ChiSquared, ContinuousCDF, FisherSnedecor};

use super::ols::{least_squares, r_squared, DesignMatrix};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BreuschPaganResult {
    /// Lagrange multiplier statistic `n * R²` of the auxiliary regression.
    pub lm: f64,
    pub lm_p_value: f64,
    pub f_statistic: f64,
    pub f_p_value: f64,
    /// Number of regressors besides the constant.
    pub df: usize,
    pub heteroskedastic: bool,
}

/// Studentized (Koenker) Breusch-Pagan test: regress squared residuals on the design.
pub fn breusch_pagan(residuals: &[f64], design: &DesignMatrix, alpha: f64) -> Result<BreuschPaganResult> {
    let n = design.nrows();
    if residuals.len() != n {
        return Err(CoreError::Validation(format!(
            "{} residuals for {} design rows",
            residuals.len(),
            n
        )));
    }

    let df = design.ncols().saturating_sub(usize::from(design.has_constant()));
    if df == 0 || n <= design.ncols() {
        return Err(CoreError::InsufficientData(
            "Breusch-Pagan needs at least one regressor and more rows than columns".to_string(),
        ));
    }

    let squared = DVector::from_iterator(n, residuals.iter().map(|e| e * e));
    let beta = least_squares(design.matrix(), &squared)?;
    let aux_residuals = &squared - design.matrix() * beta;

    let r2 = r_squared(&squared, &aux_residuals, true)
        .map_or(0.0, |r| r.clamp(0.0, 1.0));

    let nf = n as f64;
    let dff = df as f64;
    let df_resid = nf - design.ncols() as f64;

    let lm = nf * r2;
    let chi_sq = ChiSquared::new(dff).map_err(|e| CoreError::Distribution(e.to_string()))?;
    let lm_p_value = chi_sq.sf(lm);

    let (f_statistic, f_p_value) = if r2 < 1.0 {
        let f = (r2 / dff) / ((1.0 - r2) / df_resid);
        let dist = FisherSnedecor::new(dff, df_resid).map_err(|e| CoreError::Distribution(e.to_string()))?;
        (f, dist.sf(f))
    } else {
        (f64::INFINITY, 0.0)
    };

    tracing::debug!(lm, lm_p_value, "breusch-pagan");

    Ok(BreuschPaganResult {
        lm,
        lm_p_value,
        f_statistic,
        f_p_value,
        df,
        heteroskedastic: lm_p_value < alpha,
    })
}
