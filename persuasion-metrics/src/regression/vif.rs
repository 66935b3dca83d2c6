use nalgebra::DVector;
use persuasion_core::{CoreError, Result};
use serde::{Deserialize, Serialize};

use super::ols::{least_squares, r_squared, DesignMatrix, INTERCEPT_NAME};

/// Below this `1 - R²` a column is treated as an exact linear combination of the others.
const COLLINEARITY_TOLERANCE: f64 = 1e-10;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VifEntry {
    pub name: String,
    /// `f64::INFINITY` for perfectly collinear columns (serialized as `null`).
    pub vif: f64,
    pub r_squared: f64,
    /// VIF above the configured threshold.
    pub flagged: bool,
    pub perfectly_collinear: bool,
}

/// Variance inflation factor for every column of `design`, the intercept included.
///
/// Each column is regressed on all others; `VIF = 1 / (1 - R²)`. R² is centered when
/// the remaining columns contain a constant.
pub fn variance_inflation_factors(design: &DesignMatrix, threshold: f64) -> Result<Vec<VifEntry>> {
    if design.nrows() <= design.ncols() {
        return Err(CoreError::InsufficientData(format!(
            "{} observations cannot identify {} columns",
            design.nrows(),
            design.ncols()
        )));
    }

    let mut entries = Vec::with_capacity(design.ncols());

    for j in 0..design.ncols() {
        let name = &design.names()[j];

        let target = DVector::from_vec(design.column(j));
        let others = design.without_column(j);

        let r2 = if others.ncols() == 0 {
            Some(0.0)
        } else {
            let beta = least_squares(others.matrix(), &target)?;
            let residuals = &target - others.matrix() * beta;
            r_squared(&target, &residuals, others.has_constant())
        };

        // A column with no variance of its own is absorbed by the intercept.
        let r2 = r2.map_or(1.0, |r| r.clamp(0.0, 1.0));
        let tolerance = 1.0 - r2;
        let perfectly_collinear = tolerance < COLLINEARITY_TOLERANCE;
        let vif = if perfectly_collinear {
            f64::INFINITY
        } else {
            1.0 / tolerance
        };

        if perfectly_collinear && name != INTERCEPT_NAME {
            tracing::warn!(column = %name, "column is perfectly collinear with the others");
        }

        entries.push(VifEntry {
            name: name.clone(),
            vif,
            r_squared: r2,
            flagged: vif > threshold,
            perfectly_collinear,
        });
    }

    Ok(entries)
}
