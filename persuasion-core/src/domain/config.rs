use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use super::schema::TableSchema;
use crate::error::Result;

pub const DEFAULT_BLOCK_SIZE: usize = 30;
pub const DEFAULT_ALPHA: f64 = 0.05;
pub const DEFAULT_VIF_THRESHOLD: f64 = 5.0;

// ===== Rating Scale =====

/// Bounds of the rating scale. A principle rated constantly at `min` is likely not
/// relevant for a method, one rated constantly at `max` likely especially relevant.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Validate)]
#[validate(schema(function = "validate_scale"))]
pub struct RatingScale {
    pub min: f64,
    pub max: f64,
}

impl Default for RatingScale {
    fn default() -> Self {
        Self { min: 0.0, max: 5.0 }
    }
}

fn validate_scale(scale: &RatingScale) -> std::result::Result<(), ValidationError> {
    if !scale.min.is_finite() || !scale.max.is_finite() || scale.min >= scale.max {
        let mut err = ValidationError::new("scale_bounds");
        err.message = Some("rating scale minimum must be below its maximum".into());
        return Err(err);
    }
    Ok(())
}

// ===== Analysis Configuration =====

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Rows per method block.
    #[validate(range(min = 1))]
    pub block_size: usize,
    /// Zero-based data row where the first block starts.
    pub start_row: usize,
    /// Family-wise significance level.
    #[validate(range(exclusive_min = 0.0, exclusive_max = 1.0))]
    pub alpha: f64,
    #[validate(range(min = 1.0))]
    pub vif_threshold: f64,
    /// Check that the method label column agrees with the positional blocks.
    pub validate_labels: bool,
    #[validate(nested)]
    pub scale: RatingScale,
    pub schema: TableSchema,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            start_row: 0,
            alpha: DEFAULT_ALPHA,
            vif_threshold: DEFAULT_VIF_THRESHOLD,
            validate_labels: true,
            scale: RatingScale::default(),
            schema: TableSchema::default(),
        }
    }
}

impl AnalysisConfig {
    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size;
        self
    }

    pub fn with_start_row(mut self, start_row: usize) -> Self {
        self.start_row = start_row;
        self
    }

    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn with_label_validation(mut self, enabled: bool) -> Self {
        self.validate_labels = enabled;
        self
    }

    /// Validate and hand back the config, mapping validator errors into `CoreError`.
    pub fn validated(self) -> Result<Self> {
        self.validate()?;
        Ok(self)
    }
}
