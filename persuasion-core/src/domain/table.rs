use serde::{Deserialize, Serialize};

use super::schema::DEFAULT_RATE_COLUMN;
use crate::error::{CoreError, Result};

/// One survey row: a score per principle, the (sparse) method label and the rate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RatingRow {
    pub scores: Vec<f64>,
    pub method: Option<String>,
    pub compromise_rate: Option<f64>,
    /// Sheet row the values were read from; `None` for rows built in memory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sheet_row: Option<usize>,
}

impl RatingRow {
    pub fn new(scores: Vec<f64>) -> Self {
        Self {
            scores,
            method: None,
            compromise_rate: None,
            sheet_row: None,
        }
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    pub fn with_rate(mut self, rate: f64) -> Self {
        self.compromise_rate = Some(rate);
        self
    }

    pub fn at_sheet_row(mut self, row: usize) -> Self {
        self.sheet_row = Some(row);
        self
    }
}

/// In-memory ratings table. Rows keep their input order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RatingTable {
    principles: Vec<String>,
    rows: Vec<RatingRow>,
    #[serde(default)]
    rate_column: Option<String>,
}

impl RatingTable {
    pub fn new(principles: Vec<String>, rows: Vec<RatingRow>) -> Result<Self> {
        if principles.is_empty() {
            return Err(CoreError::Validation("table needs at least one principle column".to_string()));
        }

        for (i, row) in rows.iter().enumerate() {
            if row.scores.len() != principles.len() {
                return Err(CoreError::Validation(format!(
                    "row {} has {} scores, expected {}",
                    i,
                    row.scores.len(),
                    principles.len()
                )));
            }
            if let Some(pos) = row.scores.iter().position(|s| !s.is_finite()) {
                return Err(CoreError::Validation(format!(
                    "row {} has a non-finite score for '{}'",
                    i, principles[pos]
                )));
            }
            if let Some(rate) = row.compromise_rate {
                if !rate.is_finite() {
                    return Err(CoreError::Validation(format!("row {} has a non-finite compromise rate", i)));
                }
            }
        }

        Ok(Self {
            principles,
            rows,
            rate_column: None,
        })
    }

    /// Header of the column the compromise rates were read from.
    pub fn with_rate_column(mut self, name: impl Into<String>) -> Self {
        self.rate_column = Some(name.into());
        self
    }

    pub fn rate_column(&self) -> &str {
        self.rate_column.as_deref().unwrap_or(DEFAULT_RATE_COLUMN)
    }

    pub fn principles(&self) -> &[String] {
        &self.principles
    }

    pub fn rows(&self) -> &[RatingRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Sheet row of data row `index`. Rows without a recorded origin count from
    /// row 2, below the header.
    pub fn sheet_row(&self, index: usize) -> usize {
        self.rows
            .get(index)
            .and_then(|r| r.sheet_row)
            .unwrap_or(index + 2)
    }

    /// All scores of one principle, in row order.
    pub fn column(&self, principle: usize) -> Vec<f64> {
        self.rows.iter().map(|r| r.scores[principle]).collect()
    }

    pub fn columns(&self) -> Vec<Vec<f64>> {
        (0..self.principles.len()).map(|j| self.column(j)).collect()
    }

    /// Distinct non-empty method labels in first-occurrence order.
    pub fn method_labels(&self) -> Vec<String> {
        let mut labels: Vec<String> = Vec::new();
        for label in self.rows.iter().filter_map(|r| r.method.as_deref()) {
            let label = label.trim();
            if !label.is_empty() && !labels.iter().any(|l| l == label) {
                labels.push(label.to_string());
            }
        }
        labels
    }

    /// Method label per row with blanks filled from the nearest labelled row above.
    pub fn forward_filled_labels(&self) -> Vec<Option<String>> {
        let mut current: Option<String> = None;
        self.rows
            .iter()
            .map(|r| {
                if let Some(label) = r.method.as_deref().map(str::trim).filter(|l| !l.is_empty()) {
                    current = Some(label.to_string());
                }
                current.clone()
            })
            .collect()
    }

    /// Compromise rate per row; every row must carry one.
    pub fn compromise_rates(&self) -> Result<Vec<f64>> {
        self.rows
            .iter()
            .enumerate()
            .map(|(i, r)| {
                r.compromise_rate.ok_or_else(|| {
                    CoreError::Validation(format!("row {} has no compromise rate", i))
                })
            })
            .collect()
    }
}
