use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CoreError, Result};

/// Header name of the compromise-rate column in the survey workbook.
pub const DEFAULT_RATE_COLUMN: &str = "Kompromittierrate";

/// Number of persuasion principles rated per row.
pub const DEFAULT_PRINCIPLE_COUNT: usize = 6;

/// Zero-based position of the method label column in the survey workbook.
pub const DEFAULT_METHOD_COLUMN: usize = 7;

/// Reference to a column either by header name or by zero-based position.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(untagged)]
pub enum ColumnRef {
    Index(usize),
    Name(String),
}

impl ColumnRef {
    pub fn resolve(&self, headers: &[String]) -> Result<usize> {
        match self {
            ColumnRef::Index(idx) => {
                if *idx < headers.len() {
                    Ok(*idx)
                } else {
                    Err(CoreError::Schema(format!(
                        "column index {} out of range ({} columns in header)",
                        idx,
                        headers.len()
                    )))
                }
            }
            ColumnRef::Name(name) => headers
                .iter()
                .position(|h| h.trim() == name.trim())
                .ok_or_else(|| CoreError::Schema(format!("column '{}' not found in header", name))),
        }
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnRef::Index(idx) => write!(f, "#{}", idx),
            ColumnRef::Name(name) => write!(f, "{}", name),
        }
    }
}

impl From<usize> for ColumnRef {
    fn from(idx: usize) -> Self {
        ColumnRef::Index(idx)
    }
}

impl From<&str> for ColumnRef {
    fn from(name: &str) -> Self {
        ColumnRef::Name(name.to_string())
    }
}

/// Which input columns carry the principle scores, the method label and the rate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TableSchema {
    pub principles: Vec<ColumnRef>,
    pub method: ColumnRef,
    pub compromise_rate: ColumnRef,
}

impl Default for TableSchema {
    fn default() -> Self {
        Self {
            principles: (0..DEFAULT_PRINCIPLE_COUNT).map(ColumnRef::Index).collect(),
            method: ColumnRef::Index(DEFAULT_METHOD_COLUMN),
            compromise_rate: ColumnRef::Name(DEFAULT_RATE_COLUMN.to_string()),
        }
    }
}

impl TableSchema {
    /// Resolve every reference against a header row. Done once at load time.
    pub fn resolve(&self, headers: &[String]) -> Result<ResolvedSchema> {
        if self.principles.len() < 2 {
            return Err(CoreError::Schema(format!(
                "at least two principle columns are required, got {}",
                self.principles.len()
            )));
        }

        let principle_indices = self
            .principles
            .iter()
            .map(|c| c.resolve(headers))
            .collect::<Result<Vec<_>>>()?;
        let method_index = self.method.resolve(headers)?;
        let rate_index = self.compromise_rate.resolve(headers)?;

        for (pos, idx) in principle_indices.iter().enumerate() {
            if principle_indices[..pos].contains(idx) {
                return Err(CoreError::Schema(format!(
                    "principle column '{}' listed twice",
                    headers[*idx]
                )));
            }
            if *idx == method_index || *idx == rate_index {
                return Err(CoreError::Schema(format!(
                    "column '{}' cannot be both a principle and the method/rate column",
                    headers[*idx]
                )));
            }
        }
        if method_index == rate_index {
            return Err(CoreError::Schema(format!(
                "column '{}' cannot be both the method and the rate column",
                headers[method_index]
            )));
        }

        Ok(ResolvedSchema {
            principle_names: principle_indices
                .iter()
                .map(|&i| headers[i].trim().to_string())
                .collect(),
            principle_indices,
            method_index,
            rate_index,
        })
    }
}

/// A schema bound to concrete header positions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSchema {
    pub principle_indices: Vec<usize>,
    pub principle_names: Vec<String>,
    pub method_index: usize,
    pub rate_index: usize,
}
