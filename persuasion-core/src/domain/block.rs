use serde::{Deserialize, Serialize};

use super::config::RatingScale;

/// Contiguous rows of the ratings table that belong to one method.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MethodBlock {
    pub index: usize,
    pub method: String,
    /// Zero-based index of the first data row.
    pub start_row: usize,
    /// First and last sheet row of the block, inclusive.
    pub sheet_rows: (usize, usize),
    pub principles: Vec<String>,
    /// Scores stored column-major: `columns[principle][row]`.
    pub columns: Vec<Vec<f64>>,
}

impl MethodBlock {
    pub fn len(&self) -> usize {
        self.columns.first().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn column(&self, principle: usize) -> &[f64] {
        &self.columns[principle]
    }
}

/// What a constant rating says about a principle's relevance.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RelevanceHint {
    /// Constantly rated at the scale minimum.
    NotRelevant,
    /// Constantly rated at the scale maximum.
    EspeciallyRelevant,
    None,
}

impl RelevanceHint {
    pub fn for_constant(value: f64, scale: &RatingScale) -> Self {
        if value == scale.min {
            RelevanceHint::NotRelevant
        } else if value == scale.max {
            RelevanceHint::EspeciallyRelevant
        } else {
            RelevanceHint::None
        }
    }

    pub fn describe(&self) -> Option<&'static str> {
        match self {
            RelevanceHint::NotRelevant => Some("likely not relevant"),
            RelevanceHint::EspeciallyRelevant => Some("likely especially relevant"),
            RelevanceHint::None => None,
        }
    }
}

/// A principle that received the same rating on every row of a block.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConstantColumn {
    pub index: usize,
    pub name: String,
    pub value: f64,
    pub hint: RelevanceHint,
}

/// Splits a block's principles into constant columns and columns eligible for testing.
pub fn split_constant_columns(block: &MethodBlock, scale: &RatingScale) -> (Vec<ConstantColumn>, Vec<usize>) {
    let mut constant = Vec::new();
    let mut tested = Vec::new();

    for (index, values) in block.columns.iter().enumerate() {
        match values.first() {
            Some(&first) if values.iter().all(|&v| v == first) => constant.push(ConstantColumn {
                index,
                name: block.principles[index].clone(),
                value: first,
                hint: RelevanceHint::for_constant(first, scale),
            }),
            _ => tested.push(index),
        }
    }

    (constant, tested)
}
