use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Method × principle matrix of median ratings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MedianMatrix {
    methods: Vec<String>,
    principles: Vec<String>,
    /// Row-major: `values[method][principle]`.
    values: Vec<Vec<f64>>,
}

impl MedianMatrix {
    pub fn new(methods: Vec<String>, principles: Vec<String>, values: Vec<Vec<f64>>) -> Result<Self> {
        if values.len() != methods.len() {
            return Err(CoreError::Validation(format!(
                "median matrix has {} rows for {} methods",
                values.len(),
                methods.len()
            )));
        }
        if let Some(row) = values.iter().find(|row| row.len() != principles.len()) {
            return Err(CoreError::Validation(format!(
                "median matrix row has {} cells for {} principles",
                row.len(),
                principles.len()
            )));
        }
        Ok(Self {
            methods,
            principles,
            values,
        })
    }

    pub fn methods(&self) -> &[String] {
        &self.methods
    }

    pub fn principles(&self) -> &[String] {
        &self.principles
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.values
    }

    pub fn get(&self, method: usize, principle: usize) -> Option<f64> {
        self.values.get(method).and_then(|row| row.get(principle)).copied()
    }

    pub fn get_by_name(&self, method: &str, principle: &str) -> Option<f64> {
        let m = self.methods.iter().position(|x| x == method)?;
        let p = self.principles.iter().position(|x| x == principle)?;
        self.get(m, p)
    }

    /// Smallest and largest entry, used for colour scaling.
    pub fn value_range(&self) -> Option<(f64, f64)> {
        let mut iter = self.values.iter().flatten().copied();
        let first = iter.next()?;
        Some(iter.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v))))
    }
}
