use crate::domain::RatingTable;
use crate::error::Result;

/// Anything that can produce a ratings table (CSV file, in-memory fixture, ...).
pub trait TableSource {
    fn load(&self) -> Result<RatingTable>;
}

/// A pure analysis step over an immutable input.
pub trait Analyzer {
    type Input: ?Sized;
    type Output;

    fn analyze(&self, input: &Self::Input) -> Result<Self::Output>;
}
