//! Subcommand implementations

pub mod analyze;
pub mod blocks;
pub mod medians;
pub mod regression;
