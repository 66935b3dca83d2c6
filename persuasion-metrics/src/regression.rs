//! Ordinary least squares and the diagnostics run around it: variance inflation
//! factors, the Breusch-Pagan heteroskedasticity test, HC3 robust covariance and the
//! series behind residual plots.

pub mod breusch_pagan;
pub mod diagnostics;
pub mod ols;
pub mod vif;

pub use breusch_pagan::*;
pub use diagnostics::*;
pub use ols::*;
pub use vif::*;
