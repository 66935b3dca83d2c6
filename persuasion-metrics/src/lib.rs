pub mod aggregators;
pub mod regression;
pub mod statistical;

pub use aggregators::*;
pub use regression::*;
pub use statistical::*;
