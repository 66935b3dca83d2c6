pub mod engine;
pub mod executor;
pub mod partition;
pub mod pipeline;
pub mod tasks;

pub use engine::*;
pub use executor::*;
pub use partition::*;
pub use pipeline::*;
pub use tasks::*;
