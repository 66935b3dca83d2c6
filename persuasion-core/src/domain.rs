pub mod schema;
pub mod config;
pub mod table;
pub mod block;
pub mod matrix;

pub use schema::*;
pub use config::*;
pub use table::*;
pub use block::*;
pub use matrix::*;
