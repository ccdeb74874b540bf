//! Query descriptions and SQL generation

pub mod builder;
pub mod order_queries;
pub mod types;

pub use builder::SelectBuilder;
pub use order_queries::{columns, HeaderProjection, OrderQuery};
pub use types::*;
