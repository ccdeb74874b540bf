//! # jpashop-orders: Order Collection Retrieval
//!
//! Loads orders together with their one-to-many lines using one of five
//! strategies, each trading query count, duplicated payload and pagination
//! support differently:
//!
//! | Strategy | Queries | Paginates |
//! |---|---|---|
//! | [`Strategy::FetchJoin`] | 1 | no |
//! | [`Strategy::ToOneFetch`] | 1 + ceil(N / batch) | yes |
//! | [`Strategy::DtoPerOrder`] | 1 + N | yes |
//! | [`Strategy::DtoBatched`] | 1 + 1 | yes |
//! | [`Strategy::FlatProjection`] | 1 | in memory, opt-in |
//!
//! Every strategy returns the same orders with the same lines in the same
//! order. [`OrderRetriever::list_orders`] lets the [`QueryPlanner`] choose;
//! [`OrderRetriever::retrieve`] accepts an explicit strategy, a deadline and
//! a cancellation token and reports [`RetrievalStats`].
//!
//! Storage is reached through the [`OrderStore`] trait; a PostgreSQL store
//! and an in-memory store are provided.

pub mod backends;
pub mod config;
pub mod error;
pub mod loading;
pub mod logging;
pub mod model;
pub mod query;
pub mod seeding;

pub use backends::{DatabaseRow, DatabaseRowExt, DatabaseValue, InMemoryOrderStore, OrderStore, PostgresOrderStore};
pub use config::{ConfigError, OrderQueryConfig};
pub use error::{OrmError, OrmResult};
pub use loading::{
    BatchConfig, BatchLoader, OrderRetriever, QueryPlanner, Retrieval, RetrievalContext,
    RetrievalRequest, RetrievalStats, Strategy,
};
pub use logging::{init_logging, LoggingConfig};
pub use model::*;
