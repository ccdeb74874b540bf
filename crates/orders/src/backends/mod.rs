//! Storage Backends
//!
//! The storage collaborator trait and its two implementations: PostgreSQL via
//! sqlx, and an in-memory store used for tests, demos and benchmarks.

pub mod core;
pub mod memory;
pub mod postgres;

pub use self::core::*;
pub use memory::InMemoryOrderStore;
pub use postgres::{PostgresOrderStore, PostgresRow};
