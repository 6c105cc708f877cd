//! Persistence and cache collaborators.
//!
//! [`Store`] is the document store every service reads and writes through,
//! with an in-memory implementation for tests and local runs and a
//! PostgreSQL one that keeps each document as JSONB. [`Cache`] is the
//! optional read-through accelerator; its failures never reach callers.

pub mod cache;
pub mod error;
pub mod memory;
pub mod postgres;
pub mod seed;
pub mod store;

pub use cache::{Cache, CacheExt, InMemoryCache, NoopCache, RedisCache};
pub use error::{Result, StoreError};
pub use memory::InMemoryStore;
pub use postgres::PostgresStore;
pub use seed::Seed;
pub use store::{CartUpdate, DecrementResult, OrderUpdate, PaymentSettlement, Store};
