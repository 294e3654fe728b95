//! WhiteRoom: session stores.
//!
//! `KeyValueStore` implementations for the session registry: an in-process
//! store for single-node deployments and tests, and a PostgreSQL store whose
//! rows expire alongside their TTL.

pub mod memory;
pub mod pg_store;

pub use memory::InMemoryKeyValueStore;
pub use pg_store::PgKeyValueStore;
