//! Helpers for exercising the engine in tests: an in-memory recording store with failure injection, and SQLite
//! environment preparation for integration tests.
mod memory_store;
#[cfg(feature = "sqlite")]
pub mod prepare_env;

pub use memory_store::MemoryStore;
