//! Storage backends for the matching engine.
//!
//! The default (and currently only) backend is SQLite. A backend is anything that implements the traits in
//! [`crate::traits`]; the serving process may substitute its own.
#[cfg(feature = "sqlite")]
pub mod sqlite;
