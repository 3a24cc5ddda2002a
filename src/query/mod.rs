//! Query execution.
//!
//! Isolates running generated SQL from the orchestration around it.

pub mod executor;

pub use executor::{QueryExecutor, DEFAULT_QUERY_TIMEOUT};
