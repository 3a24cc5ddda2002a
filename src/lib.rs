//! nlq - natural-language questions answered with SQL against a live database.
//!
//! The library holds the whole pipeline so the binary stays a thin entrypoint
//! and integration tests can drive the server directly.

pub mod app;
pub mod chat;
pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod llm;
pub mod logging;
pub mod query;
pub mod safety;
pub mod server;
