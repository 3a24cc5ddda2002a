//! Integration tests for nlq-service.

pub mod common;
pub mod pipeline_test;
pub mod postgres_test;
pub mod server_test;
