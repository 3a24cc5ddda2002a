//! SQL normalization applied to model output before execution.
//!
//! Caps the number of returned rows and quotes identifiers so mixed-case
//! names resolve. Both steps are textual heuristics, not a SQL parse.

mod limit;
mod quoting;

pub use limit::{enforce_row_limit, DEFAULT_ROW_LIMIT};
pub use quoting::quote_identifiers;

/// Rewrites candidate SQL into the form that is executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SqlNormalizer {
    row_limit: u32,
}

impl SqlNormalizer {
    pub fn new(row_limit: u32) -> Self {
        Self { row_limit }
    }

    pub fn row_limit(&self) -> u32 {
        self.row_limit
    }

    /// Applies the row cap, then identifier quoting against `known_tables`.
    pub fn normalize(&self, sql: &str, known_tables: &[String]) -> String {
        let limited = enforce_row_limit(sql, self.row_limit);
        quote_identifiers(&limited, known_tables)
    }
}

impl Default for SqlNormalizer {
    fn default() -> Self {
        Self::new(DEFAULT_ROW_LIMIT)
    }
}
