//! Response parsing for LLM outputs.
//!
//! Extracts SQL from model responses that may wrap it in a markdown code block.

use regex::Regex;
use std::sync::OnceLock;

fn fenced_sql_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Infallible: the pattern is a literal.
    RE.get_or_init(|| Regex::new(r"(?is)```sql\b\s*(.*?)```").unwrap())
}

/// Returns the trimmed interior of the first ```sql fenced block, if any.
///
/// The language tag matches case-insensitively.
pub fn find_fenced_sql(text: &str) -> Option<&str> {
    fenced_sql_regex()
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
}

/// Extracts the SQL statement from a model response.
///
/// Uses the first fenced `sql` block when present; otherwise the whole
/// response, trimmed. No validation is done here: prose that is not SQL fails
/// later, at execution.
pub fn extract_sql(text: &str) -> String {
    find_fenced_sql(text).unwrap_or_else(|| text.trim()).to_string()
}
