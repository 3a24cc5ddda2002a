//! Row cap enforcement.

use regex::Regex;
use std::sync::OnceLock;

/// Row cap applied when none is configured.
pub const DEFAULT_ROW_LIMIT: u32 = 200;

fn limit_keyword_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\blimit\b").unwrap())
}

/// Appends ` LIMIT <limit>;` unless the statement already mentions LIMIT.
///
/// Detection is a case-insensitive whole-word search, so a `limit` inside a
/// string literal or comment also counts as present.
pub fn enforce_row_limit(sql: &str, limit: u32) -> String {
    if limit_keyword_regex().is_match(sql) {
        return sql.to_string();
    }

    let body = sql.trim_end_matches(|c: char| c == ';' || c.is_whitespace());
    format!("{body} LIMIT {limit};")
}
