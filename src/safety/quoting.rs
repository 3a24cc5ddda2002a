//! Identifier quoting for generated SQL.
//!
//! PostgreSQL folds unquoted identifiers to lower case, so a model that writes
//! `FROM Invoice` for a table created as `"Invoice"` gets "relation does not
//! exist". These passes double-quote the identifiers most likely to be
//! mixed-case. They are textual rewrites, not a SQL parse.

use regex::{Captures, Regex};
use std::sync::OnceLock;

/// Matches a single-quoted literal or a double-quoted identifier so callers
/// can copy it through untouched.
const SKIP: &str = r#"'(?:[^']|'')*'|"[^"]*""#;

fn qualified_name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        let pattern = format!(r#"("[^"]*"|\b[A-Za-z_]\w*)\.([A-Za-z_]\w*)\b|{SKIP}"#);
        Regex::new(&pattern).unwrap()
    })
}

fn quoted(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Quotes known table names after FROM/JOIN, then the right-hand side of
/// every `qualifier.identifier` pair.
///
/// Already-quoted identifiers and text inside string literals are left as
/// they are, so applying this twice gives the same result as applying it once.
pub fn quote_identifiers(sql: &str, known_tables: &[String]) -> String {
    let with_tables = quote_table_names(sql, known_tables);
    quote_qualified_names(&with_tables)
}

/// Replaces `FROM name` / `JOIN name` with the quoted schema spelling.
///
/// Names are matched case-insensitively unless another known table differs
/// from it only by case, in which case only the exact spelling matches.
fn quote_table_names(sql: &str, known_tables: &[String]) -> String {
    let mut tables: Vec<&String> = known_tables.iter().filter(|t| !t.is_empty()).collect();
    tables.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));

    let mut out = sql.to_string();
    for table in tables {
        let ambiguous = known_tables
            .iter()
            .any(|other| other != table && other.eq_ignore_ascii_case(table));
        let name = if ambiguous {
            regex::escape(table)
        } else {
            format!("(?i:{})", regex::escape(table))
        };

        let pattern = format!(r"\b((?i:from|join))(\s+){name}\b|{SKIP}");
        let Ok(re) = Regex::new(&pattern) else {
            continue;
        };

        out = re
            .replace_all(&out, |caps: &Captures| match (caps.get(1), caps.get(2)) {
                (Some(keyword), Some(space)) => {
                    format!("{}{}{}", keyword.as_str(), space.as_str(), quoted(table))
                }
                _ => caps[0].to_string(),
            })
            .into_owned();
    }
    out
}

/// Quotes the identifier after a dot: `i.total` becomes `i."total"`.
///
/// Repeats until nothing changes so chains such as `s.t.c` are fully quoted.
fn quote_qualified_names(sql: &str) -> String {
    let re = qualified_name_regex();
    let mut current = sql.to_string();

    loop {
        let next = re
            .replace_all(&current, |caps: &Captures| match (caps.get(1), caps.get(2)) {
                (Some(qualifier), Some(ident)) => {
                    format!("{}.\"{}\"", qualifier.as_str(), ident.as_str())
                }
                _ => caps[0].to_string(),
            })
            .into_owned();

        if next == current {
            return current;
        }
        current = next;
    }
}
