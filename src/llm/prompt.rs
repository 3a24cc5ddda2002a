//! Prompt construction for LLM requests.
//!
//! Builds the two-message prompt (instructions, then schema and question)
//! sent for every question.

use crate::db::Schema;
use crate::llm::types::Message;

/// System prompt template for the SQL generator.
const SYSTEM_PROMPT_TEMPLATE: &str = "You are a SQL expert for a {dialect} database. \
Given a natural-language question and the database schema, generate a single optimized SQL query that answers the question. \
Only output the SQL inside a ```sql code block. \
Never generate DDL or writes (INSERT, UPDATE, DELETE, DROP, ALTER, CREATE, TRUNCATE, GRANT). \
Use table and column names exactly as cased in the schema, \
and wrap every table and column reference in double quotes.";

/// Builds the system prompt for the given SQL dialect (e.g. "PostgreSQL").
pub fn build_system_prompt(dialect: &str) -> String {
    SYSTEM_PROMPT_TEMPLATE.replace("{dialect}", dialect)
}

/// Builds the user prompt carrying the schema and the question.
pub fn build_user_prompt(schema: &Schema, question: &str) -> String {
    format!(
        "Database Schema:\n{}\n\nQuestion: {}\n\nReturn only SQL in a single code block.",
        schema.format_for_llm(),
        question
    )
}

/// Builds the complete message list for an LLM request.
///
/// Always exactly two messages: system instructions, then the user prompt.
pub fn build_messages(schema: &Schema, question: &str, dialect: &str) -> Vec<Message> {
    vec![
        Message::system(build_system_prompt(dialect)),
        Message::user(build_user_prompt(schema, question)),
    ]
}
