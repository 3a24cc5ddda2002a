//! Database schema snapshot types.
//!
//! Represents the tables and columns of the connected database as seen at
//! introspection time.


/// A snapshot of the database schema.
///
/// Built fresh for every request; tables keep the order the backend reported.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    /// All user tables.
    pub tables: Vec<Table>,
}

impl Schema {
    /// Creates a new empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a schema from the given tables.
    pub fn with_tables(tables: Vec<Table>) -> Self {
        Self { tables }
    }

    /// Returns the names of all tables in snapshot order.
    pub fn table_names(&self) -> Vec<String> {
        self.tables.iter().map(|t| t.name.clone()).collect()
    }

    /// Formats the schema for inclusion in an LLM prompt.
    ///
    /// One line per table: `TABLE <name>: <column> <type>, ...`.
    pub fn format_for_llm(&self) -> String {
        self.tables
            .iter()
            .map(Table::format_for_llm)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Represents a database table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    /// Table name, in the exact case the database uses.
    pub name: String,

    /// Columns in ordinal order.
    pub columns: Vec<Column>,
}

impl Table {
    /// Creates a new table with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
        }
    }

    /// Adds a column.
    pub fn column(mut self, name: impl Into<String>, data_type: impl Into<String>) -> Self {
        self.columns.push(Column::new(name, data_type));
        self
    }

    fn format_for_llm(&self) -> String {
        if self.columns.is_empty() {
            return format!("TABLE {}: (no columns)", self.name);
        }

        let columns = self
            .columns
            .iter()
            .map(|c| format!("{} {}", c.name, c.data_type))
            .collect::<Vec<_>>()
            .join(", ");

        format!("TABLE {}: {}", self.name, columns)
    }
}

/// Represents a column in a table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Column {
    /// Column name.
    pub name: String,

    /// Human-readable type label (e.g., "integer", "character varying").
    pub data_type: String,
}

impl Column {
    /// Creates a new column with the given name and data type.
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
        }
    }
}
