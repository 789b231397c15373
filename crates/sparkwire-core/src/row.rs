//! Rows, column descriptions and materialized result tables.

use crate::value::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Column metadata shared across all rows in a result set.
#[derive(Debug, Clone, Default)]
pub struct ColumnInfo {
    /// Column names in order
    names: Vec<String>,
    /// Name -> index mapping for O(1) lookup
    name_to_index: HashMap<String, usize>,
}

impl ColumnInfo {
    /// Create new column info from a list of column names.
    pub fn new(names: Vec<String>) -> Self {
        let name_to_index = names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect();
        Self {
            names,
            name_to_index,
        }
    }

    /// Get the number of columns.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Check if there are no columns.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Get the index of a column by name.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.name_to_index.get(name).copied()
    }

    /// Get all column names.
    pub fn names(&self) -> &[String] {
        &self.names
    }
}

/// Description of one result column, as reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDesc {
    pub name: String,
    /// Backend type name, e.g. `INT_TYPE`
    pub type_name: String,
    /// 1-based position in the result set
    pub position: i32,
    pub comment: Option<String>,
}

/// A single row returned from a query.
#[derive(Debug, Clone)]
pub struct Row {
    /// Column values in order
    values: Vec<Value>,
    /// Shared column metadata
    columns: Arc<ColumnInfo>,
}

impl Row {
    /// Create a new row with shared column metadata.
    pub fn with_columns(columns: Arc<ColumnInfo>, values: Vec<Value>) -> Self {
        Self { values, columns }
    }

    /// Get the number of columns in this row.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if this row is empty.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Get a value by column index.
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Get a value by column name.
    pub fn get_by_name(&self, name: &str) -> Option<&Value> {
        self.columns.index_of(name).and_then(|i| self.values.get(i))
    }

    /// Get all values in column order.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Consume the row and return its values.
    pub fn into_values(self) -> Vec<Value> {
        self.values
    }
}

/// A materialized tabular result.
///
/// Transports without a structured row channel return [`Table::empty`].
#[derive(Debug, Clone, Default)]
pub struct Table {
    columns: Arc<ColumnInfo>,
    rows: Vec<Row>,
}

impl Table {
    /// The empty placeholder table.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a table from column names and rows of values.
    pub fn from_values(column_names: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        let columns = Arc::new(ColumnInfo::new(column_names));
        let rows = rows
            .into_iter()
            .map(|values| Row::with_columns(Arc::clone(&columns), values))
            .collect();
        Self { columns, rows }
    }

    pub fn column_names(&self) -> &[String] {
        self.columns.names()
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Status returned for every successful statement.
pub const STATUS_OK: &str = "OK";

/// The `(status, table)` pair handed back to callers.
#[derive(Debug, Clone)]
pub struct ExecuteResult {
    pub status: String,
    pub table: Table,
}

impl ExecuteResult {
    /// A successful result carrying `table`.
    pub fn ok(table: Table) -> Self {
        Self {
            status: STATUS_OK.to_string(),
            table,
        }
    }
}
