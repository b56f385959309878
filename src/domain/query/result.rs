//! Captured query results

use serde::{Deserialize, Serialize};

use super::value::DbValue;

/// Column description captured from a row cursor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub ordinal: usize,
    pub name: String,
    /// Type name reported by the database, e.g. `nvarchar`
    pub db_type_name: String,
    /// Value type name, see [`DbValue::type_name`]
    pub type_name: String,
}

impl ColumnInfo {
    pub fn new(
        ordinal: usize,
        name: impl Into<String>,
        db_type_name: impl Into<String>,
        type_name: impl Into<String>,
    ) -> Self {
        Self {
            ordinal,
            name: name.into(),
            db_type_name: db_type_name.into(),
            type_name: type_name.into(),
        }
    }
}

/// One row of column values in ordinal order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRow {
    pub values: Vec<DbValue>,
}

impl TableRow {
    pub fn new(values: Vec<DbValue>) -> Self {
        Self { values }
    }

    pub fn field_count(&self) -> usize {
        self.values.len()
    }

    pub fn get(&self, ordinal: usize) -> Option<&DbValue> {
        self.values.get(ordinal)
    }
}

/// Column schema plus every row read from a cursor
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableRows {
    pub columns: Vec<ColumnInfo>,
    pub rows: Vec<TableRow>,
}

impl TableRows {
    pub fn new(columns: Vec<ColumnInfo>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn with_rows(mut self, rows: Vec<TableRow>) -> Self {
        self.rows = rows;
        self
    }

    pub fn push(&mut self, row: TableRow) {
        self.rows.push(row);
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// A stored query result; exactly one shape per instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", content = "data", rename_all = "snake_case")]
pub enum CachedResult {
    /// Row-set result; `None` marks an absent result
    Rows(Option<TableRows>),
    /// Single value; `DbValue::Null` for a null scalar
    Scalar(DbValue),
    /// Affected-row count of a non-query command
    AffectedRows(u64),
}

impl CachedResult {
    pub fn shape(&self) -> ResultShape {
        match self {
            CachedResult::Rows(_) => ResultShape::Rows,
            CachedResult::Scalar(_) => ResultShape::Scalar,
            CachedResult::AffectedRows(_) => ResultShape::AffectedRows,
        }
    }
}

/// Result shape a command produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultShape {
    Rows,
    Scalar,
    AffectedRows,
}

impl ResultShape {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResultShape::Rows => "rows",
            ResultShape::Scalar => "scalar",
            ResultShape::AffectedRows => "affected_rows",
        }
    }
}

impl std::fmt::Display for ResultShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
