//! Query executor and row cursor contracts

use std::fmt::Debug;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use super::command::Command;
use super::result::ColumnInfo;
use super::value::DbValue;
use crate::domain::DomainError;

/// Sequential, column-addressable cursor over a query's rows
///
/// A fresh cursor is positioned before the first row; call
/// [`RowCursor::advance`] before reading.
#[async_trait]
pub trait RowCursor: Send + Debug {
    /// Column schema in ordinal order
    fn columns(&self) -> &[ColumnInfo];

    fn field_count(&self) -> usize {
        self.columns().len()
    }

    /// Moves to the next row, `false` once the rows are exhausted
    async fn advance(&mut self) -> Result<bool, DomainError>;

    /// Value of the current row at `ordinal`
    fn get(&self, ordinal: usize) -> Result<&DbValue, DomainError>;

    /// Value of the current row for the named column
    fn get_by_name(&self, name: &str) -> Result<&DbValue, DomainError> {
        let columns = self.columns();
        let ordinal = columns
            .iter()
            .find(|c| c.name == name)
            .or_else(|| columns.iter().find(|c| c.name.eq_ignore_ascii_case(name)))
            .map(|c| c.ordinal)
            .ok_or_else(|| DomainError::not_found(format!("Column '{}' not found", name)))?;

        self.get(ordinal)
    }

    /// Every value of the current row
    fn current_values(&self) -> Result<Vec<DbValue>, DomainError> {
        (0..self.field_count())
            .map(|ordinal| self.get(ordinal).cloned())
            .collect()
    }

    /// Releases the underlying resources. Closing twice is a no-op.
    async fn close(&mut self) -> Result<(), DomainError>;

    fn is_closed(&self) -> bool;
}

/// Executes commands against a database
///
/// Errors are executor-defined and pass through caching layers unchanged.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Runs a row-returning query
    async fn execute_reader(&self, command: &Command) -> Result<Box<dyn RowCursor>, DomainError>;

    /// Runs a query returning a single value (first column of the first row)
    async fn execute_scalar(&self, command: &Command) -> Result<DbValue, DomainError>;

    /// Runs a statement returning the number of affected rows
    async fn execute_non_query(&self, command: &Command) -> Result<u64, DomainError>;
}
