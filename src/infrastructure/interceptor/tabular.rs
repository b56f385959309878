//! Capture and replay of executor results

use async_trait::async_trait;

use crate::domain::query::{CachedResult, ColumnInfo, DbValue, RowCursor, TableRow, TableRows};
use crate::domain::DomainError;

/// Reads every row of `cursor` into a [`CachedResult::Rows`]
///
/// The cursor is closed whether or not reading succeeds. A read failure
/// propagates and nothing is captured.
pub async fn capture_rows(mut cursor: Box<dyn RowCursor>) -> Result<CachedResult, DomainError> {
    let mut table = TableRows::new(cursor.columns().to_vec());

    let read = read_rows(cursor.as_mut(), &mut table).await;
    let closed = cursor.close().await;

    read?;
    closed?;

    Ok(CachedResult::Rows(Some(table)))
}

async fn read_rows(cursor: &mut dyn RowCursor, table: &mut TableRows) -> Result<(), DomainError> {
    while cursor.advance().await? {
        table.push(TableRow::new(cursor.current_values()?));
    }
    Ok(())
}

pub fn capture_scalar(value: DbValue) -> CachedResult {
    CachedResult::Scalar(value)
}

pub fn capture_affected(count: u64) -> CachedResult {
    CachedResult::AffectedRows(count)
}

/// Rebuilds a cursor from a captured row set
pub fn replay_rows(key: &str, result: CachedResult) -> Result<Box<dyn RowCursor>, DomainError> {
    match result {
        CachedResult::Rows(table) => Ok(Box::new(ReplayCursor::new(table.unwrap_or_default()))),
        other => Err(DomainError::shape_mismatch(key, "rows", other.shape().as_str())),
    }
}

pub fn replay_scalar(key: &str, result: CachedResult) -> Result<DbValue, DomainError> {
    match result {
        CachedResult::Scalar(value) => Ok(value),
        other => Err(DomainError::shape_mismatch(key, "scalar", other.shape().as_str())),
    }
}

pub fn replay_affected(key: &str, result: CachedResult) -> Result<u64, DomainError> {
    match result {
        CachedResult::AffectedRows(count) => Ok(count),
        other => Err(DomainError::shape_mismatch(
            key,
            "affected_rows",
            other.shape().as_str(),
        )),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Position {
    BeforeFirst,
    At(usize),
    Exhausted,
}

/// Cursor over captured rows, indistinguishable from a live one to callers
#[derive(Debug)]
pub struct ReplayCursor {
    table: TableRows,
    position: Position,
    closed: bool,
}

impl ReplayCursor {
    pub fn new(table: TableRows) -> Self {
        Self {
            table,
            position: Position::BeforeFirst,
            closed: false,
        }
    }

    pub fn row_count(&self) -> usize {
        self.table.row_count()
    }

    fn ensure_open(&self) -> Result<(), DomainError> {
        if self.closed {
            return Err(DomainError::cursor("Cursor is closed"));
        }
        Ok(())
    }
}

#[async_trait]
impl RowCursor for ReplayCursor {
    fn columns(&self) -> &[ColumnInfo] {
        &self.table.columns
    }

    async fn advance(&mut self) -> Result<bool, DomainError> {
        self.ensure_open()?;

        let next = match self.position {
            Position::BeforeFirst => 0,
            Position::At(index) => index + 1,
            Position::Exhausted => return Ok(false),
        };

        if next < self.table.row_count() {
            self.position = Position::At(next);
            Ok(true)
        } else {
            self.position = Position::Exhausted;
            Ok(false)
        }
    }

    fn get(&self, ordinal: usize) -> Result<&DbValue, DomainError> {
        self.ensure_open()?;

        let row = match self.position {
            Position::At(index) => &self.table.rows[index],
            Position::BeforeFirst => {
                return Err(DomainError::cursor("No current row, call advance first"));
            }
            Position::Exhausted => return Err(DomainError::cursor("No current row, rows exhausted")),
        };

        row.get(ordinal).ok_or_else(|| {
            DomainError::cursor(format!(
                "Ordinal {} out of range for {} columns",
                ordinal,
                row.field_count()
            ))
        })
    }

    async fn close(&mut self) -> Result<(), DomainError> {
        self.closed = true;
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}
