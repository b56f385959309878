//! Query domain - commands, results and the executor contracts the cache wraps

mod command;
mod executor;
pub mod metadata;
mod parameters;
mod result;
mod unit_of_work;
mod value;

pub use command::Command;
pub use executor::{QueryExecutor, RowCursor};
pub use parameters::CacheParameters;
pub use result::{CachedResult, ColumnInfo, ResultShape, TableRow, TableRows};
pub use unit_of_work::UnitOfWorkListener;
pub use value::DbValue;

#[cfg(test)]
pub use executor::MockQueryExecutor;
#[cfg(test)]
pub use unit_of_work::MockUnitOfWorkListener;
