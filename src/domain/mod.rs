pub mod cache;
pub mod error;
pub mod query;

pub use cache::{CacheExt, CacheKeyBuilder, QueryCache};
pub use error::DomainError;
pub use query::{
    CacheParameters, CachedResult, ColumnInfo, Command, DbValue, QueryExecutor, ResultShape,
    RowCursor, TableRow, TableRows, UnitOfWorkListener,
};
