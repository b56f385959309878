//! Executor infrastructure - in-memory sample executor

mod in_memory;

pub use in_memory::InMemoryQueryExecutor;
