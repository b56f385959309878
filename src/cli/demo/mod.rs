//! Demo command - runs a tagged query against an in-memory executor

use std::sync::Arc;

use crate::config::AppConfig;
use crate::domain::cache::QueryCache;
use crate::domain::query::{ColumnInfo, Command, DbValue, QueryExecutor, TableRow, TableRows};
use crate::infrastructure::cache::spawn_sweeper;
use crate::infrastructure::executor::InMemoryQueryExecutor;
use crate::infrastructure::interceptor::{CachingExecutor, FlushPendingOnCommit, UnitOfWorkHooks};

const BLOGS_SQL: &str = "SELECT Id, Name FROM Blogs";

/// Run the demo and print one line per execution
pub async fn run(config: &AppConfig) -> anyhow::Result<()> {
    for line in run_demo(config).await? {
        println!("{}", line);
    }
    Ok(())
}

async fn run_demo(config: &AppConfig) -> anyhow::Result<Vec<String>> {
    let cache: Arc<dyn QueryCache> = Arc::new(config.cache.build_cache()?);
    let sweeper = config
        .cache
        .sweep_interval()
        .map(|interval| spawn_sweeper(cache.clone(), interval));

    let executor = CachingExecutor::new(
        InMemoryQueryExecutor::new().with_rows(BLOGS_SQL, sample_blogs()),
        cache.clone(),
    );
    let hooks = UnitOfWorkHooks::new().with_listener(Arc::new(FlushPendingOnCommit::new(cache.clone())));

    let scope = config.cache.key_builder().segment("blogs");
    let command = Command::new(BLOGS_SQL)
        .cacheable(&scope.prefix(), config.cache.default_ttl())
        .with_modifier("list");

    let mut lines = Vec::new();

    for run in 1..=2 {
        lines.push(execute(&executor, &command, &format!("run {}", run)).await?);
    }

    cache.add_pending_removal(&scope.prefix()).await?;
    hooks.notify_committed(1).await;
    lines.push(execute(&executor, &command, "after commit").await?);

    if let Some(sweeper) = sweeper {
        sweeper.abort();
    }

    Ok(lines)
}

async fn execute(
    executor: &CachingExecutor<InMemoryQueryExecutor>,
    command: &Command,
    label: &str,
) -> anyhow::Result<String> {
    let calls = executor.inner().call_count();

    let mut cursor = executor.execute_reader(command).await?;
    let mut rows = 0;
    while cursor.advance().await? {
        rows += 1;
    }
    cursor.close().await?;

    let outcome = if executor.inner().call_count() == calls {
        "cache hit"
    } else {
        "cache miss"
    };

    Ok(format!("{}: {} rows, {}", label, rows, outcome))
}

fn sample_blogs() -> TableRows {
    TableRows::new(vec![
        ColumnInfo::new(0, "Id", "int", "int"),
        ColumnInfo::new(1, "Name", "nvarchar", "text"),
    ])
    .with_rows(vec![
        TableRow::new(vec![DbValue::Int(1), DbValue::from("Rust in production")]),
        TableRow::new(vec![DbValue::Int(2), DbValue::from("Caching query results")]),
        TableRow::new(vec![DbValue::Int(3), DbValue::Null]),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_demo_reports_hit_then_miss_after_commit() {
        let lines = run_demo(&AppConfig::default()).await.unwrap();

        assert_eq!(
            lines,
            vec![
                "run 1: 3 rows, cache miss".to_string(),
                "run 2: 3 rows, cache hit".to_string(),
                "after commit: 3 rows, cache miss".to_string(),
            ]
        );
    }
}
