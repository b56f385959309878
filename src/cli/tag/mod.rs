//! Tag command - prints a query prefixed with its cache annotation

use std::time::Duration;

use clap::Args;

use crate::config::AppConfig;
use crate::domain::query::Command;

#[derive(Args, Debug)]
pub struct TagArgs {
    /// Cache key the result is stored under
    #[arg(long)]
    pub key: String,

    /// Time to live in seconds, defaults to `cache.default_ttl_secs`
    #[arg(long)]
    pub ttl_secs: Option<u64>,

    /// Key suffix for this materialization of the query
    #[arg(long)]
    pub modifier: Option<String>,

    /// Query text
    pub sql: String,
}

pub fn run(args: TagArgs, config: &AppConfig) -> anyhow::Result<()> {
    println!("{}", annotate(&args, config)?);
    Ok(())
}

fn annotate(args: &TagArgs, config: &AppConfig) -> anyhow::Result<String> {
    if args.key.is_empty() {
        anyhow::bail!("--key must not be empty");
    }

    let ttl = args
        .ttl_secs
        .map(Duration::from_secs)
        .unwrap_or_else(|| config.cache.default_ttl());

    let mut command = Command::new(args.sql.as_str()).cacheable(&args.key, ttl);
    if let Some(modifier) = &args.modifier {
        command = command.with_modifier(modifier);
    }

    Ok(command.text().to_string())
}
