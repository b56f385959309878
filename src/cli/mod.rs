//! CLI module for the query result cache
//!
//! - `tag`: annotate a query as cacheable
//! - `inspect`: show the cache hints carried by a query
//! - `demo`: run a tagged query against an in-memory executor

pub mod demo;
pub mod inspect;
pub mod tag;

use clap::{Parser, Subcommand};

use crate::config::AppConfig;
use crate::infrastructure::logging;

/// Query result cache - cache hints in SQL comments
#[derive(Parser)]
#[command(name = "query-cache")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Prefix a query with a cache annotation
    Tag(tag::TagArgs),

    /// Decode the cache annotation of a query
    Inspect(inspect::InspectArgs),

    /// Execute a tagged query twice and report cache hits
    Demo,
}

/// Loads `.env` and the configuration, then initializes logging
pub fn bootstrap() -> AppConfig {
    dotenvy::dotenv().ok();

    let config = AppConfig::load().unwrap_or_default();
    logging::init_logging(&config.logging);

    config
}
