//! Inspect command - prints the cache hints decoded from a query

use clap::Args;

use crate::domain::query::metadata::{self, timespan};

#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Query text, annotations included
    pub sql: String,
}

pub fn run(args: InspectArgs) -> anyhow::Result<()> {
    println!("{}", describe(&args.sql)?);
    Ok(())
}

fn describe(sql: &str) -> anyhow::Result<String> {
    let Some(params) = metadata::try_decode(sql)? else {
        return Ok("uncached".to_string());
    };

    Ok(format!(
        "key: {}\nttl: {}\nstatement: {}",
        params.effective_key(),
        timespan::format(params.ttl),
        metadata::strip(sql)
    ))
}
