use clap::Parser;
use query_result_cache::cli::{self, Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli::bootstrap();

    match cli.command {
        Command::Tag(args) => cli::tag::run(args, &config),
        Command::Inspect(args) => cli::inspect::run(args),
        Command::Demo => cli::demo::run(&config).await,
    }
}
