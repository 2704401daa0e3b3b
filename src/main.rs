use clap::Parser;
use geo_travel_engine::cli::{self, Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Serve(args) => cli::serve::run(args).await,
        Command::Recalc(command) => cli::recalc::run(command).await,
        Command::Cache(command) => cli::cache::run(command).await,
        Command::Travel(args) => cli::travel::run(args).await,
    }
}
