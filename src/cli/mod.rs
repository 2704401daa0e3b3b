//! Command-line interface
//!
//! - `serve`: operations HTTP server
//! - `recalc`: run a recalculation in the foreground
//! - `cache`: inspect or clean the geo cache
//! - `travel`: compute travel info for one request

pub mod cache;
pub mod recalc;
pub mod serve;
pub mod travel;

use clap::{Parser, Subcommand};

use crate::config::AppConfig;
use crate::infrastructure::logging;

/// Geo-distance caching and travel-cost recomputation engine
#[derive(Parser)]
#[command(name = "geo-travel-engine")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the operations HTTP server
    Serve(serve::ServeArgs),

    /// Recalculate travel info and print the report
    #[command(subcommand)]
    Recalc(recalc::RecalcCommand),

    /// Inspect or maintain the geo cache
    #[command(subcommand)]
    Cache(cache::CacheCommand),

    /// Compute and store travel info for one request
    Travel(travel::TravelArgs),
}

/// Loads `.env` and the layered configuration, then installs logging
pub(crate) fn bootstrap() -> anyhow::Result<AppConfig> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;
    logging::init_logging(&config.logging);

    Ok(config)
}

pub(crate) fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
