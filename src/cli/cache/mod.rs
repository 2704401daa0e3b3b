//! Cache command - statistics and cleanup

use clap::Subcommand;

use crate::engine::GeoEngine;

#[derive(Subcommand, Clone, Debug)]
pub enum CacheCommand {
    /// Print hit/miss statistics of this process
    Stats,

    /// Purge expired entries from every tier
    Cleanup,
}

pub async fn run(command: CacheCommand) -> anyhow::Result<()> {
    let config = super::bootstrap()?;
    let engine = GeoEngine::init(&config).await?;

    match command {
        CacheCommand::Stats => super::print_json(&engine.cache().stats().await)?,
        CacheCommand::Cleanup => {
            let report = engine.cache().cleanup().await;
            super::print_json(&report)?;
            for error in report.errors() {
                tracing::warn!(error = %error, "Tier cleanup failed");
            }
        }
    }

    engine.shutdown().await;
    Ok(())
}
