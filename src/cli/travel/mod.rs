//! Travel command - compute and store travel info for one request

use clap::Args;

use crate::engine::GeoEngine;

#[derive(Args, Clone, Debug)]
pub struct TravelArgs {
    pub request_id: String,
    pub professional_id: String,

    /// Bypass the cached distance
    #[arg(long)]
    pub refresh: bool,
}

pub async fn run(args: TravelArgs) -> anyhow::Result<()> {
    let config = super::bootstrap()?;
    let engine = GeoEngine::init(&config).await?;

    let result = if args.refresh {
        engine
            .travel()
            .refresh(&args.request_id, &args.professional_id)
            .await
    } else {
        engine
            .travel()
            .compute_and_store(&args.request_id, &args.professional_id)
            .await
    };

    engine.shutdown().await;

    super::print_json(&result?)
}
