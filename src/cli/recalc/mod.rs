//! Recalc command - foreground recalculation

use clap::Subcommand;

use crate::domain::{RecalcTrigger, RecalcState};
use crate::engine::GeoEngine;

#[derive(Subcommand, Clone, Debug)]
pub enum RecalcCommand {
    /// Every active request assigned to the professional
    Professional {
        id: String,
        /// Bypass cached distances
        #[arg(long)]
        force: bool,
    },

    /// A single request, for its assigned professional
    Request { id: String },
}

impl RecalcCommand {
    fn trigger(self) -> RecalcTrigger {
        match self {
            Self::Professional { id, force: true } => RecalcTrigger::Manual {
                professional_id: id,
            },
            Self::Professional { id, force: false } => RecalcTrigger::ProfessionalAddressChanged {
                professional_id: id,
            },
            Self::Request { id } => RecalcTrigger::RequestAddressChanged { request_id: id },
        }
    }
}

/// Prints the finished run; fails when any item failed
pub async fn run(command: RecalcCommand) -> anyhow::Result<()> {
    let config = super::bootstrap()?;
    let engine = GeoEngine::init(&config).await?;

    let run = engine.orchestrator().run(command.trigger()).await;
    super::print_json(&run)?;

    engine.shutdown().await;

    if run.state == RecalcState::PartiallyFailed {
        anyhow::bail!(
            "{} of {} items failed, {} skipped",
            run.report.failed,
            run.report.total_attempted,
            run.report.skipped
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_force_maps_to_manual_trigger() {
        let trigger = RecalcCommand::Professional {
            id: "p1".to_string(),
            force: true,
        }
        .trigger();

        assert!(trigger.forces_refresh());
        assert!(!RecalcCommand::Request { id: "r1".to_string() }.trigger().forces_refresh());
    }
}
