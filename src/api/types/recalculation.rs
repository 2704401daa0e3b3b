//! Recalculation run types

use serde::{Deserialize, Serialize};

use crate::domain::{RecalcReport, RecalcRun, RecalcRunId};

/// Query parameters of the professional trigger
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecalculationQuery {
    /// Bypass cached distances (manual recalculation)
    #[serde(default)]
    pub force: bool,
}

/// Response when a run is accepted (HTTP 202)
#[derive(Debug, Clone, Serialize)]
pub struct RunAccepted {
    pub run_id: String,
    pub status: String,
}

impl RunAccepted {
    pub fn new(run_id: &RecalcRunId) -> Self {
        Self {
            run_id: run_id.to_string(),
            status: "accepted".to_string(),
        }
    }
}

/// Snapshot of one run
#[derive(Debug, Clone, Serialize)]
pub struct RecalcRunResponse {
    pub run_id: String,
    pub trigger: String,
    pub state: String,
    pub report: RecalcReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<String>,
}

impl From<RecalcRun> for RecalcRunResponse {
    fn from(run: RecalcRun) -> Self {
        Self {
            run_id: run.id.to_string(),
            trigger: run.trigger.label().to_string(),
            state: run.state.to_string(),
            report: run.report,
            started_at: run.started_at.map(|t| t.to_rfc3339()),
            finished_at: run.finished_at.map(|t| t.to_rfc3339()),
        }
    }
}
