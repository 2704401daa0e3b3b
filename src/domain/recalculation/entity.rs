//! Recalculation runs and their reports

use std::fmt;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::domain::DomainError;

static ID_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^recalc-[a-f0-9]{8}-[a-f0-9]{4}-[a-f0-9]{4}-[a-f0-9]{4}-[a-f0-9]{12}$").unwrap()
});

/// Identifier of a recalculation run: `recalc-{uuid}`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RecalcRunId(String);

impl RecalcRunId {
    pub fn new(id: impl Into<String>) -> Result<Self, DomainError> {
        let id = id.into();
        if !ID_PATTERN.is_match(&id) {
            return Err(DomainError::validation(format!(
                "Invalid run ID '{}': must be in format recalc-{{uuid}}",
                id
            )));
        }
        Ok(Self(id))
    }

    pub fn generate() -> Self {
        Self(format!("recalc-{}", uuid::Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for RecalcRunId {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<RecalcRunId> for String {
    fn from(id: RecalcRunId) -> Self {
        id.0
    }
}

impl fmt::Display for RecalcRunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What caused a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RecalcTrigger {
    ProfessionalAddressChanged { professional_id: String },
    RequestAddressChanged { request_id: String },
    /// Admin request; bypasses cached distances
    Manual { professional_id: String },
}

impl RecalcTrigger {
    pub fn forces_refresh(&self) -> bool {
        matches!(self, Self::Manual { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::ProfessionalAddressChanged { .. } => "professional_address_changed",
            Self::RequestAddressChanged { .. } => "request_address_changed",
            Self::Manual { .. } => "manual",
        }
    }
}

/// Run lifecycle: `Idle -> Running -> {Completed, PartiallyFailed}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecalcState {
    #[default]
    Idle,
    Running,
    Completed,
    PartiallyFailed,
}

impl RecalcState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::PartiallyFailed)
    }

    pub fn can_transition_to(&self, target: RecalcState) -> bool {
        matches!(
            (self, target),
            (Self::Idle, Self::Running)
                | (Self::Running, Self::Completed)
                | (Self::Running, Self::PartiallyFailed)
        )
    }
}

impl fmt::Display for RecalcState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
            Self::PartiallyFailed => write!(f, "partially_failed"),
        }
    }
}

/// Failure of one item in a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemError {
    pub item_id: String,
    pub reason: String,
}

/// Aggregated outcome of a run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecalcReport {
    pub total_attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Items never dispatched because of shutdown
    pub skipped: usize,
    pub errors: Vec<ItemError>,
}

impl RecalcReport {
    pub fn record_success(&mut self) {
        self.total_attempted += 1;
        self.succeeded += 1;
    }

    pub fn record_failure(&mut self, item_id: impl Into<String>, reason: impl Into<String>) {
        self.total_attempted += 1;
        self.failed += 1;
        self.errors.push(ItemError {
            item_id: item_id.into(),
            reason: reason.into(),
        });
    }

    pub fn record_skipped(&mut self, count: usize) {
        self.skipped += count;
    }

    /// Terminal state this report leads to
    pub fn final_state(&self) -> RecalcState {
        if self.failed == 0 && self.skipped == 0 {
            RecalcState::Completed
        } else {
            RecalcState::PartiallyFailed
        }
    }
}

/// One tracked recalculation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecalcRun {
    pub id: RecalcRunId,
    pub trigger: RecalcTrigger,
    pub state: RecalcState,
    pub report: RecalcReport,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl RecalcRun {
    pub fn new(trigger: RecalcTrigger) -> Self {
        Self {
            id: RecalcRunId::generate(),
            trigger,
            state: RecalcState::Idle,
            report: RecalcReport::default(),
            started_at: None,
            finished_at: None,
        }
    }

    pub fn start(&mut self, at: DateTime<Utc>) -> Result<(), DomainError> {
        self.transition(RecalcState::Running)?;
        self.started_at = Some(at);
        Ok(())
    }

    pub fn finish(&mut self, report: RecalcReport, at: DateTime<Utc>) -> Result<(), DomainError> {
        self.transition(report.final_state())?;
        self.report = report;
        self.finished_at = Some(at);
        Ok(())
    }

    fn transition(&mut self, target: RecalcState) -> Result<(), DomainError> {
        if !self.state.can_transition_to(target) {
            return Err(DomainError::validation(format!(
                "Run {} cannot move from {} to {}",
                self.id, self.state, target
            )));
        }
        self.state = target;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_id_roundtrip() {
        let id = RecalcRunId::generate();
        assert_eq!(RecalcRunId::new(id.to_string()).unwrap(), id);
        assert!(RecalcRunId::new("op-123").is_err());
    }

    #[test]
    fn test_run_lifecycle() {
        let mut run = RecalcRun::new(RecalcTrigger::Manual {
            professional_id: "p1".to_string(),
        });
        assert_eq!(run.state, RecalcState::Idle);

        run.start(Utc::now()).unwrap();
        assert_eq!(run.state, RecalcState::Running);

        let mut report = RecalcReport::default();
        report.record_success();
        report.record_failure("r2", "ZERO_RESULTS");
        run.finish(report, Utc::now()).unwrap();

        assert_eq!(run.state, RecalcState::PartiallyFailed);
        assert_eq!(run.report.total_attempted, 2);
        assert!(run.finished_at.is_some());
    }

    #[test]
    fn test_cannot_finish_idle_run() {
        let mut run = RecalcRun::new(RecalcTrigger::RequestAddressChanged {
            request_id: "r1".to_string(),
        });

        assert!(run.finish(RecalcReport::default(), Utc::now()).is_err());
    }

    #[test]
    fn test_empty_report_completes() {
        assert_eq!(RecalcReport::default().final_state(), RecalcState::Completed);
    }

    #[test]
    fn test_skipped_items_mark_partial() {
        let mut report = RecalcReport::default();
        report.record_success();
        report.record_skipped(3);

        assert_eq!(report.final_state(), RecalcState::PartiallyFailed);
    }
}
