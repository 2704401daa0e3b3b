//! Bulk travel recomputation after address changes

use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use futures::future;
use futures::stream::{self, StreamExt};
use serde::Deserialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::travel_info_service::TravelInfoService;
use crate::domain::{
    Clock, DomainError, ProfessionalRecord, RecalcReport, RecalcRun, RecalcRunId,
    RecalcRunRepository, RecalcTrigger, ServiceRequestRecord, TravelError,
};
use crate::infrastructure::observability::{record_recalculation_item, record_recalculation_run};
use crate::infrastructure::recalculation::DEFAULT_RUN_RETENTION;

const MAX_CONCURRENCY: usize = 10;

/// Recalculation settings (`recalculation` section)
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RecalculationConfig {
    /// Items in flight per run, clamped to 1..=10
    pub concurrency: usize,
    /// Finished runs kept for status queries
    pub run_retention: usize,
}

impl Default for RecalculationConfig {
    fn default() -> Self {
        Self {
            concurrency: 5,
            run_retention: DEFAULT_RUN_RETENTION,
        }
    }
}

impl RecalculationConfig {
    pub fn concurrency(&self) -> usize {
        self.concurrency.clamp(1, MAX_CONCURRENCY)
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }
}

type Target = (ServiceRequestRecord, ProfessionalRecord);

/// Recomputes travel info for every request affected by an address change.
///
/// Items run with bounded concurrency and fail independently. Once the
/// shutdown signal is raised no further item is dispatched; items already
/// in flight complete and the rest are reported as skipped.
pub struct RecalculationOrchestrator {
    travel: Arc<TravelInfoService>,
    runs: Arc<dyn RecalcRunRepository>,
    clock: Arc<dyn Clock>,
    concurrency: usize,
    shutdown: watch::Receiver<bool>,
    spawned: Mutex<Vec<JoinHandle<()>>>,
}

impl fmt::Debug for RecalculationOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecalculationOrchestrator")
            .field("concurrency", &self.concurrency)
            .field("runs", &self.runs)
            .finish()
    }
}

impl RecalculationOrchestrator {
    pub fn new(
        travel: Arc<TravelInfoService>,
        runs: Arc<dyn RecalcRunRepository>,
        clock: Arc<dyn Clock>,
        config: &RecalculationConfig,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            travel,
            runs,
            clock,
            concurrency: config.concurrency(),
            shutdown,
            spawned: Mutex::new(Vec::new()),
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Starts a background run for every active request of the professional
    pub async fn on_professional_address_changed(
        self: &Arc<Self>,
        professional_id: &str,
    ) -> RecalcRunId {
        self.start(RecalcTrigger::ProfessionalAddressChanged {
            professional_id: professional_id.to_string(),
        })
        .await
    }

    /// Starts a background run for the request's assigned professional
    pub async fn on_request_address_changed(self: &Arc<Self>, request_id: &str) -> RecalcRunId {
        self.start(RecalcTrigger::RequestAddressChanged {
            request_id: request_id.to_string(),
        })
        .await
    }

    /// Admin trigger; cached distances are bypassed
    pub async fn recalculate_manual(self: &Arc<Self>, professional_id: &str) -> RecalcRunId {
        self.start(RecalcTrigger::Manual {
            professional_id: professional_id.to_string(),
        })
        .await
    }

    /// Runs to completion and returns the report
    pub async fn recalculate_professional(&self, professional_id: &str) -> RecalcReport {
        self.run(RecalcTrigger::ProfessionalAddressChanged {
            professional_id: professional_id.to_string(),
        })
        .await
        .report
    }

    pub async fn recalculate_request(&self, request_id: &str) -> RecalcReport {
        self.run(RecalcTrigger::RequestAddressChanged {
            request_id: request_id.to_string(),
        })
        .await
        .report
    }

    pub async fn status(&self, run_id: &RecalcRunId) -> Result<Option<RecalcRun>, DomainError> {
        self.runs.get(run_id).await
    }

    pub async fn recent_runs(&self, limit: usize) -> Result<Vec<RecalcRun>, DomainError> {
        self.runs.list_recent(limit).await
    }

    /// Waits for every background run started so far
    pub async fn wait_for_runs(&self) {
        let handles: Vec<_> = match self.spawned.lock() {
            Ok(mut spawned) => spawned.drain(..).collect(),
            Err(poisoned) => poisoned.into_inner().drain(..).collect(),
        };

        for handle in handles {
            if let Err(e) = handle.await {
                error!(error = %e, "Recalculation task panicked");
            }
        }
    }

    async fn start(self: &Arc<Self>, trigger: RecalcTrigger) -> RecalcRunId {
        let run = RecalcRun::new(trigger);
        let run_id = run.id.clone();
        self.persist(&run).await;

        info!(run_id = %run_id, trigger = run.trigger.label(), "Recalculation started");

        let this = Arc::clone(self);
        let handle = tokio::spawn(async move {
            this.execute(run).await;
        });

        let mut spawned = self.spawned.lock().unwrap_or_else(|e| e.into_inner());
        spawned.retain(|h| !h.is_finished());
        spawned.push(handle);

        run_id
    }

    /// Creates, executes and records a run in the foreground
    pub async fn run(&self, trigger: RecalcTrigger) -> RecalcRun {
        let run = RecalcRun::new(trigger);
        self.persist(&run).await;
        self.execute(run).await
    }

    async fn execute(&self, mut run: RecalcRun) -> RecalcRun {
        let started = Instant::now();
        if let Err(e) = run.start(self.clock.now()) {
            warn!(run_id = %run.id, error = %e, "Run could not start");
            return run;
        }
        self.persist(&run).await;

        let mut report = RecalcReport::default();
        let refresh = run.trigger.forces_refresh();

        match self.targets(&run.trigger).await {
            Ok(targets) => self.process(targets, refresh, &mut report).await,
            Err(e) => {
                warn!(run_id = %run.id, error = %e, "Could not enumerate recalculation targets");
                record_recalculation_item("failed");
                report.record_failure(subject_of(&run.trigger), e.to_string());
            }
        }

        if let Err(e) = run.finish(report, self.clock.now()) {
            warn!(run_id = %run.id, error = %e, "Run could not finish");
        }
        self.persist(&run).await;

        let state = run.state.to_string();
        record_recalculation_run(run.trigger.label(), &state, started.elapsed());
        info!(
            run_id = %run.id,
            state = %state,
            attempted = run.report.total_attempted,
            succeeded = run.report.succeeded,
            failed = run.report.failed,
            skipped = run.report.skipped,
            "Recalculation finished"
        );

        run
    }

    async fn targets(&self, trigger: &RecalcTrigger) -> Result<Vec<Target>, TravelError> {
        let repository = self.travel.repository();

        match trigger {
            RecalcTrigger::ProfessionalAddressChanged { professional_id }
            | RecalcTrigger::Manual { professional_id } => {
                let professional = repository
                    .find_professional(professional_id)
                    .await?
                    .ok_or_else(|| {
                        TravelError::not_found(format!(
                            "Professional '{}' not found",
                            professional_id
                        ))
                    })?;

                let requests = repository.list_active_requests(professional_id).await?;
                debug!(count = requests.len(), "Active requests to recalculate");

                Ok(requests
                    .into_iter()
                    .map(|request| (request, professional.clone()))
                    .collect())
            }
            RecalcTrigger::RequestAddressChanged { request_id } => {
                let request = repository.find_request(request_id).await?.ok_or_else(|| {
                    TravelError::not_found(format!("Request '{}' not found", request_id))
                })?;

                let professional_id = match (&request.professional_id, request.status.is_active()) {
                    (Some(id), true) => id.clone(),
                    _ => {
                        debug!(request_id = %request_id, "Request not assigned or not active");
                        return Ok(Vec::new());
                    }
                };

                let professional = repository
                    .find_professional(&professional_id)
                    .await?
                    .ok_or_else(|| {
                        TravelError::not_found(format!(
                            "Professional '{}' not found",
                            professional_id
                        ))
                    })?;

                Ok(vec![(request, professional)])
            }
        }
    }

    async fn process(&self, targets: Vec<Target>, refresh: bool, report: &mut RecalcReport) {
        let total = targets.len();
        let shutdown = self.shutdown.clone();

        let outcomes: Vec<(String, Result<(), TravelError>)> = stream::iter(targets)
            .take_while(|_| future::ready(!*shutdown.borrow()))
            .map(|(request, professional)| async move {
                let result = self
                    .travel
                    .compute_for(&request, &professional, refresh)
                    .await
                    .map(|_| ());
                (request.id, result)
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let skipped = total - outcomes.len();

        for (request_id, result) in outcomes {
            match result {
                Ok(()) => {
                    record_recalculation_item("succeeded");
                    report.record_success();
                }
                Err(e) => {
                    warn!(request_id = %request_id, error = %e, "Travel recalculation failed");
                    record_recalculation_item("failed");
                    report.record_failure(request_id, e.to_string());
                }
            }
        }

        if skipped > 0 {
            warn!(skipped, "Shutdown requested, remaining items skipped");
            for _ in 0..skipped {
                record_recalculation_item("skipped");
            }
            report.record_skipped(skipped);
        }
    }

    async fn persist(&self, run: &RecalcRun) {
        if let Err(e) = self.runs.save(run).await {
            warn!(run_id = %run.id, error = %e, "Failed to record recalculation run");
        }
    }
}

fn subject_of(trigger: &RecalcTrigger) -> String {
    match trigger {
        RecalcTrigger::ProfessionalAddressChanged { professional_id }
        | RecalcTrigger::Manual { professional_id } => professional_id.clone(),
        RecalcTrigger::RequestAddressChanged { request_id } => request_id.clone(),
    }
}
