//! Collector jobs run in-process.
//!
//! A [`Job`] is one independently schedulable ingestion unit. Concrete jobs
//! are variants selected by configuration; [`FileSetJob`] is the configured
//! "fetch these files into `raw/<collector>/<year>/`" variant.

mod file_set;

pub use file_set::{FileSetJob, SourceFile};

use async_trait::async_trait;
use serde_json::json;

use crate::config::Cadence;
use crate::gate::ScheduleGate;
use crate::ledger::RunLedger;
use crate::report::RunOutcome;

/// What a job needs from the runtime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    /// Uses [`IdempotentTransfer`](crate::transfer::IdempotentTransfer) for its files.
    pub needs_transfer: bool,
    /// Runs its own structural checks on downloaded content.
    pub validates_own_output: bool,
}

#[async_trait]
pub trait Job: Send + Sync {
    fn name(&self) -> &str;

    fn capabilities(&self) -> Capabilities;

    fn cadence(&self) -> Cadence;

    /// Run once. Failures are reported in the outcome, never raised.
    async fn execute(&self) -> RunOutcome;
}

/// Execute `job` when the gate finds it due, and record a success in the ledger.
pub async fn run_collector(
    job: &dyn Job,
    gate: Option<&ScheduleGate>,
    ledger: Option<&RunLedger>,
) -> RunOutcome {
    if let Some(gate) = gate {
        if !gate.is_due(job.name(), job.cadence()).await {
            tracing::info!(job = job.name(), cadence = ?job.cadence(), "collector not due, skipping");
            return RunOutcome::skipped(job.name()).with_payload(json!({
                "status": "skipped",
                "reason": format!("last successful run is within the {}-day cadence", job.cadence().days()),
            }));
        }
    }
    tracing::info!(job = job.name(), "collector starting");
    let outcome = job.execute().await;
    tracing::info!(
        job = job.name(),
        status = %outcome.status,
        duration_seconds = outcome.duration_seconds,
        "collector finished"
    );
    if let Some(ledger) = ledger {
        if let Err(e) = ledger.record(&outcome).await {
            tracing::error!(job = job.name(), error = %format!("{:#}", e), "could not record run");
        }
    }
    outcome
}
