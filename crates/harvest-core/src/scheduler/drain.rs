//! Queue worker: run queued work items through a direct trigger.

use anyhow::Result;
use serde::Serialize;

use crate::config::JobConfig;
use crate::ledger::RunLedger;
use crate::task_queue::SqliteTaskQueue;
use crate::trigger::Trigger;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DrainSummary {
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
}

/// Claim and run queued items one at a time until the queue is empty.
///
/// `jobs` supplies per-job settings (timeout) for items whose job is still
/// configured; unknown job names run with defaults against the queued URL.
pub async fn drain_queue(
    queue: &SqliteTaskQueue,
    trigger: &dyn Trigger,
    ledger: Option<&RunLedger>,
    jobs: &[JobConfig],
) -> Result<DrainSummary> {
    let recovered = queue.recover_running().await?;
    if recovered > 0 {
        tracing::info!(recovered, "requeued stranded tasks");
    }

    let mut summary = DrainSummary::default();
    while let Some(task) = queue.claim_next().await? {
        let mut job = jobs
            .iter()
            .find(|j| j.name == task.item.job_name)
            .cloned()
            .unwrap_or_else(|| JobConfig::new(&task.item.job_name, &task.item.url));
        job.url = Some(task.item.url.clone());

        tracing::info!(task = task.id, job = %job.name, attempt = task.attempts, "running queued task");
        let outcome = trigger.invoke(&job).await;
        summary.processed += 1;
        if outcome.is_success() {
            queue.mark_done(task.id).await?;
            summary.succeeded += 1;
            if let Some(ledger) = ledger {
                if let Err(e) = ledger.record(&outcome).await {
                    tracing::error!(job = %job.name, error = %format!("{:#}", e), "could not record run");
                }
            }
        } else {
            let message = outcome
                .error
                .as_ref()
                .map(|e| e.to_string())
                .unwrap_or_else(|| outcome.status.to_string());
            queue.mark_failed(task.id, &message).await?;
            summary.failed += 1;
        }
    }
    Ok(summary)
}
