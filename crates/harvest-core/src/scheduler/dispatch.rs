//! One cycle: gate, fan out, collect, seal, record successes, persist.

use chrono::Utc;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use super::JobDispatcher;
use crate::config::JobConfig;
use crate::error::JobError;
use crate::report::{ExecutionReport, ReportBuilder, RunOutcome};

impl JobDispatcher {
    /// Run every enabled job that is due; never fails as a whole.
    pub async fn run_cycle(&self, jobs: &[JobConfig]) -> ExecutionReport {
        let cycle_start = Utc::now();
        let mut report = ReportBuilder::new(cycle_start);
        let deadline = self
            .cycle_deadline
            .map(|d| tokio::time::Instant::now() + d);

        let mut pending: VecDeque<JobConfig> = VecDeque::new();
        for job in jobs.iter().filter(|j| j.enabled) {
            if report.contains(&job.name) || pending.iter().any(|p| p.name == job.name) {
                tracing::warn!(job = %job.name, "duplicate job name, ignoring");
                continue;
            }
            if self.gate.is_due(&job.name, job.cadence).await {
                pending.push_back(job.clone());
            } else {
                tracing::info!(job = %job.name, cadence = ?job.cadence, "not due, skipping");
                report.record(RunOutcome::skipped(&job.name));
            }
        }
        tracing::info!(
            due = pending.len(),
            max_concurrent = self.max_concurrent,
            "dispatching cycle"
        );

        let mut join_set = tokio::task::JoinSet::new();
        let mut in_flight: HashMap<tokio::task::Id, (String, chrono::DateTime<Utc>)> =
            HashMap::new();

        loop {
            while join_set.len() < self.max_concurrent {
                let Some(job) = pending.pop_front() else {
                    break;
                };
                let trigger = Arc::clone(&self.trigger);
                let name = job.name.clone();
                let handle = join_set.spawn(async move { trigger.invoke(&job).await });
                in_flight.insert(handle.id(), (name, Utc::now()));
            }

            if join_set.is_empty() {
                break;
            }

            let next = match deadline {
                Some(at) => match tokio::time::timeout_at(at, join_set.join_next_with_id()).await {
                    Ok(next) => next,
                    Err(_) => {
                        tracing::warn!(
                            in_flight = in_flight.len(),
                            not_started = pending.len(),
                            "cycle deadline reached, abandoning remaining jobs"
                        );
                        join_set.abort_all();
                        for (name, started) in in_flight.drain().map(|(_, v)| v) {
                            report.record(RunOutcome::failed(
                                &name,
                                started,
                                JobError::timeout("abandoned at cycle deadline"),
                            ));
                        }
                        for job in pending.drain(..) {
                            report.record(RunOutcome::failed(
                                &job.name,
                                Utc::now(),
                                JobError::timeout("not started before cycle deadline"),
                            ));
                        }
                        break;
                    }
                },
                None => join_set.join_next_with_id().await,
            };
            let Some(joined) = next else {
                break;
            };

            let outcome = match joined {
                Ok((id, outcome)) => {
                    in_flight.remove(&id);
                    outcome
                }
                Err(e) => {
                    let Some((name, started)) = in_flight.remove(&e.id()) else {
                        tracing::error!(error = %e, "unknown job task ended");
                        continue;
                    };
                    let message = if e.is_panic() {
                        "job task panicked".to_string()
                    } else {
                        format!("job task ended unexpectedly: {}", e)
                    };
                    tracing::error!(job = %name, "{}", message);
                    RunOutcome::failed(&name, started, JobError::internal(message))
                }
            };
            settle(&mut report, outcome);
        }

        let sealed = report.seal();
        tracing::info!(
            total = sealed.summary.total,
            succeeded = sealed.summary.succeeded,
            failed = sealed.summary.failed,
            skipped = sealed.summary.skipped,
            scheduled = sealed.summary.scheduled,
            duration_seconds = sealed.duration_seconds,
            "cycle complete"
        );

        // Ledger writes happen after collection; the cycle deadline covers job execution only.
        if let Some(ledger) = &self.ledger {
            for outcome in sealed.jobs.values().filter(|o| o.is_success()) {
                if let Err(e) = ledger.record(outcome).await {
                    tracing::error!(job = %outcome.job, error = %format!("{:#}", e), "could not record run");
                }
            }
        }

        if let Some(recorder) = &self.recorder {
            if let Err(e) = recorder.persist(&sealed).await {
                tracing::error!(error = %format!("{:#}", e), "could not save execution report");
            }
        }
        sealed
    }
}

fn settle(report: &mut ReportBuilder, outcome: RunOutcome) {
    tracing::info!(
        job = %outcome.job,
        status = %outcome.status,
        duration_seconds = outcome.duration_seconds,
        "job settled"
    );
    report.record(outcome);
}
