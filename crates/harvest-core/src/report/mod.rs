//! Per-job outcomes and the per-cycle execution report.

mod recorder;

pub use recorder::ExecutionRecorder;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::JobError;

/// Terminal status of one job in one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Success,
    Failed,
    /// Not due; decided by the gate before dispatch.
    Skipped,
    /// Handed to the task queue; real outcome observed out-of-band.
    Scheduled,
}

impl RunStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RunStatus::Success => "success",
            RunStatus::Failed => "failed",
            RunStatus::Skipped => "skipped",
            RunStatus::Scheduled => "scheduled",
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one dispatched (or skipped) job. Never edited once recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunOutcome {
    pub job: String,
    pub status: RunStatus,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration_seconds: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JobError>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_status: Option<u32>,
    /// Dispatch handle of a queued job.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
}

fn seconds_between(start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
    (end - start).num_milliseconds().max(0) as f64 / 1000.0
}

impl RunOutcome {
    fn finished(job: &str, status: RunStatus, start_time: DateTime<Utc>) -> Self {
        let end_time = Utc::now().max(start_time);
        Self {
            job: job.to_string(),
            status,
            start_time,
            end_time,
            duration_seconds: seconds_between(start_time, end_time),
            error: None,
            http_status: None,
            task: None,
            payload: None,
        }
    }

    pub fn success(job: &str, start_time: DateTime<Utc>, payload: serde_json::Value) -> Self {
        Self {
            payload: Some(payload),
            ..Self::finished(job, RunStatus::Success, start_time)
        }
    }

    pub fn failed(job: &str, start_time: DateTime<Utc>, error: JobError) -> Self {
        Self {
            error: Some(error),
            ..Self::finished(job, RunStatus::Failed, start_time)
        }
    }

    pub fn skipped(job: &str) -> Self {
        Self::finished(job, RunStatus::Skipped, Utc::now())
    }

    pub fn scheduled(job: &str, start_time: DateTime<Utc>, task: String) -> Self {
        Self {
            task: Some(task),
            ..Self::finished(job, RunStatus::Scheduled, start_time)
        }
    }

    pub fn with_http_status(mut self, status: u32) -> Self {
        self.http_status = Some(status);
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Success
    }

    pub fn is_failed(&self) -> bool {
        self.status == RunStatus::Failed
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    #[serde(default)]
    pub scheduled: usize,
}

/// Overall result of a cycle as seen by a caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CycleStatus {
    /// No job failed.
    Succeeded,
    /// At least one job failed; details in the per-job map.
    Partial,
}

/// One cycle's sealed report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionReport {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration_seconds: f64,
    pub summary: Summary,
    pub jobs: BTreeMap<String, RunOutcome>,
}

impl ExecutionReport {
    pub fn cycle_status(&self) -> CycleStatus {
        if self.summary.failed == 0 {
            CycleStatus::Succeeded
        } else {
            CycleStatus::Partial
        }
    }

    /// 200 when every dispatched job succeeded, 207 (multi-status) otherwise.
    pub fn http_status(&self) -> u16 {
        match self.cycle_status() {
            CycleStatus::Succeeded => 200,
            CycleStatus::Partial => 207,
        }
    }

    pub fn outcome(&self, job: &str) -> Option<&RunOutcome> {
        self.jobs.get(job)
    }
}

/// Accumulates outcomes as they arrive; single writer (the dispatch loop).
#[derive(Debug)]
pub struct ReportBuilder {
    start_time: DateTime<Utc>,
    jobs: BTreeMap<String, RunOutcome>,
}

impl ReportBuilder {
    pub fn new(start_time: DateTime<Utc>) -> Self {
        Self {
            start_time,
            jobs: BTreeMap::new(),
        }
    }

    /// Record an outcome. The first outcome for a job wins; later ones are ignored.
    pub fn record(&mut self, outcome: RunOutcome) -> bool {
        if self.jobs.contains_key(&outcome.job) {
            tracing::warn!(job = %outcome.job, "duplicate outcome ignored");
            return false;
        }
        self.jobs.insert(outcome.job.clone(), outcome);
        true
    }

    pub fn contains(&self, job: &str) -> bool {
        self.jobs.contains_key(job)
    }

    pub fn seal(self) -> ExecutionReport {
        let mut summary = Summary {
            total: self.jobs.len(),
            ..Summary::default()
        };
        for outcome in self.jobs.values() {
            match outcome.status {
                RunStatus::Success => summary.succeeded += 1,
                RunStatus::Failed => summary.failed += 1,
                RunStatus::Skipped => summary.skipped += 1,
                RunStatus::Scheduled => summary.scheduled += 1,
            }
        }
        let end_time = Utc::now().max(self.start_time);
        ExecutionReport {
            start_time: self.start_time,
            end_time,
            duration_seconds: seconds_between(self.start_time, end_time),
            summary,
            jobs: self.jobs,
        }
    }
}

/// What the gate needs to know about a job's previous successful run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastRunRecord {
    pub job: String,
    pub end_time: DateTime<Utc>,
    pub status: RunStatus,
}

impl From<&RunOutcome> for LastRunRecord {
    fn from(o: &RunOutcome) -> Self {
        Self {
            job: o.job.clone(),
            end_time: o.end_time,
            status: o.status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn seal_counts_each_status() {
        let now = Utc::now();
        let mut b = ReportBuilder::new(now);
        b.record(RunOutcome::success("a", now, serde_json::json!({})));
        b.record(RunOutcome::failed("b", now, JobError::network("HTTP 500: boom")));
        b.record(RunOutcome::skipped("c"));
        b.record(RunOutcome::scheduled("d", now, "tasks/1".into()));
        let r = b.seal();
        assert_eq!(
            r.summary,
            Summary {
                total: 4,
                succeeded: 1,
                failed: 1,
                skipped: 1,
                scheduled: 1
            }
        );
        assert_eq!(r.cycle_status(), CycleStatus::Partial);
        assert_eq!(r.http_status(), 207);
        assert!(r.duration_seconds >= 0.0);
    }

    #[test]
    fn first_outcome_wins() {
        let now = Utc::now();
        let mut b = ReportBuilder::new(now);
        assert!(b.record(RunOutcome::success("a", now, serde_json::json!({}))));
        assert!(!b.record(RunOutcome::failed("a", now, JobError::timeout("late"))));
        let r = b.seal();
        assert_eq!(r.outcome("a").unwrap().status, RunStatus::Success);
        assert_eq!(r.cycle_status(), CycleStatus::Succeeded);
        assert_eq!(r.http_status(), 200);
    }

    #[test]
    fn outcome_json_shape() {
        let now = Utc::now();
        let o = RunOutcome::failed("b", now, JobError::new(ErrorKind::Timeout, "540s"))
            .with_http_status(504);
        let v = serde_json::to_value(&o).unwrap();
        assert_eq!(v["status"], "failed");
        assert_eq!(v["error"]["kind"], "Timeout");
        assert_eq!(v["http_status"], 504);
        assert!(v.get("payload").is_none());
        let back: RunOutcome = serde_json::from_value(v).unwrap();
        assert_eq!(back, o);
    }
}
