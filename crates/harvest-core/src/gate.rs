//! Cadence gate: is a job due for another run?

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::config::Cadence;
use crate::report::LastRunRecord;

/// Where the gate reads a job's previous successful run.
#[async_trait]
pub trait LastRunSource: Send + Sync {
    async fn last_run(&self, job: &str) -> Result<Option<LastRunRecord>>;
}

#[derive(Clone)]
pub struct ScheduleGate {
    source: Arc<dyn LastRunSource>,
    enabled: bool,
}

impl ScheduleGate {
    pub fn new(source: Arc<dyn LastRunSource>) -> Self {
        Self {
            source,
            enabled: true,
        }
    }

    /// A disabled gate reports every job as due.
    pub fn enabled(mut self, yes: bool) -> Self {
        self.enabled = yes;
        self
    }

    pub async fn is_due(&self, job: &str, cadence: Cadence) -> bool {
        self.is_due_at(job, cadence, Utc::now()).await
    }

    /// Fails open: a missing, corrupt or unreadable record means due.
    pub async fn is_due_at(&self, job: &str, cadence: Cadence, now: DateTime<Utc>) -> bool {
        if !self.enabled {
            return true;
        }
        let record = match self.source.last_run(job).await {
            Ok(Some(r)) => r,
            Ok(None) => {
                tracing::debug!(job, "no previous run, due");
                return true;
            }
            Err(e) => {
                tracing::warn!(job, error = %format!("{:#}", e), "last run unreadable, treating as due");
                return true;
            }
        };
        let elapsed = now - record.end_time;
        let due = elapsed >= cadence.min_interval();
        tracing::debug!(
            job,
            cadence = ?cadence,
            elapsed_hours = elapsed.num_hours(),
            due,
            "gate decision"
        );
        due
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::RunStatus;
    use chrono::Duration;
    use std::collections::HashMap;

    #[derive(Default)]
    struct Records(HashMap<String, DateTime<Utc>>);

    #[async_trait]
    impl LastRunSource for Records {
        async fn last_run(&self, job: &str) -> Result<Option<LastRunRecord>> {
            Ok(self.0.get(job).map(|t| LastRunRecord {
                job: job.to_string(),
                end_time: *t,
                status: RunStatus::Success,
            }))
        }
    }

    struct Broken;

    #[async_trait]
    impl LastRunSource for Broken {
        async fn last_run(&self, _job: &str) -> Result<Option<LastRunRecord>> {
            anyhow::bail!("metadata store unavailable")
        }
    }

    fn gate_with(job: &str, end: DateTime<Utc>) -> ScheduleGate {
        let mut r = Records::default();
        r.0.insert(job.to_string(), end);
        ScheduleGate::new(Arc::new(r))
    }

    #[tokio::test]
    async fn daily_scenario() {
        let now = Utc::now();
        let g = gate_with("dvf", now - Duration::hours(12));
        assert!(!g.is_due_at("dvf", Cadence::Daily, now).await);
        let g = gate_with("dvf", now - Duration::hours(25));
        assert!(g.is_due_at("dvf", Cadence::Daily, now).await);
    }

    #[tokio::test]
    async fn boundary_for_each_cadence() {
        let now = Utc::now();
        for (cadence, days) in [
            (Cadence::Daily, 1),
            (Cadence::Weekly, 7),
            (Cadence::Monthly, 30),
            (Cadence::Yearly, 365),
        ] {
            let just_short = gate_with("j", now - Duration::days(days) + Duration::seconds(1));
            assert!(!just_short.is_due_at("j", cadence, now).await, "{:?}", cadence);
            let exact = gate_with("j", now - Duration::days(days));
            assert!(exact.is_due_at("j", cadence, now).await, "{:?}", cadence);
            let a_day_short = gate_with("j", now - Duration::days(days - 1));
            assert!(!a_day_short.is_due_at("j", cadence, now).await, "{:?}", cadence);
        }
    }

    #[tokio::test]
    async fn cold_start_is_due() {
        let g = ScheduleGate::new(Arc::new(Records::default()));
        for c in [Cadence::Daily, Cadence::Weekly, Cadence::Monthly, Cadence::Yearly] {
            assert!(g.is_due("never-ran", c).await);
        }
    }

    #[tokio::test]
    async fn unreadable_source_fails_open() {
        let g = ScheduleGate::new(Arc::new(Broken));
        assert!(g.is_due("dvf", Cadence::Yearly).await);
    }

    #[tokio::test]
    async fn future_end_time_is_not_due() {
        let now = Utc::now();
        let g = gate_with("dvf", now + Duration::hours(1));
        assert!(!g.is_due_at("dvf", Cadence::Daily, now).await);
    }

    #[tokio::test]
    async fn disabled_gate_always_due() {
        let now = Utc::now();
        let g = gate_with("dvf", now).enabled(false);
        assert!(g.is_due_at("dvf", Cadence::Yearly, now).await);
    }
}
