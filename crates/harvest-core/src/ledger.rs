//! Per-collector run history under `metadata/<collector>/`.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;

use crate::gate::LastRunSource;
use crate::object_store::{keys, vacant_key, ObjectStore};
use crate::report::{LastRunRecord, RunOutcome};

#[derive(Clone)]
pub struct RunLedger {
    store: Arc<dyn ObjectStore>,
}

impl RunLedger {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// Record a successful outcome: history entry, then `last_run.json`.
    /// Non-success outcomes are ignored so the job stays due.
    pub async fn record(&self, outcome: &RunOutcome) -> Result<bool> {
        if !outcome.is_success() {
            return Ok(false);
        }
        let history = vacant_key(
            self.store.as_ref(),
            &keys::run_history(&outcome.job, outcome.end_time),
        )
        .await
        .context("pick history key")?;
        let body = serde_json::to_vec_pretty(outcome).context("serialize run outcome")?;
        self.store
            .put_bytes(&history, &body, "application/json")
            .await
            .with_context(|| format!("write {}", history))?;
        let last = keys::last_run(&outcome.job);
        self.store
            .copy(&history, &last)
            .await
            .with_context(|| format!("update {}", last))?;
        tracing::debug!(job = %outcome.job, key = %history, "run recorded");
        Ok(true)
    }
}

#[async_trait]
impl LastRunSource for RunLedger {
    async fn last_run(&self, job: &str) -> Result<Option<LastRunRecord>> {
        let key = keys::last_run(job);
        let Some(bytes) = self.store.get_bytes(&key).await? else {
            return Ok(None);
        };
        match serde_json::from_slice::<RunOutcome>(&bytes) {
            Ok(o) => Ok(Some(LastRunRecord::from(&o))),
            Err(e) => {
                tracing::warn!(job, key = %key, error = %e, "corrupt last run record");
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::JobError;
    use crate::object_store::FsObjectStore;
    use crate::report::RunStatus;
    use chrono::Utc;

    #[tokio::test]
    async fn success_is_recorded_and_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FsObjectStore::new(dir.path()));
        let ledger = RunLedger::new(store.clone());
        let o = RunOutcome::success("dvf", Utc::now(), serde_json::json!({"files_collected": 3}));

        assert!(ledger.record(&o).await.unwrap());
        let rec = ledger.last_run("dvf").await.unwrap().unwrap();
        assert_eq!(rec.end_time, o.end_time);
        assert_eq!(rec.status, RunStatus::Success);
        let history = store
            .get_bytes(&keys::run_history("dvf", o.end_time))
            .await
            .unwrap();
        assert!(history.is_some());
    }

    #[tokio::test]
    async fn same_instant_records_keep_both_history_entries() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FsObjectStore::new(dir.path()));
        let ledger = RunLedger::new(store.clone());
        let at = Utc::now();
        let first = RunOutcome::success("dvf", at, serde_json::json!({"run": 1}));
        let mut second = RunOutcome::success("dvf", at, serde_json::json!({"run": 2}));
        second.end_time = first.end_time;

        ledger.record(&first).await.unwrap();
        ledger.record(&second).await.unwrap();
        let base = keys::run_history("dvf", first.end_time);
        let a = store.get_bytes(&base).await.unwrap().unwrap();
        let b = store.get_bytes(&keys::numbered(&base, 1)).await.unwrap().unwrap();
        assert_ne!(a, b);
        let last = store.get_bytes(&keys::last_run("dvf")).await.unwrap().unwrap();
        assert_eq!(last, b);
    }

    #[tokio::test]
    async fn failures_are_not_recorded() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = RunLedger::new(Arc::new(FsObjectStore::new(dir.path())));
        let o = RunOutcome::failed("dvf", Utc::now(), JobError::network("HTTP 502: bad gateway"));
        assert!(!ledger.record(&o).await.unwrap());
        assert!(ledger.last_run("dvf").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn corrupt_record_reads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FsObjectStore::new(dir.path()));
        store
            .put_bytes(&keys::last_run("dvf"), b"garbage", "application/json")
            .await
            .unwrap();
        let ledger = RunLedger::new(store);
        assert!(ledger.last_run("dvf").await.unwrap().is_none());
    }
}
