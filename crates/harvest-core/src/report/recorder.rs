//! Persists execution reports: timestamped history plus the "latest" pointer.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;

use super::{ExecutionReport, LastRunRecord, RunStatus};
use crate::gate::LastRunSource;
use crate::object_store::{keys, vacant_key, ObjectStore};

const JSON: &str = "application/json";

#[derive(Clone)]
pub struct ExecutionRecorder {
    store: Arc<dyn ObjectStore>,
}

impl ExecutionRecorder {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// Write the history artifact, then replace the latest pointer with a copy.
    /// Returns the history key.
    pub async fn persist(&self, report: &ExecutionReport) -> Result<String> {
        let key = vacant_key(self.store.as_ref(), &keys::report_history(report.start_time))
            .await
            .context("pick history key")?;
        let body = serde_json::to_vec_pretty(report).context("serialize execution report")?;
        self.store
            .put_bytes(&key, &body, JSON)
            .await
            .with_context(|| format!("write {}", key))?;
        self.store
            .copy(&key, keys::LATEST_REPORT)
            .await
            .with_context(|| format!("update {}", keys::LATEST_REPORT))?;
        tracing::info!(key = %key, "execution report saved");
        Ok(key)
    }

    /// Latest report, or `None` when missing, unreadable or corrupt.
    pub async fn last(&self) -> Option<ExecutionReport> {
        let bytes = match self.store.get_bytes(keys::LATEST_REPORT).await {
            Ok(Some(b)) => b,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(error = %format!("{:#}", e), "cannot read latest report");
                return None;
            }
        };
        match serde_json::from_slice(&bytes) {
            Ok(r) => Some(r),
            Err(e) => {
                tracing::warn!(error = %e, "latest report is corrupt");
                None
            }
        }
    }
}

#[async_trait]
impl LastRunSource for ExecutionRecorder {
    /// The job's outcome in the latest report, if it was a success.
    async fn last_run(&self, job: &str) -> Result<Option<LastRunRecord>> {
        Ok(self.last().await.and_then(|r| {
            r.jobs
                .get(job)
                .filter(|o| o.status == RunStatus::Success)
                .map(LastRunRecord::from)
        }))
    }
}
