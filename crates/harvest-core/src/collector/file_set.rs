//! Configured collector: a fixed list of files moved through the idempotent transfer.

use async_trait::async_trait;
use chrono::{Datelike, Utc};
use serde::Serialize;
use std::sync::Arc;

use super::{Capabilities, Job};
use crate::config::{Cadence, CollectorConfig};
use crate::error::{ErrorKind, JobError};
use crate::object_store::keys;
use crate::report::RunOutcome;
use crate::transfer::{check_for, ContentCheck, IdempotentTransfer, TransferOutcome};
use crate::url_model::derive_filename;

/// One file of a [`FileSetJob`], fully resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub url: String,
    pub year: String,
    pub name: String,
}

#[derive(Debug, Serialize)]
struct FileError {
    file: String,
    error: String,
    #[serde(rename = "type")]
    kind: ErrorKind,
}

#[derive(Debug, Default, Serialize)]
struct FileSetPayload {
    status: &'static str,
    files_collected: usize,
    files_skipped: usize,
    total_size_bytes: u64,
    errors: Vec<FileError>,
}

pub struct FileSetJob {
    name: String,
    files: Vec<SourceFile>,
    check: Option<Arc<dyn ContentCheck>>,
    cadence: Cadence,
    transfer: IdempotentTransfer,
}

impl FileSetJob {
    pub fn new(name: impl Into<String>, files: Vec<SourceFile>, transfer: IdempotentTransfer) -> Self {
        Self {
            name: name.into(),
            files,
            check: None,
            cadence: Cadence::default(),
            transfer,
        }
    }

    pub fn with_cadence(mut self, cadence: Cadence) -> Self {
        self.cadence = cadence;
        self
    }

    pub fn with_check(mut self, check: Arc<dyn ContentCheck>) -> Self {
        self.check = Some(check);
        self
    }

    /// Resolve year (default: current UTC year) and file name (default: from URL).
    pub fn from_config(cfg: &CollectorConfig, transfer: IdempotentTransfer) -> Self {
        let this_year = Utc::now().year().to_string();
        let files = cfg
            .files
            .iter()
            .map(|f| SourceFile {
                url: f.url.clone(),
                year: f.year.clone().unwrap_or_else(|| this_year.clone()),
                name: f.name.clone().unwrap_or_else(|| derive_filename(&f.url)),
            })
            .collect();
        let mut job = Self::new(&cfg.name, files, transfer);
        job.check = cfg.check.map(|k| Arc::from(check_for(k)));
        job.cadence = cfg.cadence;
        job
    }

    pub fn files(&self) -> &[SourceFile] {
        &self.files
    }
}

#[async_trait]
impl Job for FileSetJob {
    fn name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            needs_transfer: true,
            validates_own_output: self.check.is_some(),
        }
    }

    fn cadence(&self) -> Cadence {
        self.cadence
    }

    async fn execute(&self) -> RunOutcome {
        let started = Utc::now();
        let mut payload = FileSetPayload::default();

        for file in &self.files {
            let key = keys::raw(&self.name, &file.year, &file.name);
            match self
                .transfer
                .fetch_if_needed(&file.url, &key, self.check.clone())
                .await
            {
                TransferOutcome::Uploaded { size, .. } => {
                    payload.files_collected += 1;
                    payload.total_size_bytes += size;
                }
                TransferOutcome::Skipped { .. } => payload.files_skipped += 1,
                TransferOutcome::Failed { error, .. } => payload.errors.push(FileError {
                    file: file.name.clone(),
                    error: error.to_string(),
                    kind: error.kind(),
                }),
            }
        }

        let failed = payload.errors.len();
        payload.status = if failed == 0 { "success" } else { "failed" };
        let body = serde_json::to_value(&payload).unwrap_or_default();
        if failed == 0 {
            RunOutcome::success(&self.name, started, body)
        } else {
            // The first failure's kind stands for the job.
            let kind = payload.errors[0].kind;
            let message = format!("{} of {} files failed", failed, self.files.len());
            RunOutcome::failed(&self.name, started, JobError::new(kind, message)).with_payload(body)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CheckKind, SourceFileConfig};
    use crate::gate::{LastRunSource, ScheduleGate};
    use crate::object_store::{FsObjectStore, ObjectStore};
    use crate::report::RunStatus;
    use crate::retry::{RetryPolicy, TransferError};
    use crate::transfer::{FileFingerprint, Source};
    use std::collections::HashMap;
    use std::path::Path;
    use std::time::Duration;

    /// Serves fixed bodies by URL; unknown URLs are 404s.
    struct MapSource(HashMap<String, Vec<u8>>);

    impl MapSource {
        fn lookup(&self, url: &str) -> Result<&Vec<u8>, TransferError> {
            self.0.get(url).ok_or_else(|| TransferError::Http {
                status: 404,
                url: url.to_string(),
            })
        }
    }

    impl Source for MapSource {
        fn probe(&self, url: &str, _t: Duration) -> Result<FileFingerprint, TransferError> {
            Ok(FileFingerprint::new(self.lookup(url)?.len() as u64, None))
        }

        fn fetch(
            &self,
            url: &str,
            dest: &Path,
            _expected: Option<u64>,
            _t: Duration,
        ) -> Result<u64, TransferError> {
            let body = self.lookup(url)?;
            std::fs::write(dest, body)?;
            Ok(body.len() as u64)
        }
    }

    fn setup(dir: &Path) -> (Arc<FsObjectStore>, IdempotentTransfer) {
        let mut bodies = HashMap::new();
        bodies.insert("https://data.example/a.json".to_string(), b"{\"a\":1}".to_vec());
        bodies.insert("https://data.example/b.json".to_string(), b"[1,2,3]".to_vec());
        let store = Arc::new(FsObjectStore::new(dir.join("bucket")));
        let policy = RetryPolicy {
            max_attempts: 2,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(1),
            attempt_timeout: Duration::from_secs(1),
        };
        let t = IdempotentTransfer::new(Arc::new(MapSource(bodies)), store.clone(), policy)
            .with_work_dir(dir.join("work"));
        (store, t)
    }

    fn config(urls: &[&str]) -> CollectorConfig {
        CollectorConfig {
            name: "ban".into(),
            files: urls
                .iter()
                .map(|u| SourceFileConfig {
                    url: u.to_string(),
                    year: Some("2024".into()),
                    name: None,
                })
                .collect(),
            check: Some(CheckKind::Json),
            cadence: Cadence::Yearly,
        }
    }

    #[tokio::test]
    async fn collects_then_skips_on_rerun() {
        let dir = tempfile::tempdir().unwrap();
        let (store, t) = setup(dir.path());
        let job = FileSetJob::from_config(
            &config(&["https://data.example/a.json", "https://data.example/b.json"]),
            t,
        );
        assert!(job.capabilities().validates_own_output);

        let first = job.execute().await;
        assert_eq!(first.status, RunStatus::Success);
        let p = first.payload.unwrap();
        assert_eq!(p["files_collected"], 2);
        assert_eq!(p["total_size_bytes"], 14);
        assert!(store.stat("raw/ban/2024/a.json").await.unwrap().is_some());

        let second = job.execute().await;
        let p = second.payload.unwrap();
        assert_eq!(p["files_collected"], 0);
        assert_eq!(p["files_skipped"], 2);
    }

    #[tokio::test]
    async fn one_bad_file_does_not_stop_the_rest() {
        let dir = tempfile::tempdir().unwrap();
        let (store, t) = setup(dir.path());
        let job = FileSetJob::from_config(
            &config(&["https://data.example/missing.zip", "https://data.example/b.json"]),
            t,
        );
        let o = job.execute().await;
        assert_eq!(o.status, RunStatus::Failed);
        assert_eq!(o.error.as_ref().unwrap().kind, ErrorKind::Network);
        let p = o.payload.unwrap();
        assert_eq!(p["status"], "failed");
        assert_eq!(p["files_collected"], 1);
        assert_eq!(p["errors"][0]["file"], "missing.zip");
        assert_eq!(p["errors"][0]["type"], "NetworkError");
        assert!(store.stat("raw/ban/2024/b.json").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn run_collector_records_success() {
        let dir = tempfile::tempdir().unwrap();
        let (store, t) = setup(dir.path());
        let ledger = crate::ledger::RunLedger::new(store);
        let job = FileSetJob::from_config(&config(&["https://data.example/a.json"]), t);
        let o = super::super::run_collector(&job, None, Some(&ledger)).await;
        assert!(o.is_success());
        assert!(ledger.last_run("ban").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn recent_success_gates_the_next_collect() {
        let dir = tempfile::tempdir().unwrap();
        let (store, t) = setup(dir.path());
        let ledger = Arc::new(crate::ledger::RunLedger::new(store));
        let gate = ScheduleGate::new(ledger.clone());
        let job = FileSetJob::from_config(&config(&["https://data.example/a.json"]), t);
        assert_eq!(job.cadence(), Cadence::Yearly);

        let first = super::super::run_collector(&job, Some(&gate), Some(ledger.as_ref())).await;
        assert!(first.is_success());
        let recorded = ledger.last_run("ban").await.unwrap().unwrap();

        let second = super::super::run_collector(&job, Some(&gate), Some(ledger.as_ref())).await;
        assert_eq!(second.status, RunStatus::Skipped);
        assert_eq!(second.payload.unwrap()["status"], "skipped");
        // execute() never ran: the ledger still holds the first run.
        assert_eq!(ledger.last_run("ban").await.unwrap().unwrap(), recorded);

        let ungated = ScheduleGate::new(ledger.clone()).enabled(false);
        let third = super::super::run_collector(&job, Some(&ungated), Some(ledger.as_ref())).await;
        assert!(third.is_success());
    }
}
