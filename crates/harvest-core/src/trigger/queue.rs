//! Queue mode: enqueue a work item and return `scheduled` without waiting.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

use super::Trigger;
use crate::config::JobConfig;
use crate::error::{ErrorKind, JobError};
use crate::report::RunOutcome;
use crate::task_queue::{TaskQueue, WorkItem};

#[derive(Clone)]
pub struct QueueTrigger {
    queue: Arc<dyn TaskQueue>,
    base_url: Option<String>,
    identity: Option<String>,
}

impl QueueTrigger {
    pub fn new(queue: Arc<dyn TaskQueue>, base_url: Option<String>, identity: Option<String>) -> Self {
        Self {
            queue,
            base_url,
            identity,
        }
    }
}

#[async_trait]
impl Trigger for QueueTrigger {
    async fn invoke(&self, job: &JobConfig) -> RunOutcome {
        let started = Utc::now();
        let Some(url) = job.invocation_url(self.base_url.as_deref()) else {
            return RunOutcome::failed(
                &job.name,
                started,
                JobError::new(ErrorKind::Configuration, "no invocation url"),
            );
        };
        let item = WorkItem::post(&job.name, &url, self.identity.clone());
        match self.queue.enqueue(&item).await {
            Ok(handle) => RunOutcome::scheduled(&job.name, started, handle.0),
            Err(e) => {
                tracing::warn!(job = %job.name, error = %format!("{:#}", e), "enqueue failed");
                RunOutcome::failed(
                    &job.name,
                    started,
                    JobError::network(format!("enqueue failed: {:#}", e)),
                )
            }
        }
    }
}
