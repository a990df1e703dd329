//! Remote job invocation: direct HTTP call or queued work item.
//!
//! The mode is chosen once, when the dispatcher is built, and never
//! re-evaluated during a cycle.

mod direct;
mod queue;
mod token;

pub use direct::DirectTrigger;
pub use queue::QueueTrigger;
pub use token::{FileSecretStore, SecretStore, TokenResolver};

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::{EnvSettings, HarvestConfig, JobConfig, SchedulerConfig};
use crate::report::RunOutcome;
use crate::task_queue::SqliteTaskQueue;

/// Runs one job and reports its outcome. Never fails: errors become `failed` outcomes.
#[async_trait]
pub trait Trigger: Send + Sync {
    async fn invoke(&self, job: &JobConfig) -> RunOutcome;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerMode {
    Direct,
    Queue,
}

impl TriggerMode {
    /// Queue mode only when requested and the environment can address the queue.
    pub fn select(cfg: &SchedulerConfig, env: &EnvSettings) -> Self {
        if !cfg.use_queue {
            return TriggerMode::Direct;
        }
        if !env.has_queue_identifiers() {
            tracing::warn!("queue mode requested but project/region not set, using direct mode");
            return TriggerMode::Direct;
        }
        TriggerMode::Queue
    }

    /// Build the trigger for this mode. A queue that cannot be opened falls back to direct.
    pub async fn build(self, cfg: &HarvestConfig, env: &EnvSettings) -> Arc<dyn Trigger> {
        let sched = &cfg.scheduler;
        if self == TriggerMode::Queue {
            let opened = match &sched.queue_db {
                Some(path) => SqliteTaskQueue::open_at(path).await,
                None => SqliteTaskQueue::open_default().await,
            };
            match opened {
                Ok(q) => {
                    tracing::info!(queue = %sched.queue_name, "dispatching through task queue");
                    return Arc::new(QueueTrigger::new(
                        Arc::new(q),
                        sched.base_url.clone(),
                        sched.service_account_email.clone(),
                    ));
                }
                Err(e) => {
                    tracing::warn!(error = %format!("{:#}", e), "task queue unavailable, using direct mode");
                }
            }
        }
        direct_trigger(cfg, env)
    }
}

pub fn direct_trigger(cfg: &HarvestConfig, env: &EnvSettings) -> Arc<dyn Trigger> {
    Arc::new(DirectTrigger::new(
        cfg.scheduler.base_url.clone(),
        TokenResolver::from_config(&cfg.scheduler, env),
    ))
}
