//! Queue-mode backend: durable work items in SQLite (via sqlx).
//!
//! The dispatcher only enqueues; a separate worker (`scheduler::drain_queue`)
//! claims items, invokes them, and marks them done or failed.

mod db;
mod tasks;
pub mod types;

#[cfg(test)]
mod tests;

use anyhow::Result;
use async_trait::async_trait;

pub use db::SqliteTaskQueue;
pub use types::*;

/// Anything that can accept a work item and hand back a dispatch handle.
#[async_trait]
pub trait TaskQueue: Send + Sync {
    async fn enqueue(&self, item: &WorkItem) -> Result<TaskHandle>;
}
