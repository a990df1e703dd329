//! Types stored in the task queue.

use serde::{Deserialize, Serialize};
use std::fmt;

pub type TaskId = i64;

/// Work item state stored as a string in the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    Queued,
    Running,
    Done,
    Failed,
}

impl TaskState {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskState::Queued => "queued",
            TaskState::Running => "running",
            TaskState::Done => "done",
            TaskState::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "queued" => TaskState::Queued,
            "running" => TaskState::Running,
            "done" => TaskState::Done,
            _ => TaskState::Failed,
        }
    }
}

/// One job invocation to run out-of-band.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItem {
    pub job_name: String,
    pub method: String,
    pub url: String,
    /// Service account whose identity token the worker attaches.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity_token: Option<String>,
}

impl WorkItem {
    pub fn post(job_name: &str, url: &str, identity_token: Option<String>) -> Self {
        Self {
            job_name: job_name.to_string(),
            method: "POST".to_string(),
            url: url.to_string(),
            identity_token,
        }
    }
}

/// Dispatch handle returned by `enqueue`, e.g. `tasks/42`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskHandle(pub String);

impl TaskHandle {
    pub fn for_id(id: TaskId) -> Self {
        TaskHandle(format!("tasks/{}", id))
    }

    pub fn id(&self) -> Option<TaskId> {
        self.0.strip_prefix("tasks/")?.parse().ok()
    }
}

impl fmt::Display for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Full task row.
#[derive(Debug, Clone)]
pub struct QueuedTask {
    pub id: TaskId,
    pub item: WorkItem,
    pub state: TaskState,
    pub attempts: i64,
    pub last_error: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}
