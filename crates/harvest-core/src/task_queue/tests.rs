//! Tests for task_queue (in-memory DB helper from db).

use super::db::open_memory;
use super::{TaskHandle, TaskQueue, TaskState, WorkItem};

#[tokio::test]
async fn enqueue_returns_handle_and_row() {
    let q = open_memory().await.unwrap();
    let item = WorkItem::post(
        "dvf",
        "https://fn.example/dvf",
        Some("scheduler@example.iam".into()),
    );
    let handle = q.enqueue(&item).await.unwrap();
    assert_eq!(handle.id(), Some(1));
    assert_eq!(handle.to_string(), "tasks/1");

    let tasks = q.list().await.unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].item, item);
    assert_eq!(tasks[0].state, TaskState::Queued);
    assert_eq!(tasks[0].attempts, 0);
}

#[tokio::test]
async fn claim_is_fifo_and_exclusive() {
    let q = open_memory().await.unwrap();
    q.enqueue(&WorkItem::post("a", "https://x/a", None)).await.unwrap();
    q.enqueue(&WorkItem::post("b", "https://x/b", None)).await.unwrap();

    let first = q.claim_next().await.unwrap().unwrap();
    assert_eq!(first.item.job_name, "a");
    assert_eq!(first.state, TaskState::Running);
    assert_eq!(first.attempts, 1);
    let second = q.claim_next().await.unwrap().unwrap();
    assert_eq!(second.item.job_name, "b");
    assert!(q.claim_next().await.unwrap().is_none());
}

#[tokio::test]
async fn done_and_failed_are_terminal() {
    let q = open_memory().await.unwrap();
    q.enqueue(&WorkItem::post("a", "https://x/a", None)).await.unwrap();
    q.enqueue(&WorkItem::post("b", "https://x/b", None)).await.unwrap();
    let a = q.claim_next().await.unwrap().unwrap();
    let b = q.claim_next().await.unwrap().unwrap();
    q.mark_done(a.id).await.unwrap();
    q.mark_failed(b.id, "HTTP 500: boom").await.unwrap();

    assert_eq!(q.recover_running().await.unwrap(), 0);
    let tasks = q.list().await.unwrap();
    assert_eq!(tasks[0].state, TaskState::Done);
    assert_eq!(tasks[1].state, TaskState::Failed);
    assert_eq!(tasks[1].last_error.as_deref(), Some("HTTP 500: boom"));
}

#[tokio::test]
async fn recover_running_requeues() {
    let q = open_memory().await.unwrap();
    q.enqueue(&WorkItem::post("a", "https://x/a", None)).await.unwrap();
    q.claim_next().await.unwrap().unwrap();
    assert_eq!(q.recover_running().await.unwrap(), 1);
    let again = q.claim_next().await.unwrap().unwrap();
    assert_eq!(again.attempts, 2);
}

#[tokio::test]
async fn open_at_creates_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state/tasks.db");
    let q = super::SqliteTaskQueue::open_at(&path).await.unwrap();
    q.enqueue(&WorkItem::post("a", "https://x/a", None)).await.unwrap();
    assert!(path.exists());
    assert_eq!(TaskHandle("tasks/x".into()).id(), None);
}
