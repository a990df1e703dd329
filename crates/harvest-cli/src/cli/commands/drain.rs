//! `harvest drain` – run queued work items until the queue is empty.

use anyhow::Result;
use harvest_core::scheduler::drain_queue;
use harvest_core::task_queue::SqliteTaskQueue;
use harvest_core::trigger::direct_trigger;

use crate::cli::context::Context;

pub async fn run_drain(ctx: &Context) -> Result<i32> {
    let queue = match &ctx.cfg.scheduler.queue_db {
        Some(path) => SqliteTaskQueue::open_at(path).await?,
        None => SqliteTaskQueue::open_default().await?,
    };
    let trigger = direct_trigger(&ctx.cfg, &ctx.env);
    let ledger = ctx.ledger();
    let summary = drain_queue(&queue, trigger.as_ref(), Some(&ledger), &ctx.cfg.jobs).await?;
    println!(
        "processed {} task(s): {} done, {} failed",
        summary.processed, summary.succeeded, summary.failed
    );
    Ok(if summary.failed == 0 { 0 } else { 2 })
}
