//! `harvest collect <name>` – run a local collector in-process.

use anyhow::Result;
use harvest_core::collector::{run_collector, FileSetJob};
use harvest_core::transfer::{HttpSource, IdempotentTransfer};
use std::sync::Arc;

use crate::cli::context::Context;

pub async fn run_collect(ctx: &Context, name: &str) -> Result<i32> {
    let Some(collector) = ctx.cfg.collector(name) else {
        anyhow::bail!("no collector named {:?} in config", name);
    };
    let transfer = IdempotentTransfer::from_config(
        Arc::new(HttpSource::new()),
        Arc::clone(&ctx.store),
        &ctx.cfg.retry,
        &ctx.cfg.transfer,
    );
    let job = FileSetJob::from_config(collector, transfer);
    let ledger = ctx.ledger();
    let gate = ctx.gate();
    let outcome = run_collector(&job, Some(&gate), Some(&ledger)).await;
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(if outcome.is_failed() { 1 } else { 0 })
}
