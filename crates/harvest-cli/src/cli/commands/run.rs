//! `harvest run` – one dispatch cycle.

use anyhow::Result;
use harvest_core::report::CycleStatus;
use harvest_core::scheduler::JobDispatcher;
use harvest_core::trigger::TriggerMode;

use crate::cli::context::Context;

/// Exit code when at least one job failed.
const EXIT_PARTIAL: i32 = 2;

pub async fn run_cycle(ctx: &Context, only: &[String]) -> Result<i32> {
    let mode = TriggerMode::select(&ctx.cfg.scheduler, &ctx.env);
    let trigger = mode.build(&ctx.cfg, &ctx.env).await;
    let dispatcher =
        JobDispatcher::from_config(&ctx.cfg, trigger, ctx.gate(), ctx.recorder(), ctx.ledger());

    let jobs: Vec<_> = ctx
        .cfg
        .jobs
        .iter()
        .filter(|j| only.is_empty() || only.contains(&j.name))
        .cloned()
        .collect();
    if jobs.is_empty() {
        println!("No jobs configured.");
        return Ok(0);
    }

    let report = dispatcher.run_cycle(&jobs).await;
    let out = serde_json::json!({
        "status": report.cycle_status(),
        "http_status": report.http_status(),
        "mode": format!("{:?}", mode).to_lowercase(),
        "duration_seconds": report.duration_seconds,
        "summary": report.summary,
    });
    println!("{}", serde_json::to_string_pretty(&out)?);

    Ok(match report.cycle_status() {
        CycleStatus::Succeeded => 0,
        CycleStatus::Partial => EXIT_PARTIAL,
    })
}
