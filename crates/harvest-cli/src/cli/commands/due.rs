//! `harvest due` – gate decision per configured job and collector.

use anyhow::Result;

use crate::cli::context::Context;

pub async fn run_due(ctx: &Context) -> Result<i32> {
    let gate = ctx.gate();
    println!("{:<24} {:<8} {:<8} {}", "JOB", "CADENCE", "ENABLED", "DUE");
    for job in &ctx.cfg.jobs {
        let due = if job.enabled {
            if gate.is_due(&job.name, job.cadence).await {
                "yes"
            } else {
                "no"
            }
        } else {
            "-"
        };
        println!(
            "{:<24} {:<8} {:<8} {}",
            job.name,
            format!("{:?}", job.cadence).to_lowercase(),
            job.enabled,
            due
        );
    }
    for collector in &ctx.cfg.collectors {
        let due = if gate.is_due(&collector.name, collector.cadence).await {
            "yes"
        } else {
            "no"
        };
        println!(
            "{:<24} {:<8} {:<8} {}",
            collector.name,
            format!("{:?}", collector.cadence).to_lowercase(),
            true,
            due
        );
    }
    Ok(0)
}
