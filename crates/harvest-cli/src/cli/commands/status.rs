//! `harvest status` – show the latest execution report.

use anyhow::Result;

use crate::cli::context::Context;

pub async fn run_status(ctx: &Context) -> Result<i32> {
    let Some(report) = ctx.recorder().last().await else {
        println!("No previous execution.");
        return Ok(0);
    };
    println!(
        "last cycle {} ({:.1}s): {} total, {} succeeded, {} failed, {} skipped, {} scheduled",
        report.start_time.format("%Y-%m-%d %H:%M:%S UTC"),
        report.duration_seconds,
        report.summary.total,
        report.summary.succeeded,
        report.summary.failed,
        report.summary.skipped,
        report.summary.scheduled,
    );
    println!("{:<24} {:<10} {:>9} {}", "JOB", "STATUS", "SECONDS", "DETAIL");
    for (name, o) in &report.jobs {
        let detail = match (&o.error, &o.task) {
            (Some(e), _) => e.to_string(),
            (None, Some(task)) => task.clone(),
            (None, None) => String::new(),
        };
        println!(
            "{:<24} {:<10} {:>9.1} {}",
            name,
            o.status.as_str(),
            o.duration_seconds,
            detail
        );
    }
    Ok(0)
}
