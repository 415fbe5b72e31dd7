//! Rerun command - reset a finished job to pending.

use colored::Colorize;
use uuid::Uuid;

use enrich::EnrichConfig;

use super::{status_colored, CommandResult, Context};

pub async fn run(config: &EnrichConfig, job_id: Uuid) -> CommandResult {
    let ctx = Context::open(config).await?;
    let job = ctx.controller.rerun(job_id).await?;
    println!(
        "{} {} [{}]",
        "Re-queued".green().bold(),
        job.id.to_string().white().bold(),
        status_colored(job.status)
    );
    Ok(())
}
