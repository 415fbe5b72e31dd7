//! Approve command - apply a reviewed job.

use colored::Colorize;
use uuid::Uuid;

use enrich::EnrichConfig;

use super::show::print_diff;
use super::{CommandResult, Context};

pub async fn run(config: &EnrichConfig, job_id: Uuid, moderator: String) -> CommandResult {
    let ctx = Context::open(config).await?;
    let approval = ctx.controller.approve(job_id, &moderator).await?;

    println!(
        "{} {} by {}",
        "Approved".green().bold(),
        approval.job.id.to_string().white().bold(),
        moderator
    );
    if approval.diff.is_empty() {
        println!("{}", "No entity changes were needed.".dimmed());
    } else {
        print_diff(&approval.diff);
    }
    Ok(())
}
