//! Reject command - discard a job's output.

use colored::Colorize;
use uuid::Uuid;

use enrich::EnrichConfig;

use super::{CommandResult, Context};

pub async fn run(
    config: &EnrichConfig,
    job_id: Uuid,
    moderator: String,
    reason: Option<String>,
) -> CommandResult {
    let ctx = Context::open(config).await?;
    let job = ctx
        .controller
        .reject(job_id, &moderator, reason.as_deref())
        .await?;

    let reason = job.error.map(|e| e.message).unwrap_or_default();
    println!(
        "{} {} by {}: {}",
        "Rejected".magenta().bold(),
        job.id.to_string().white().bold(),
        moderator,
        reason.dimmed()
    );
    Ok(())
}
