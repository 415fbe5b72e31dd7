//! Enqueue command - queue an enrichment job.

use colored::Colorize;

use enrich::{EnrichConfig, JobType};

use super::{status_colored, CommandResult, Context};

pub async fn run(
    config: &EnrichConfig,
    entity_id: String,
    job_type: String,
    input: Option<String>,
) -> CommandResult {
    let job_type: JobType = job_type.parse()?;
    let input = input.as_deref().map(serde_json::from_str::<serde_json::Value>).transpose()?;

    let ctx = Context::open(config).await?;
    let outcome = ctx
        .controller
        .enqueue_with_input(&entity_id, job_type, input)
        .await?;

    let headline = if outcome.created {
        "Queued".green().bold()
    } else {
        "Already pending".yellow().bold()
    };
    println!(
        "{} {} job {} for {} [{}]",
        headline,
        job_type.as_str(),
        outcome.job.id.to_string().white().bold(),
        entity_id,
        status_colored(outcome.job.status)
    );
    Ok(())
}
