//! Jobs command - list jobs with filters.

use colored::Colorize;

use enrich::{EnrichConfig, JobFilter, JobStatus, JobType};

use super::{status_colored, CommandResult, Context};

pub async fn run(
    config: &EnrichConfig,
    status: Option<String>,
    entity: Option<String>,
    job_type: Option<String>,
    limit: usize,
    json_output: bool,
) -> CommandResult {
    let mut filter = JobFilter::default().with_limit(limit);
    if let Some(status) = status {
        filter.status = Some(status.parse::<JobStatus>()?);
    }
    if let Some(entity) = entity {
        filter = filter.with_entity(entity);
    }
    if let Some(job_type) = job_type {
        filter = filter.with_job_type(job_type.parse::<JobType>()?);
    }

    let ctx = Context::open(config).await?;
    let jobs = ctx.controller.jobs(&filter).await?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&jobs)?);
        return Ok(());
    }

    if jobs.is_empty() {
        println!("{}", "No jobs found.".dimmed());
        return Ok(());
    }

    println!(
        "{:<36}  {:<16}  {:<16}  {:<15}  {}",
        "ID".bold(),
        "ENTITY".bold(),
        "TYPE".bold(),
        "STATUS".bold(),
        "CREATED".bold()
    );
    for job in &jobs {
        println!(
            "{:<36}  {:<16}  {:<16}  {:<15}  {}",
            job.id.to_string(),
            job.entity_id,
            job.job_type.as_str(),
            status_colored(job.status),
            job.created_at.format("%Y-%m-%d %H:%M")
        );
    }
    Ok(())
}
