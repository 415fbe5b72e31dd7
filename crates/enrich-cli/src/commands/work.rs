//! Work command - process pending jobs.
//!
//! The binary ships no network provider; jobs are generated by the stub
//! provider, which makes this a dry run of the pipeline.

use std::sync::Arc;

use colored::Colorize;

use enrich::{EnrichConfig, JobRunner, StubProvider, WorkerPool};

use super::{CommandResult, Context};

pub async fn run(config: &EnrichConfig, until_idle: bool) -> CommandResult {
    let ctx = Context::open(config).await?;

    let runner = JobRunner::new(ctx.store.clone(), Arc::new(StubProvider::new()), ctx.codec)
        .with_limits(config.output_limits.clone());
    let pool = WorkerPool::new(ctx.store, Arc::new(runner))
        .with_batch_limit(config.batch_limit)
        .with_concurrency(config.worker_concurrency);

    let report = if until_idle {
        pool.run_until_idle().await?
    } else {
        pool.run_batch().await?
    };

    if report.fetched == 0 {
        println!("{}", "No pending jobs.".dimmed());
        return Ok(());
    }

    println!("{}", "Worker report:".cyan().bold());
    println!("  Fetched:         {}", report.fetched.to_string().white());
    println!(
        "  Awaiting review: {}",
        report.awaiting_review.to_string().yellow()
    );
    println!("  Failed:          {}", report.failed.to_string().red());
    if report.skipped > 0 {
        println!("  Skipped:         {}", report.skipped.to_string().dimmed());
    }
    if report.errors > 0 {
        println!("  Store errors:    {}", report.errors.to_string().red().bold());
    }
    Ok(())
}
