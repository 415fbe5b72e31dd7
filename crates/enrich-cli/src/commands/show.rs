//! Show command - inspect a job and preview its changes.

use colored::Colorize;
use uuid::Uuid;

use enrich::{Diff, EnrichConfig};

use super::{status_colored, CommandResult, Context};

pub async fn run(config: &EnrichConfig, job_id: Uuid, json_output: bool) -> CommandResult {
    let ctx = Context::open(config).await?;
    let job = ctx.controller.job(job_id).await?;
    let diff = if job.output.is_some() {
        Some(ctx.controller.preview(job_id).await?)
    } else {
        None
    };

    if json_output {
        let view = serde_json::json!({
            "job": job,
            "diff": diff,
        });
        println!("{}", serde_json::to_string_pretty(&view)?);
        return Ok(());
    }

    println!(
        "{} {}",
        "Job".cyan().bold(),
        job.id.to_string().white().bold()
    );
    println!("  Entity:  {}", job.entity_id);
    println!("  Type:    {}", job.job_type.as_str());
    println!("  Status:  {}", status_colored(job.status));
    println!("  Created: {}", job.created_at.format("%Y-%m-%d %H:%M:%S"));
    if let Some(at) = job.completed_at {
        println!("  Completed: {}", at.format("%Y-%m-%d %H:%M:%S"));
    }
    if let (Some(by), Some(at)) = (&job.approved_by, job.approved_at) {
        println!("  Approved by {} at {}", by, at.format("%Y-%m-%d %H:%M:%S"));
    }
    if let Some(error) = &job.error {
        println!("  Error:   {}", error.message.red());
    }
    println!();

    match diff {
        Some(diff) if diff.is_empty() => {
            println!("{}", "Output matches the entity; nothing to apply.".dimmed())
        }
        Some(diff) => {
            println!(
                "{} ({} changes)",
                "Proposed changes:".yellow().bold(),
                diff.change_count()
            );
            print_diff(&diff);
        }
        None => println!("{}", "No output yet.".dimmed()),
    }
    Ok(())
}

/// Print a diff as before/after lines.
pub fn print_diff(diff: &Diff) {
    if diff.description_changed {
        println!("  {}", "description".cyan());
        if let Some(before) = &diff.description_before {
            println!("    {} {}", "-".red(), before.red());
        }
        if let Some(after) = &diff.description_after {
            println!("    {} {}", "+".green(), after.green());
        }
        for highlight in diff.highlights.iter().flatten() {
            println!("    {} {}", "*".green(), highlight);
        }
    }

    for change in &diff.attribute_changes {
        println!("  {} ({})", change.code.cyan(), change.label.dimmed());
        if let Some(before) = &change.before {
            println!("    {} {}", "-".red(), before.to_json().to_string().red());
        }
        println!(
            "    {} {}",
            "+".green(),
            change.after.to_json().to_string().green()
        );
    }
}
