//! History command - print an entity's change history.

use colored::Colorize;

use enrich::EnrichConfig;

use super::{CommandResult, Context};

pub async fn run(config: &EnrichConfig, entity_id: String, json_output: bool) -> CommandResult {
    let ctx = Context::open(config).await?;
    let entries = ctx.controller.history(&entity_id).await?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("{} {}", "No history for".dimmed(), entity_id);
        return Ok(());
    }

    println!("{} {}", "History for".cyan().bold(), entity_id.white().bold());
    for entry in &entries {
        println!();
        println!(
            "{}  {}  {}",
            entry.created_at.format("%Y-%m-%d %H:%M:%S"),
            entry.action.yellow(),
            entry.actor
        );
        if let Some(before) = &entry.before {
            println!("  {} {}", "before:".red(), before);
        }
        println!("  {} {}", "after: ".green(), entry.after);
    }
    Ok(())
}
