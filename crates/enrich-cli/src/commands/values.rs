//! Values command - print an entity's stored attribute values.

use colored::Colorize;

use enrich::store::EntityStore;
use enrich::EnrichConfig;

use super::{CommandResult, Context};

pub async fn run(config: &EnrichConfig, entity_id: String, json_output: bool) -> CommandResult {
    let ctx = Context::open(config).await?;
    let values = ctx.store.attribute_values(&entity_id).await?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&values)?);
        return Ok(());
    }

    if values.is_empty() {
        println!("{} {}", "No values for".dimmed(), entity_id);
        return Ok(());
    }

    println!("{} {}", "Values for".cyan().bold(), entity_id.white().bold());
    for value in &values {
        println!(
            "  {:<28} {:<40} {} {}",
            value.attribute_code.yellow(),
            value.value.to_json().to_string(),
            value.source.as_str().dimmed(),
            value.last_verified_at.format("%Y-%m-%d %H:%M:%S").to_string().dimmed()
        );
    }
    Ok(())
}
