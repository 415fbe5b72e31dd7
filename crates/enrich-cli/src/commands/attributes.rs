//! Attributes command - list the attribute catalog.

use colored::Colorize;

use enrich::{AttributeDefinition, AttributeRegistry, Tier};

use super::CommandResult;

pub fn run(tier: Option<Tier>, json_output: bool, verbose: bool) -> CommandResult {
    let registry = AttributeRegistry::builtin();
    let definitions: Vec<&AttributeDefinition> = match tier {
        Some(tier) => registry.by_tier(tier).collect(),
        None => registry.list().collect(),
    };

    if json_output {
        println!("{}", serde_json::to_string_pretty(&definitions)?);
        return Ok(());
    }

    for definition in &definitions {
        println!(
            "{:<24} {:<14} {:<7} {}",
            definition.code.cyan(),
            definition.data_type.as_str(),
            definition.tier.label(),
            definition.label
        );
        if verbose && !definition.guidance.is_empty() {
            println!("    {}", definition.guidance.dimmed());
        }
    }
    println!();
    println!("{} attributes", definitions.len().to_string().white().bold());
    Ok(())
}
