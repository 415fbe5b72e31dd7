//! Entity command - seed an entity and its attribute values.

use chrono::Utc;
use colored::Colorize;
use serde_json::Value;

use enrich::{AttributeValue, EnrichConfig, Entity, ValueSource};

use super::{CommandResult, Context};

pub async fn run(
    config: &EnrichConfig,
    id: String,
    name: String,
    description: Option<String>,
    values: Vec<String>,
) -> CommandResult {
    let ctx = Context::open(config).await?;

    // Validate every value before writing anything.
    let now = Utc::now();
    let mut writes = Vec::with_capacity(values.len());
    for pair in &values {
        let (code, raw) = pair
            .split_once('=')
            .ok_or_else(|| format!("Expected CODE=JSON, got '{}'", pair))?;
        let code = code.trim();
        let raw: Value =
            serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
        let value = ctx.codec.encode_attribute(code, &raw)?;
        writes.push(AttributeValue {
            entity_id: id.clone(),
            attribute_code: code.to_string(),
            value,
            source: ValueSource::Editorial,
            last_verified_at: now,
        });
    }

    let mut entity = Entity::new(id, name);
    entity.description = description;
    ctx.store.insert_entity(&entity).await?;
    for write in &writes {
        ctx.store.set_attribute(write).await?;
    }

    println!(
        "{} {} ({})",
        "Saved entity".green().bold(),
        entity.id.white().bold(),
        entity.name
    );
    for write in &writes {
        println!(
            "  {} = {}",
            write.attribute_code.cyan(),
            write.value.to_json()
        );
    }
    Ok(())
}
