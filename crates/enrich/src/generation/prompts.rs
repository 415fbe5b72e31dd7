//! Prompt templates for enrichment generation.

use crate::attribute::AttributeRegistry;
use crate::store::EntitySnapshot;

use super::provider::{Prompt, PromptKind};

fn known_facts(entity: &EntitySnapshot, registry: &AttributeRegistry) -> Vec<String> {
    entity
        .attributes
        .iter()
        .filter_map(|(code, row)| {
            let value = row.decode()?;
            let label = registry
                .lookup(code)
                .map(|def| def.label.as_str())
                .unwrap_or(code.as_str());
            Some(format!("{}: {}", label, value.to_json()))
        })
        .collect()
}

/// Build a prompt for a summary and highlights.
pub fn description_prompt(entity: &EntitySnapshot, registry: &AttributeRegistry) -> Prompt {
    let mut context = vec![format!("Name: {}", entity.entity.name)];
    if let Some(description) = entity.description() {
        context.push(format!("Current description: {}", description));
    }
    context.extend(known_facts(entity, registry));

    let context = context
        .iter()
        .map(|line| format!("- {}", line))
        .collect::<Vec<_>>()
        .join("\n");

    Prompt::new(
        PromptKind::Description,
        format!(
            r#"You are a copywriter for an experiential venue guide.
Write a JSON object with:
  - summary: a 2 sentence overview (max 55 words) highlighting vibe, audience, and any signature offerings.
  - highlights: array of exactly 3 bullets, each <= 12 words, concrete amenities or perks.

Important:
- Never invent details; rely only on provided context.
- Output valid JSON only with keys {{"summary", "highlights"}}.

Context:
{}"#,
            context
        ),
    )
}

/// Build a prompt for structured attribute values.
pub fn attributes_prompt(entity: &EntitySnapshot, registry: &AttributeRegistry) -> Prompt {
    let guidance = registry
        .list()
        .map(|def| {
            let hint = if def.guidance.is_empty() {
                def.data_type.as_str()
            } else {
                def.guidance.as_str()
            };
            format!("- {} ({}): {}", def.code, def.data_type, hint)
        })
        .collect::<Vec<_>>()
        .join("\n");

    let facts = known_facts(entity, registry);
    let facts = if facts.is_empty() {
        "none recorded".to_string()
    } else {
        facts.join("; ")
    };

    Prompt::new(
        PromptKind::Attributes,
        format!(
            r#"You are a classifier converting venue details into structured attributes.
Return a JSON object with key "attributes", mapping attribute codes to values.

Supported attribute codes:
{}

Rules:
- Boolean values must be true/false.
- Lists must be arrays of strings.
- If data is unknown, omit the code entirely.
- Never fabricate details.

Venue:
Name: {}
Existing description: {}
Known attributes: {}"#,
            guidance,
            entity.entity.name,
            entity.description().unwrap_or("n/a"),
            facts
        ),
    )
}

#[cfg(test)]
mod tests {
    use indexmap::IndexMap;

    use super::*;
    use crate::codec::{CanonicalValue, StorageRow};
    use crate::store::Entity;

    fn snapshot() -> EntitySnapshot {
        let mut attributes = IndexMap::new();
        attributes.insert("wifi".to_string(), StorageRow::from(&CanonicalValue::Bool(true)));
        EntitySnapshot {
            entity: Entity::new("pub-1", "The Tap Room").with_description("Neighbourhood bar."),
            attributes,
        }
    }

    #[test]
    fn test_description_prompt_includes_context() {
        let prompt = description_prompt(&snapshot(), &AttributeRegistry::builtin());
        assert_eq!(prompt.kind, PromptKind::Description);
        assert!(prompt.text.contains("Name: The Tap Room"));
        assert!(prompt.text.contains("Current description: Neighbourhood bar."));
        assert!(prompt.text.contains("WiFi Availability: true"));
    }

    #[test]
    fn test_attributes_prompt_lists_codes() {
        let prompt = attributes_prompt(&snapshot(), &AttributeRegistry::builtin());
        assert_eq!(prompt.kind, PromptKind::Attributes);
        assert!(prompt.text.contains("- rooftop_seating (boolean):"));
        assert!(prompt.text.contains("- cost_for_two_range (integer_range):"));
        assert!(prompt.text.contains("Existing description: Neighbourhood bar."));
    }
}
