//! Changeset computation.

use tracing::debug;

use crate::codec::ValueCodec;
use crate::error::{EnrichError, Result};
use crate::job::EnrichmentResult;
use crate::store::{AttributeSelection, EntitySnapshot, EntityStore};

use super::model::{AttributeChange, Diff};

/// Computes the minimal changeset a job's output would apply.
///
/// Unknown codes and values the codec rejects are dropped one by one; a bad
/// field never fails the whole diff.
#[derive(Debug, Clone)]
pub struct DiffEngine {
    codec: ValueCodec,
}

impl DiffEngine {
    /// Create a diff engine using the given codec.
    pub fn new(codec: ValueCodec) -> Self {
        Self { codec }
    }

    /// The codec used for encoding proposals.
    pub fn codec(&self) -> &ValueCodec {
        &self.codec
    }

    /// Attribute codes a result proposes values for.
    pub fn proposed_codes(result: &EnrichmentResult) -> Vec<String> {
        result
            .attributes
            .as_ref()
            .map(|attrs| attrs.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Diff a result against an already loaded snapshot.
    pub fn compute(&self, result: &EnrichmentResult, current: &EntitySnapshot) -> Diff {
        let mut diff = Diff::default();

        if let Some(summary) = result.summary.as_deref() {
            let proposed = summary.trim();
            let existing = current.description().map(str::trim).unwrap_or("");
            if proposed != existing {
                diff.description_changed = true;
                diff.description_before = current.description().map(str::to_string);
                diff.description_after = Some(proposed.to_string());
                diff.highlights = result.highlights.clone();
            }
        }

        let registry = self.codec.registry();
        for (code, raw) in result.attributes.iter().flatten() {
            let Some(definition) = registry.lookup(code) else {
                debug!(attribute = %code, "Dropping unknown attribute");
                continue;
            };

            let after = match self.codec.encode(definition.data_type, raw) {
                Ok(value) => value,
                Err(e) => {
                    debug!(attribute = %code, error = %e, "Dropping rejected value");
                    continue;
                }
            };

            let before = current.row(code).and_then(|row| self.codec.decode(row));
            if before.as_ref().is_some_and(|b| b.equivalent(&after)) {
                continue;
            }

            diff.attribute_changes.push(AttributeChange {
                code: code.clone(),
                label: definition.label.clone(),
                before,
                after,
            });
        }

        diff
    }

    /// Load the entity's current state and diff against it.
    pub async fn compute_against<S: EntityStore + ?Sized>(
        &self,
        store: &S,
        entity_id: &str,
        result: &EnrichmentResult,
    ) -> Result<Diff> {
        let codes = Self::proposed_codes(result);
        let snapshot = store
            .load_entity(entity_id, AttributeSelection::Codes(&codes))
            .await?
            .ok_or_else(|| EnrichError::EntityNotFound(entity_id.to_string()))?;
        Ok(self.compute(result, &snapshot))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use indexmap::IndexMap;
    use serde_json::{json, Value};

    use super::*;
    use crate::attribute::AttributeRegistry;
    use crate::codec::{CanonicalValue, StorageRow};
    use crate::store::Entity;

    fn engine() -> DiffEngine {
        DiffEngine::new(ValueCodec::new(Arc::new(AttributeRegistry::builtin())))
    }

    fn snapshot(description: Option<&str>, rows: Vec<(&str, CanonicalValue)>) -> EntitySnapshot {
        let mut entity = Entity::new("pub-1", "The Tap Room");
        entity.description = description.map(str::to_string);
        EntitySnapshot {
            entity,
            attributes: rows
                .into_iter()
                .map(|(code, value)| (code.to_string(), StorageRow::from(&value)))
                .collect(),
        }
    }

    fn attributes(pairs: Vec<(&str, Value)>) -> EnrichmentResult {
        EnrichmentResult::attributes(
            pairs
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect::<IndexMap<_, _>>(),
        )
    }

    #[test]
    fn test_description_compared_after_trim() {
        let current = snapshot(Some("  Old text "), vec![]);
        let same = EnrichmentResult {
            summary: Some("Old text".into()),
            ..Default::default()
        };
        assert!(engine().compute(&same, &current).is_empty());

        let changed = EnrichmentResult {
            summary: Some(" New text ".into()),
            highlights: Some(vec!["a".into()]),
            ..Default::default()
        };
        let diff = engine().compute(&changed, &current);
        assert!(diff.description_changed);
        assert_eq!(diff.description_before.as_deref(), Some("  Old text "));
        assert_eq!(diff.description_after.as_deref(), Some("New text"));
        assert_eq!(diff.highlights, Some(vec!["a".to_string()]));
    }

    #[test]
    fn test_first_description_is_a_change() {
        let current = snapshot(None, vec![]);
        let result = EnrichmentResult {
            summary: Some("Brand new".into()),
            ..Default::default()
        };
        let diff = engine().compute(&result, &current);
        assert!(diff.description_changed);
        assert_eq!(diff.description_before, None);
    }

    #[test]
    fn test_unknown_and_rejected_attributes_are_dropped() {
        let current = snapshot(None, vec![]);
        let result = attributes(vec![
            ("unknown_code", json!("x")),
            ("wifi", json!("perhaps")),
            ("food_quality_rating", json!(11)),
            ("live_music", json!(true)),
        ]);
        let diff = engine().compute(&result, &current);
        assert_eq!(diff.attribute_changes.len(), 1);
        assert_eq!(diff.attribute_changes[0].code, "live_music");
        assert_eq!(diff.attribute_changes[0].label, "Live Music");
        assert_eq!(diff.attribute_changes[0].before, None);
    }

    #[test]
    fn test_equal_values_are_omitted() {
        let current = snapshot(
            None,
            vec![
                ("rooftop_seating", CanonicalValue::Bool(false)),
                (
                    "music_genres",
                    CanonicalValue::Tags(vec!["rock".into(), "retro".into()]),
                ),
            ],
        );
        let result = attributes(vec![
            ("rooftop_seating", json!("yes")),
            ("music_genres", json!(["retro", "rock"])),
        ]);
        let diff = engine().compute(&result, &current);
        assert_eq!(diff.attribute_changes.len(), 1);
        let change = &diff.attribute_changes[0];
        assert_eq!(change.code, "rooftop_seating");
        assert_eq!(change.before, Some(CanonicalValue::Bool(false)));
        assert_eq!(change.after, CanonicalValue::Bool(true));
    }

    #[test]
    fn test_changes_keep_proposal_order() {
        let current = snapshot(None, vec![]);
        let result = attributes(vec![
            ("wifi", json!(true)),
            ("dance_floor", json!(false)),
            ("floor_count", json!(2)),
        ]);
        let codes: Vec<_> = engine()
            .compute(&result, &current)
            .attribute_changes
            .into_iter()
            .map(|c| c.code)
            .collect();
        assert_eq!(codes, vec!["wifi", "dance_floor", "floor_count"]);
    }
}
