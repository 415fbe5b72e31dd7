//! Append-only change history.
//!
//! Each approval that changes an entity leaves exactly one
//! [`ChangeHistoryEntry`] holding sparse before/after snapshots of the
//! changed fragments only:
//!
//! ```json
//! {"description": "...", "highlights": ["..."], "attributes": {"wifi": true}}
//! ```
//!
//! `before` is `null` when none of the changed fragments had a prior value.
//! Entries are never updated or deleted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::diff::Diff;
use crate::error::Result;
use crate::store::EntityStore;

/// Action recorded for approved enrichment output.
pub const APPROVAL_ACTION: &str = "ai_enrichment_approved";

/// One immutable audit row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeHistoryEntry {
    pub id: Uuid,
    pub entity_id: String,
    pub actor: String,
    pub action: String,
    pub before: Option<Value>,
    pub after: Value,
    pub created_at: DateTime<Utc>,
}

impl ChangeHistoryEntry {
    pub fn new(
        entity_id: impl Into<String>,
        actor: impl Into<String>,
        action: impl Into<String>,
        before: Option<Value>,
        after: Value,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            entity_id: entity_id.into(),
            actor: actor.into(),
            action: action.into(),
            before,
            after,
            created_at: Utc::now(),
        }
    }

    /// Set the creation time.
    pub fn at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    /// Entry documenting an approved diff; `None` for an empty diff.
    pub fn for_approval(
        entity_id: &str,
        moderator: &str,
        diff: &Diff,
        at: DateTime<Utc>,
    ) -> Option<Self> {
        let (before, after) = snapshots(diff)?;
        Some(Self::new(entity_id, moderator, APPROVAL_ACTION, before, after).at(at))
    }
}

/// Sparse before/after snapshots of a diff.
pub fn snapshots(diff: &Diff) -> Option<(Option<Value>, Value)> {
    if diff.is_empty() {
        return None;
    }

    let mut before = Map::new();
    let mut after = Map::new();

    if diff.description_changed {
        if let Some(old) = &diff.description_before {
            before.insert("description".into(), Value::String(old.clone()));
        }
        if let Some(new) = &diff.description_after {
            after.insert("description".into(), Value::String(new.clone()));
        }
        if let Some(highlights) = &diff.highlights {
            after.insert(
                "highlights".into(),
                Value::Array(highlights.iter().cloned().map(Value::String).collect()),
            );
        }
    }

    if !diff.attribute_changes.is_empty() {
        let mut old_attrs = Map::new();
        let mut new_attrs = Map::new();
        for change in &diff.attribute_changes {
            if let Some(old) = &change.before {
                old_attrs.insert(change.code.clone(), old.to_json());
            }
            new_attrs.insert(change.code.clone(), change.after.to_json());
        }
        if !old_attrs.is_empty() {
            before.insert("attributes".into(), Value::Object(old_attrs));
        }
        after.insert("attributes".into(), Value::Object(new_attrs));
    }

    let before = (!before.is_empty()).then_some(Value::Object(before));
    Some((before, Value::Object(after)))
}

/// Writer for standalone audit entries.
///
/// Approvals do not go through here; their entry is committed together with
/// the writes it documents.
pub struct AuditLog<'a> {
    store: &'a dyn EntityStore,
}

impl<'a> AuditLog<'a> {
    pub fn new(store: &'a dyn EntityStore) -> Self {
        Self { store }
    }

    /// Append one entry.
    pub async fn append(
        &self,
        entity_id: &str,
        actor: &str,
        action: &str,
        before: Option<Value>,
        after: Value,
    ) -> Result<ChangeHistoryEntry> {
        let entry = ChangeHistoryEntry::new(entity_id, actor, action, before, after);
        self.store.append_history(&entry).await?;
        Ok(entry)
    }

    /// Entries for an entity, oldest first.
    pub async fn entries(&self, entity_id: &str) -> Result<Vec<ChangeHistoryEntry>> {
        self.store.history(entity_id).await
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::codec::CanonicalValue;
    use crate::diff::AttributeChange;

    fn change(code: &str, before: Option<CanonicalValue>, after: CanonicalValue) -> AttributeChange {
        AttributeChange {
            code: code.into(),
            label: code.into(),
            before,
            after,
        }
    }

    #[test]
    fn test_empty_diff_has_no_snapshot() {
        assert!(snapshots(&Diff::default()).is_none());
        assert!(ChangeHistoryEntry::for_approval("e", "m", &Diff::default(), Utc::now()).is_none());
    }

    #[test]
    fn test_snapshots_are_sparse() {
        let diff = Diff {
            description_changed: true,
            description_before: Some("Old text".into()),
            description_after: Some("New text".into()),
            highlights: None,
            attribute_changes: vec![change(
                "rooftop_seating",
                Some(CanonicalValue::Bool(false)),
                CanonicalValue::Bool(true),
            )],
        };
        let (before, after) = snapshots(&diff).unwrap();
        assert_eq!(
            before,
            Some(json!({"description": "Old text", "attributes": {"rooftop_seating": false}}))
        );
        assert_eq!(
            after,
            json!({"description": "New text", "attributes": {"rooftop_seating": true}})
        );
    }

    #[test]
    fn test_first_time_set_has_null_before() {
        let diff = Diff {
            attribute_changes: vec![change(
                "cost_for_two_range",
                None,
                CanonicalValue::Range { min: Some(800), max: Some(1500) },
            )],
            ..Default::default()
        };
        let (before, after) = snapshots(&diff).unwrap();
        assert_eq!(before, None);
        assert_eq!(
            after,
            json!({"attributes": {"cost_for_two_range": {"min": 800, "max": 1500}}})
        );
    }

    #[test]
    fn test_highlights_only_in_after() {
        let diff = Diff {
            description_changed: true,
            description_before: Some("Old".into()),
            description_after: Some("New".into()),
            highlights: Some(vec!["Rooftop".into()]),
            attribute_changes: vec![],
        };
        let (before, after) = snapshots(&diff).unwrap();
        assert_eq!(before, Some(json!({"description": "Old"})));
        assert_eq!(after["highlights"], json!(["Rooftop"]));
    }

    #[test]
    fn test_approval_entry_action() {
        let diff = Diff {
            description_changed: true,
            description_after: Some("New".into()),
            ..Default::default()
        };
        let entry = ChangeHistoryEntry::for_approval("pub-1", "mod-7", &diff, Utc::now()).unwrap();
        assert_eq!(entry.action, APPROVAL_ACTION);
        assert_eq!(entry.actor, "mod-7");
        assert_eq!(entry.before, None);
    }
}
