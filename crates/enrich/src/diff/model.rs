//! Changeset types.

use serde::{Deserialize, Serialize};

use crate::codec::CanonicalValue;

/// One attribute whose proposed value differs from the stored one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeChange {
    pub code: String,
    pub label: String,
    /// Stored value, `None` when the attribute was never set.
    pub before: Option<CanonicalValue>,
    pub after: CanonicalValue,
}

/// Minimal changeset between a job's output and the entity's current state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Diff {
    pub description_changed: bool,
    pub description_before: Option<String>,
    pub description_after: Option<String>,
    /// Highlights that accompany a changed description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highlights: Option<Vec<String>>,
    /// Changed attributes in proposal order.
    pub attribute_changes: Vec<AttributeChange>,
}

impl Diff {
    /// Whether applying would change nothing.
    pub fn is_empty(&self) -> bool {
        !self.description_changed && self.attribute_changes.is_empty()
    }

    /// Number of changed fragments.
    pub fn change_count(&self) -> usize {
        usize::from(self.description_changed) + self.attribute_changes.len()
    }
}
