//! Canonical attribute values.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::attribute::DataType;

/// Type-tagged in-memory form of an attribute value.
///
/// Exactly one shape per value; the flat nullable-column form only exists
/// at the storage boundary (see [`StorageRow`](super::StorageRow)).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum CanonicalValue {
    Bool(bool),
    Int(i64),
    Range {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min: Option<i64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<i64>,
    },
    Rating(f64),
    /// Unique tags in first-seen order.
    Tags(Vec<String>),
    Text(String),
    Schedule(Map<String, Value>),
}

impl CanonicalValue {
    /// Data type this value satisfies.
    pub fn data_type(&self) -> DataType {
        match self {
            CanonicalValue::Bool(_) => DataType::Boolean,
            CanonicalValue::Int(_) => DataType::Integer,
            CanonicalValue::Range { .. } => DataType::IntegerRange,
            CanonicalValue::Rating(_) => DataType::Rating,
            CanonicalValue::Tags(_) => DataType::TagSet,
            CanonicalValue::Text(_) => DataType::Text,
            CanonicalValue::Schedule(_) => DataType::Schedule,
        }
    }

    /// Plain JSON form used in audit snapshots.
    pub fn to_json(&self) -> Value {
        match self {
            CanonicalValue::Bool(b) => Value::Bool(*b),
            CanonicalValue::Int(i) => json!(i),
            CanonicalValue::Range { min, max } => {
                let mut obj = Map::new();
                if let Some(min) = min {
                    obj.insert("min".to_string(), json!(min));
                }
                if let Some(max) = max {
                    obj.insert("max".to_string(), json!(max));
                }
                Value::Object(obj)
            }
            CanonicalValue::Rating(r) => json!(r),
            CanonicalValue::Tags(tags) => json!(tags),
            CanonicalValue::Text(s) => Value::String(s.clone()),
            CanonicalValue::Schedule(obj) => Value::Object(obj.clone()),
        }
    }

    /// Copy with order-insensitive parts put in a deterministic order.
    pub fn normalized(&self) -> CanonicalValue {
        match self {
            CanonicalValue::Tags(tags) => {
                let mut sorted = tags.clone();
                sorted.sort();
                CanonicalValue::Tags(sorted)
            }
            other => other.clone(),
        }
    }

    /// Structural equality after normalization.
    pub fn equivalent(&self, other: &CanonicalValue) -> bool {
        self.normalized() == other.normalized()
    }
}

/// Where a stored attribute value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueSource {
    /// Machine-generated and accepted by a moderator.
    AiEnrichmentApproved,
    /// Confirmed by a person.
    HumanVerified,
    /// Written by the editorial team.
    Editorial,
}

impl ValueSource {
    /// Stable storage name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueSource::AiEnrichmentApproved => "ai_enrichment_approved",
            ValueSource::HumanVerified => "human_verified",
            ValueSource::Editorial => "editorial",
        }
    }

    /// Parse a storage name.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ai_enrichment_approved" => Some(ValueSource::AiEnrichmentApproved),
            "human_verified" => Some(ValueSource::HumanVerified),
            "editorial" => Some(ValueSource::Editorial),
            _ => None,
        }
    }
}

/// A value recorded for one (entity, attribute) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeValue {
    pub entity_id: String,
    pub attribute_code: String,
    pub value: CanonicalValue,
    pub source: ValueSource,
    pub last_verified_at: DateTime<Utc>,
}

impl AttributeValue {
    /// Value landed through an approved enrichment job.
    pub fn approved(
        entity_id: impl Into<String>,
        attribute_code: impl Into<String>,
        value: CanonicalValue,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            entity_id: entity_id.into(),
            attribute_code: attribute_code.into(),
            value,
            source: ValueSource::AiEnrichmentApproved,
            last_verified_at: at,
        }
    }
}
