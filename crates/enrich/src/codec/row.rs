//! Flat storage shape of an attribute value.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::value::CanonicalValue;

/// One nullable column per data type, as persisted.
///
/// Rows written through [`From<&CanonicalValue>`] have exactly one slot
/// populated. Rows read back from storage may not, so [`StorageRow::decode`]
/// resolves conflicts by a fixed priority instead of failing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StorageRow {
    pub boolean_value: Option<bool>,
    pub int_value: Option<i64>,
    pub numeric_min: Option<i64>,
    pub numeric_max: Option<i64>,
    pub rating_value: Option<f64>,
    pub tags_value: Option<Vec<String>>,
    pub text_value: Option<String>,
    pub schedule_value: Option<Value>,
}

impl StorageRow {
    /// Number of slots carrying a usable value.
    pub fn populated_slots(&self) -> usize {
        [
            self.boolean_value.is_some(),
            self.int_value.is_some(),
            self.numeric_min.is_some() || self.numeric_max.is_some(),
            self.rating_value.is_some(),
            self.tags_value.as_ref().is_some_and(|t| !t.is_empty()),
            self.text_value.as_ref().is_some_and(|t| !t.is_empty()),
            self.schedule_value.as_ref().is_some_and(Value::is_object),
        ]
        .into_iter()
        .filter(|populated| *populated)
        .count()
    }

    /// Read the canonical value back.
    ///
    /// Total: never panics. With several slots populated the winner is
    /// boolean > rating > tags > range > text > integer > schedule.
    pub fn decode(&self) -> Option<CanonicalValue> {
        if let Some(b) = self.boolean_value {
            return Some(CanonicalValue::Bool(b));
        }
        if let Some(r) = self.rating_value.filter(|r| r.is_finite()) {
            return Some(CanonicalValue::Rating(r));
        }
        if let Some(tags) = self.tags_value.as_ref().filter(|t| !t.is_empty()) {
            return Some(CanonicalValue::Tags(tags.clone()));
        }
        if self.numeric_min.is_some() || self.numeric_max.is_some() {
            return Some(CanonicalValue::Range {
                min: self.numeric_min,
                max: self.numeric_max,
            });
        }
        if let Some(text) = self.text_value.as_ref().filter(|t| !t.is_empty()) {
            return Some(CanonicalValue::Text(text.clone()));
        }
        if let Some(i) = self.int_value {
            return Some(CanonicalValue::Int(i));
        }
        match &self.schedule_value {
            Some(Value::Object(obj)) => Some(CanonicalValue::Schedule(obj.clone())),
            _ => None,
        }
    }
}

impl From<&CanonicalValue> for StorageRow {
    fn from(value: &CanonicalValue) -> Self {
        let mut row = StorageRow::default();
        match value {
            CanonicalValue::Bool(b) => row.boolean_value = Some(*b),
            CanonicalValue::Int(i) => row.int_value = Some(*i),
            CanonicalValue::Range { min, max } => {
                row.numeric_min = *min;
                row.numeric_max = *max;
            }
            CanonicalValue::Rating(r) => row.rating_value = Some(*r),
            CanonicalValue::Tags(tags) => row.tags_value = Some(tags.clone()),
            CanonicalValue::Text(s) => row.text_value = Some(s.clone()),
            CanonicalValue::Schedule(obj) => row.schedule_value = Some(Value::Object(obj.clone())),
        }
        row
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_empty_row_decodes_to_none() {
        assert_eq!(StorageRow::default().decode(), None);
        assert_eq!(StorageRow::default().populated_slots(), 0);
    }

    #[test]
    fn test_written_rows_have_one_slot() {
        let values = [
            CanonicalValue::Bool(false),
            CanonicalValue::Int(0),
            CanonicalValue::Range { min: Some(1), max: Some(2) },
            CanonicalValue::Rating(4.5),
            CanonicalValue::Tags(vec!["a".into()]),
            CanonicalValue::Text("x".into()),
            CanonicalValue::Schedule(serde_json::Map::new()),
        ];
        for v in values {
            let row = StorageRow::from(&v);
            assert_eq!(row.populated_slots(), 1, "{:?}", v);
            assert_eq!(row.decode(), Some(v));
        }
    }

    #[test]
    fn test_corrupt_row_uses_priority() {
        let row = StorageRow {
            boolean_value: Some(true),
            rating_value: Some(3.0),
            text_value: Some("hello".into()),
            ..Default::default()
        };
        assert_eq!(row.decode(), Some(CanonicalValue::Bool(true)));

        let row = StorageRow {
            int_value: Some(7),
            text_value: Some("hello".into()),
            numeric_min: Some(1),
            ..Default::default()
        };
        assert_eq!(
            row.decode(),
            Some(CanonicalValue::Range { min: Some(1), max: None })
        );

        let row = StorageRow {
            int_value: Some(7),
            schedule_value: Some(json!({"monday": []})),
            ..Default::default()
        };
        assert_eq!(row.decode(), Some(CanonicalValue::Int(7)));
    }

    #[test]
    fn test_empty_collections_are_skipped() {
        let row = StorageRow {
            tags_value: Some(vec![]),
            text_value: Some(String::new()),
            int_value: Some(3),
            ..Default::default()
        };
        assert_eq!(row.decode(), Some(CanonicalValue::Int(3)));
    }

    #[test]
    fn test_non_object_schedule_is_ignored() {
        let row = StorageRow {
            schedule_value: Some(json!([1, 2])),
            ..Default::default()
        };
        assert_eq!(row.decode(), None);
    }
}
