//! Raw JSON to canonical value encoding.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use crate::attribute::{AttributeRegistry, DataType};
use crate::error::{EnrichError, Result};

use super::row::StorageRow;
use super::value::CanonicalValue;

/// Lowest rating on the curated scale.
pub const RATING_MIN: f64 = 1.0;

/// Highest rating on the curated scale.
pub const RATING_MAX: f64 = 5.0;

const TRUE_WORDS: [&str; 4] = ["true", "yes", "y", "1"];
const FALSE_WORDS: [&str; 4] = ["false", "no", "n", "0"];

/// "100-2500", "100-", "-2500"; hyphen or en dash.
static RANGE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(\d+(?:\.\d+)?)?\s*[-\u{2013}]\s*(\d+(?:\.\d+)?)?\s*$")
        .expect("range pattern is valid")
});

/// How ratings outside `RATING_MIN..=RATING_MAX` are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RatingPolicy {
    /// Out-of-range ratings are rejected.
    #[default]
    Reject,
    /// Out-of-range ratings are clamped to the scale.
    Clamp,
    /// Any finite number is accepted.
    Unchecked,
}

/// Bidirectional mapping between raw values, canonical values and storage rows.
#[derive(Debug, Clone)]
pub struct ValueCodec {
    registry: Arc<AttributeRegistry>,
    rating_policy: RatingPolicy,
}

impl ValueCodec {
    /// Create a codec resolving codes through `registry`.
    pub fn new(registry: Arc<AttributeRegistry>) -> Self {
        Self {
            registry,
            rating_policy: RatingPolicy::default(),
        }
    }

    /// Set the rating policy.
    pub fn with_rating_policy(mut self, policy: RatingPolicy) -> Self {
        self.rating_policy = policy;
        self
    }

    /// The registry this codec resolves codes through.
    pub fn registry(&self) -> &AttributeRegistry {
        &self.registry
    }

    /// Encode a raw value for a declared data type.
    pub fn encode(&self, data_type: DataType, raw: &Value) -> Result<CanonicalValue> {
        match data_type {
            DataType::Boolean => encode_boolean(raw),
            DataType::Integer => encode_integer(raw),
            DataType::IntegerRange => encode_range(raw),
            DataType::Rating => encode_rating(raw, self.rating_policy),
            DataType::TagSet => encode_tags(raw),
            DataType::Text => encode_text(raw),
            DataType::Schedule => encode_schedule(raw),
        }
    }

    /// Encode a value for a registered attribute code.
    pub fn encode_attribute(&self, code: &str, raw: &Value) -> Result<CanonicalValue> {
        let data_type = self
            .registry
            .data_type(code)
            .ok_or_else(|| EnrichError::UnknownAttribute(code.to_string()))?;
        self.encode(data_type, raw)
    }

    /// Encode a value, inferring the type when the code is unregistered.
    pub fn encode_lenient(&self, code: &str, raw: &Value) -> Result<CanonicalValue> {
        match self.registry.data_type(code) {
            Some(data_type) => self.encode(data_type, raw),
            None => infer(raw),
        }
    }

    /// Decode a storage row.
    pub fn decode(&self, row: &StorageRow) -> Option<CanonicalValue> {
        row.decode()
    }
}

/// Best-effort typing for values without a declared type.
///
/// Tries bool, number, array, object, then string.
pub fn infer(raw: &Value) -> Result<CanonicalValue> {
    match raw {
        Value::Bool(b) => Ok(CanonicalValue::Bool(*b)),
        Value::Number(n) => {
            let f = finite(n).ok_or_else(|| reject(DataType::Rating, "non-finite number"))?;
            if f.fract() == 0.0 {
                encode_integer(raw)
            } else {
                Ok(CanonicalValue::Rating(f))
            }
        }
        Value::Array(_) => encode_tags(raw),
        Value::Object(_) => encode_schedule(raw),
        Value::String(_) => encode_text(raw),
        Value::Null => Err(reject(DataType::Text, "null value")),
    }
}

fn reject(data_type: DataType, reason: impl Into<String>) -> EnrichError {
    EnrichError::RejectedValue {
        data_type,
        reason: reason.into(),
    }
}

fn finite(n: &Number) -> Option<f64> {
    n.as_f64().filter(|f| f.is_finite())
}

fn round_to_i64(f: f64) -> Option<i64> {
    let rounded = f.round();
    if rounded.is_finite() && rounded >= i64::MIN as f64 && rounded <= i64::MAX as f64 {
        Some(rounded as i64)
    } else {
        None
    }
}

fn number_to_i64(n: &Number) -> Option<i64> {
    if let Some(i) = n.as_i64() {
        return Some(i);
    }
    finite(n).and_then(round_to_i64)
}

fn parse_numeric(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|f| f.is_finite())
}

fn encode_boolean(raw: &Value) -> Result<CanonicalValue> {
    match raw {
        Value::Bool(b) => Ok(CanonicalValue::Bool(*b)),
        Value::String(s) => {
            let word = s.trim().to_lowercase();
            if TRUE_WORDS.contains(&word.as_str()) {
                Ok(CanonicalValue::Bool(true))
            } else if FALSE_WORDS.contains(&word.as_str()) {
                Ok(CanonicalValue::Bool(false))
            } else {
                Err(reject(DataType::Boolean, format!("'{}' is not a boolean word", s)))
            }
        }
        other => Err(reject(DataType::Boolean, format!("unexpected {}", kind(other)))),
    }
}

fn encode_integer(raw: &Value) -> Result<CanonicalValue> {
    let parsed = match raw {
        Value::Number(n) => number_to_i64(n),
        Value::String(s) => parse_numeric(s).and_then(round_to_i64),
        _ => None,
    };
    parsed
        .map(CanonicalValue::Int)
        .ok_or_else(|| reject(DataType::Integer, format!("unexpected {}", kind(raw))))
}

fn range_bound(value: Option<&Value>) -> Option<i64> {
    match value {
        Some(Value::Number(n)) => number_to_i64(n),
        _ => None,
    }
}

fn first_present<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| obj.get(*key))
        .find(|value| !value.is_null())
}

fn encode_range(raw: &Value) -> Result<CanonicalValue> {
    let (min, max) = match raw {
        Value::Object(obj) => (
            range_bound(first_present(obj, &["min", "from", "start"])),
            range_bound(first_present(obj, &["max", "to", "end"])),
        ),
        Value::Array(items) if items.len() == 2 => {
            (range_bound(items.first()), range_bound(items.get(1)))
        }
        Value::Number(n) => {
            let single = number_to_i64(n);
            (single, single)
        }
        Value::String(s) => match RANGE_PATTERN.captures(s) {
            Some(caps) => (
                caps.get(1).and_then(|m| parse_numeric(m.as_str())).and_then(round_to_i64),
                caps.get(2).and_then(|m| parse_numeric(m.as_str())).and_then(round_to_i64),
            ),
            None => (None, None),
        },
        _ => (None, None),
    };

    if min.is_none() && max.is_none() {
        return Err(reject(DataType::IntegerRange, "no bound resolved"));
    }
    Ok(CanonicalValue::Range { min, max })
}

fn encode_rating(raw: &Value, policy: RatingPolicy) -> Result<CanonicalValue> {
    let rating = match raw {
        Value::Number(n) => finite(n),
        _ => None,
    }
    .ok_or_else(|| reject(DataType::Rating, format!("unexpected {}", kind(raw))))?;

    let in_range = (RATING_MIN..=RATING_MAX).contains(&rating);
    match policy {
        RatingPolicy::Unchecked => Ok(CanonicalValue::Rating(rating)),
        _ if in_range => Ok(CanonicalValue::Rating(rating)),
        RatingPolicy::Clamp => Ok(CanonicalValue::Rating(rating.clamp(RATING_MIN, RATING_MAX))),
        RatingPolicy::Reject => Err(reject(
            DataType::Rating,
            format!("{} is outside {}-{}", rating, RATING_MIN, RATING_MAX),
        )),
    }
}

fn push_unique(tags: &mut Vec<String>, tag: &str) {
    let tag = tag.trim();
    if !tag.is_empty() && !tags.iter().any(|t| t == tag) {
        tags.push(tag.to_string());
    }
}

fn encode_tags(raw: &Value) -> Result<CanonicalValue> {
    let mut tags = Vec::new();
    match raw {
        Value::Array(items) => {
            for item in items {
                match item {
                    Value::String(s) => push_unique(&mut tags, s),
                    Value::Number(n) => push_unique(&mut tags, &n.to_string()),
                    Value::Bool(b) => push_unique(&mut tags, &b.to_string()),
                    _ => {}
                }
            }
        }
        Value::String(s) => {
            for part in s.split(',') {
                push_unique(&mut tags, part);
            }
        }
        other => {
            return Err(reject(DataType::TagSet, format!("unexpected {}", kind(other))));
        }
    }

    if tags.is_empty() {
        return Err(reject(DataType::TagSet, "no tags after trimming"));
    }
    Ok(CanonicalValue::Tags(tags))
}

fn encode_text(raw: &Value) -> Result<CanonicalValue> {
    match raw {
        Value::String(s) if !s.trim().is_empty() => Ok(CanonicalValue::Text(s.trim().to_string())),
        Value::String(_) => Err(reject(DataType::Text, "empty text")),
        other => Err(reject(DataType::Text, format!("unexpected {}", kind(other)))),
    }
}

fn encode_schedule(raw: &Value) -> Result<CanonicalValue> {
    match raw {
        Value::Object(obj) => Ok(CanonicalValue::Schedule(obj.clone())),
        other => Err(reject(DataType::Schedule, format!("unexpected {}", kind(other)))),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
