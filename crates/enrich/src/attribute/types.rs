//! Attribute definition types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::EnrichError;

/// Declared data type of an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    /// True/false flag.
    Boolean,
    /// Whole number.
    Integer,
    /// Inclusive range with optional bounds.
    IntegerRange,
    /// Curated score, nominally 1-5.
    Rating,
    /// Ordered set of unique tags.
    TagSet,
    /// Free text.
    Text,
    /// Structured schedule object.
    Schedule,
}

impl DataType {
    /// All data types in declaration order.
    pub const ALL: [DataType; 7] = [
        DataType::Boolean,
        DataType::Integer,
        DataType::IntegerRange,
        DataType::Rating,
        DataType::TagSet,
        DataType::Text,
        DataType::Schedule,
    ];

    /// Stable wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Boolean => "boolean",
            DataType::Integer => "integer",
            DataType::IntegerRange => "integer_range",
            DataType::Rating => "rating",
            DataType::TagSet => "tag_set",
            DataType::Text => "text",
            DataType::Schedule => "schedule",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataType {
    type Err = EnrichError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DataType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| EnrichError::Validation(format!("Unknown data type: {}", s)))
    }
}

/// Priority class of an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Tier1,
    Tier2,
    Tier3,
}

impl Tier {
    /// Get a human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Tier::Tier1 => "Tier 1",
            Tier::Tier2 => "Tier 2",
            Tier::Tier3 => "Tier 3",
        }
    }
}

/// Catalog entry describing one attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeDefinition {
    /// Stable unique identifier (e.g., "rooftop_seating").
    pub code: String,

    /// Display label.
    pub label: String,

    /// What the attribute captures.
    #[serde(default)]
    pub description: String,

    /// Priority class.
    pub tier: Tier,

    /// Declared data type.
    pub data_type: DataType,

    /// Instructions handed to the generation provider.
    #[serde(default)]
    pub guidance: String,
}

impl AttributeDefinition {
    /// Create a definition with empty description and guidance.
    pub fn new(
        code: impl Into<String>,
        label: impl Into<String>,
        tier: Tier,
        data_type: DataType,
    ) -> Self {
        Self {
            code: code.into(),
            label: label.into(),
            description: String::new(),
            tier,
            data_type,
            guidance: String::new(),
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the provider guidance.
    pub fn with_guidance(mut self, guidance: impl Into<String>) -> Self {
        self.guidance = guidance.into();
        self
    }
}
