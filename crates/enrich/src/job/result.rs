//! Generated enrichment output and its validation.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::OutputLimits;
use crate::error::{EnrichError, Result};

/// A generated question and answer pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Faq {
    pub question: String,
    pub answer: String,
}

/// Sparse bag of generated fragments.
///
/// A present field means that fragment was produced. Attribute values stay
/// raw here; they are encoded against the registry only when diffed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnrichmentResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highlights: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<IndexMap<String, Value>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub faqs: Option<Vec<Faq>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Value>,
}

impl EnrichmentResult {
    /// Result carrying only a description fragment.
    pub fn description(summary: impl Into<String>, highlights: Vec<String>) -> Self {
        Self {
            summary: Some(summary.into()),
            highlights: Some(highlights),
            ..Default::default()
        }
    }

    /// Result carrying only an attributes fragment.
    pub fn attributes(attributes: IndexMap<String, Value>) -> Self {
        Self {
            attributes: Some(attributes),
            ..Default::default()
        }
    }

    /// Combine two results; fields present in `other` win.
    pub fn merge(mut self, other: EnrichmentResult) -> Self {
        if other.summary.is_some() {
            self.summary = other.summary;
        }
        if other.highlights.is_some() {
            self.highlights = other.highlights;
        }
        if other.attributes.is_some() {
            self.attributes = other.attributes;
        }
        if other.faqs.is_some() {
            self.faqs = other.faqs;
        }
        if other.schema.is_some() {
            self.schema = other.schema;
        }
        self
    }

    /// Whether no fragment is present.
    pub fn is_empty(&self) -> bool {
        self.summary.is_none()
            && self.highlights.is_none()
            && self.attributes.is_none()
            && self.faqs.is_none()
            && self.schema.is_none()
    }
}

/// Extract the JSON payload from a provider response.
///
/// Models often wrap JSON in a markdown code fence; the fence is dropped.
pub fn extract_json(response: &str) -> &str {
    if response.contains("```json") {
        response
            .split("```json")
            .nth(1)
            .and_then(|s| s.split("```").next())
            .map(|s| s.trim())
            .unwrap_or(response)
    } else if response.contains("```") {
        response
            .split("```")
            .nth(1)
            .map(|s| s.trim())
            .unwrap_or(response)
    } else {
        response.trim()
    }
}

fn parse_value(response: &str) -> Result<Value> {
    serde_json::from_str(extract_json(response))
        .map_err(|e| EnrichError::Validation(format!("Failed to parse JSON output: {}", e)))
}

fn schema_error(message: impl AsRef<str>) -> EnrichError {
    EnrichError::Validation(format!("LLM output validation error: {}", message.as_ref()))
}

#[derive(Deserialize)]
struct DescriptionOutput {
    summary: String,
    highlights: Vec<String>,
}

#[derive(Deserialize)]
struct AttributesOutput {
    attributes: IndexMap<String, Value>,
}

/// Parse and validate a description generation response.
pub fn parse_description(response: &str, limits: &OutputLimits) -> Result<EnrichmentResult> {
    let value = parse_value(response)?;
    let output: DescriptionOutput =
        serde_json::from_value(value).map_err(|e| schema_error(e.to_string()))?;

    let summary_len = output.summary.chars().count();
    if !limits.summary_chars.contains(&summary_len) {
        return Err(schema_error(format!(
            "summary must be {}-{} characters, got {}",
            limits.summary_chars.start(),
            limits.summary_chars.end(),
            summary_len
        )));
    }

    if output.highlights.len() != limits.highlight_count {
        return Err(schema_error(format!(
            "expected exactly {} highlights, got {}",
            limits.highlight_count,
            output.highlights.len()
        )));
    }

    if let Some(bad) = output
        .highlights
        .iter()
        .find(|h| !limits.highlight_chars.contains(&h.chars().count()))
    {
        return Err(schema_error(format!(
            "highlight '{}' must be {}-{} characters",
            bad,
            limits.highlight_chars.start(),
            limits.highlight_chars.end()
        )));
    }

    Ok(EnrichmentResult::description(output.summary, output.highlights))
}

/// Parse and validate an attribute generation response.
pub fn parse_attributes(response: &str) -> Result<EnrichmentResult> {
    let value = parse_value(response)?;
    let output: AttributesOutput =
        serde_json::from_value(value).map_err(|e| schema_error(e.to_string()))?;
    Ok(EnrichmentResult::attributes(output.attributes))
}
