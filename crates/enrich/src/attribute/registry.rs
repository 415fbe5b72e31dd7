//! Read-only attribute catalog.

use indexmap::IndexMap;

use super::catalog;
use super::types::{AttributeDefinition, DataType, Tier};

/// Catalog mapping attribute code to its definition.
///
/// Built once and shared behind an `Arc`; there is no mutation API.
/// Codes missing from the registry are treated as absent by callers,
/// never as errors.
#[derive(Debug, Clone, Default)]
pub struct AttributeRegistry {
    definitions: IndexMap<String, AttributeDefinition>,
}

impl AttributeRegistry {
    /// Create a registry from definitions, keeping their order.
    ///
    /// A later definition with a duplicate code replaces the earlier one
    /// in place.
    pub fn new(definitions: impl IntoIterator<Item = AttributeDefinition>) -> Self {
        let definitions = definitions
            .into_iter()
            .map(|def| (def.code.clone(), def))
            .collect();
        Self { definitions }
    }

    /// Registry seeded with the built-in venue attribute catalog.
    pub fn builtin() -> Self {
        Self::new(catalog::builtin_definitions())
    }

    /// Look up a definition by code.
    pub fn lookup(&self, code: &str) -> Option<&AttributeDefinition> {
        self.definitions.get(code)
    }

    /// Declared data type for a code.
    pub fn data_type(&self, code: &str) -> Option<DataType> {
        self.lookup(code).map(|def| def.data_type)
    }

    /// All definitions in catalog order.
    pub fn list(&self) -> impl Iterator<Item = &AttributeDefinition> {
        self.definitions.values()
    }

    /// Definitions of one tier, in catalog order.
    pub fn by_tier(&self, tier: Tier) -> impl Iterator<Item = &AttributeDefinition> {
        self.list().filter(move |def| def.tier == tier)
    }

    /// Number of definitions.
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}
