//! Attribute catalog.
//!
//! An attribute is a typed fact that can be recorded about an entity
//! (e.g., "rooftop_seating" is a boolean, "cost_for_two_range" an integer
//! range). Definitions are created out-of-band and never change at runtime;
//! the [`AttributeRegistry`] is injected wherever codes must be resolved.

mod catalog;
mod registry;
mod types;

pub use catalog::builtin_definitions;
pub use registry::AttributeRegistry;
pub use types::{AttributeDefinition, DataType, Tier};
