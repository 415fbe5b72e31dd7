//! Typed value encoding.
//!
//! Three shapes of the same attribute value live here:
//!
//! - raw JSON as produced by a generation provider or an admin form,
//! - [`CanonicalValue`], the tagged in-memory form every other module uses,
//! - [`StorageRow`], the flat nullable-column form persisted by the stores.
//!
//! [`ValueCodec`] converts raw JSON into canonical values against the
//! declared type of an attribute; [`StorageRow`] converts canonical values to
//! and from the persisted form.

mod encode;
mod row;
mod value;

pub use encode::{infer, RatingPolicy, ValueCodec, RATING_MAX, RATING_MIN};
pub use row::StorageRow;
pub use value::{AttributeValue, CanonicalValue, ValueSource};
