//! Changeset between proposed output and stored state.
//!
//! [`Diff`] is the single source of truth for what an approval would write;
//! the moderation preview and the approval itself both come from
//! [`DiffEngine`].

mod engine;
mod model;

pub use engine::DiffEngine;
pub use model::{AttributeChange, Diff};
