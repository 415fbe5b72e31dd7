//! Text generation seam.
//!
//! The pipeline only consumes a narrow completion contract: a [`Prompt`] in,
//! raw text out. Real backends (HTTP clients, provider selection, retries)
//! live outside this crate and implement [`GenerationProvider`];
//! [`StubProvider`] is the deterministic implementation used by tests and the
//! CLI's dry-run worker.

mod prompts;
mod provider;
mod stub;

pub use prompts::{attributes_prompt, description_prompt};
pub use provider::{GenerationProvider, Prompt, PromptKind};
pub use stub::StubProvider;
