//! Generation provider trait and prompt types.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Which fragment a prompt asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptKind {
    /// `{"summary", "highlights"}`.
    Description,
    /// `{"attributes": {...}}`.
    Attributes,
}

impl PromptKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PromptKind::Description => "description",
            PromptKind::Attributes => "attributes",
        }
    }
}

/// A prompt ready to send to a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub kind: PromptKind,
    pub text: String,
}

impl Prompt {
    pub fn new(kind: PromptKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }
}

/// Trait for text generation backends.
///
/// Implementations must be thread-safe (Send + Sync) so that concurrent
/// workers, and both halves of a full enrichment, can share one provider.
/// The returned text is parsed and validated by the caller; providers do
/// not interpret it.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Complete a prompt, returning the raw response text.
    async fn generate(&self, prompt: &Prompt) -> Result<String>;

    /// Get the name of this provider (for logging/debugging).
    fn name(&self) -> &str;
}
