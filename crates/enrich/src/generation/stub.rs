//! Deterministic provider for tests and dry runs.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::Barrier;

use crate::error::{EnrichError, Result};

use super::provider::{GenerationProvider, Prompt, PromptKind};

enum Reply {
    Text(String),
    Fail(String),
}

/// Provider returning canned JSON per prompt kind.
///
/// Defaults mirror a plausible venue: a valid description and a small
/// attribute set. Individual kinds can be switched to raw text or to an
/// error, and an optional barrier makes every call wait until the barrier's
/// party count has been reached.
pub struct StubProvider {
    replies: HashMap<PromptKind, Reply>,
    barrier: Option<Arc<Barrier>>,
    calls: AtomicUsize,
    description_calls: AtomicUsize,
    attribute_calls: AtomicUsize,
}

impl StubProvider {
    /// Create a stub with the default canned responses.
    pub fn new() -> Self {
        let mut replies = HashMap::new();
        replies.insert(
            PromptKind::Description,
            Reply::Text(Self::default_description().to_string()),
        );
        replies.insert(
            PromptKind::Attributes,
            Reply::Text(Self::default_attributes().to_string()),
        );
        Self {
            replies,
            barrier: None,
            calls: AtomicUsize::new(0),
            description_calls: AtomicUsize::new(0),
            attribute_calls: AtomicUsize::new(0),
        }
    }

    /// Default description payload.
    pub fn default_description() -> Value {
        json!({
            "summary": "A lively neighbourhood bar with live music on weekends and a relaxed rooftop terrace.",
            "highlights": ["Live music nights", "Craft cocktails", "Late-night rooftop"]
        })
    }

    /// Default attributes payload.
    pub fn default_attributes() -> Value {
        json!({
            "attributes": {
                "live_music": true,
                "music_genres": ["rock", "retro"],
                "cover_redeemable": false
            }
        })
    }

    /// Reply to description prompts with this JSON.
    pub fn with_description(mut self, payload: Value) -> Self {
        self.replies
            .insert(PromptKind::Description, Reply::Text(payload.to_string()));
        self
    }

    /// Reply to attribute prompts with this JSON.
    pub fn with_attributes(mut self, payload: Value) -> Self {
        self.replies
            .insert(PromptKind::Attributes, Reply::Text(payload.to_string()));
        self
    }

    /// Reply to one kind with raw text, as a model might.
    pub fn with_raw(mut self, kind: PromptKind, text: impl Into<String>) -> Self {
        self.replies.insert(kind, Reply::Text(text.into()));
        self
    }

    /// Fail calls for one kind.
    pub fn fail_on(mut self, kind: PromptKind, message: impl Into<String>) -> Self {
        self.replies.insert(kind, Reply::Fail(message.into()));
        self
    }

    /// Fail every call.
    pub fn failing(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new()
            .fail_on(PromptKind::Description, message.clone())
            .fail_on(PromptKind::Attributes, message)
    }

    /// Make every call wait on a shared barrier before replying.
    pub fn with_barrier(mut self, barrier: Arc<Barrier>) -> Self {
        self.barrier = Some(barrier);
        self
    }

    /// Total number of calls.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Number of calls for one kind.
    pub fn calls_for(&self, kind: PromptKind) -> usize {
        match kind {
            PromptKind::Description => self.description_calls.load(Ordering::SeqCst),
            PromptKind::Attributes => self.attribute_calls.load(Ordering::SeqCst),
        }
    }
}

impl Default for StubProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GenerationProvider for StubProvider {
    async fn generate(&self, prompt: &Prompt) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match prompt.kind {
            PromptKind::Description => self.description_calls.fetch_add(1, Ordering::SeqCst),
            PromptKind::Attributes => self.attribute_calls.fetch_add(1, Ordering::SeqCst),
        };

        if let Some(barrier) = &self.barrier {
            barrier.wait().await;
        }

        match self.replies.get(&prompt.kind) {
            Some(Reply::Text(text)) => Ok(text.clone()),
            Some(Reply::Fail(message)) => Err(EnrichError::Generation(message.clone())),
            None => Err(EnrichError::Generation(format!(
                "No stub reply for {}",
                prompt.kind.as_str()
            ))),
        }
    }

    fn name(&self) -> &str {
        "stub"
    }
}
