//! Persistence interfaces and their implementations.
//!
//! The core only needs two narrow seams: [`EntityStore`] for entity state and
//! the audit trail, and [`JobStore`] for the job lifecycle. Both are async
//! traits so the worker pool and the controller can share one store behind an
//! `Arc<dyn Store>`.
//!
//! Two implementations ship with the crate:
//!
//! - [`MemoryStore`] - tokio-mutex guarded maps, with write failure injection
//!   for tests.
//! - [`SqliteStore`] - SQLite through `sqlx`, with the pending-job uniqueness
//!   and the append-only audit table enforced by the schema.

mod memory;
mod sqlite;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::audit::ChangeHistoryEntry;
use crate::codec::{AttributeValue, StorageRow};
use crate::error::Result;
use crate::job::{EnrichmentJob, EnrichmentResult, JobFilter, JobType};

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// An entity as seen by the enrichment pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Entity {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Current state of an entity plus the requested attribute rows.
#[derive(Debug, Clone, PartialEq)]
pub struct EntitySnapshot {
    pub entity: Entity,
    /// Stored rows keyed by attribute code.
    pub attributes: IndexMap<String, StorageRow>,
}

impl EntitySnapshot {
    pub fn description(&self) -> Option<&str> {
        self.entity.description.as_deref()
    }

    pub fn row(&self, code: &str) -> Option<&StorageRow> {
        self.attributes.get(code)
    }
}

/// Which attribute rows to load with an entity.
#[derive(Debug, Clone, Copy)]
pub enum AttributeSelection<'a> {
    All,
    Codes(&'a [String]),
}

impl AttributeSelection<'_> {
    pub fn includes(&self, code: &str) -> bool {
        match self {
            AttributeSelection::All => true,
            AttributeSelection::Codes(codes) => codes.iter().any(|c| c == code),
        }
    }
}

/// Entity state an approval's diff was computed from.
///
/// The store re-reads the same selection inside the commit and refuses to
/// apply the diff when anything in it moved.
#[derive(Debug, Clone, PartialEq)]
pub struct ApprovalBasis {
    /// Attribute codes the output proposes values for.
    pub codes: Vec<String>,
    pub snapshot: EntitySnapshot,
}

impl ApprovalBasis {
    /// Whether a fresh read of the same selection matches this basis.
    pub fn matches(&self, current: &EntitySnapshot) -> bool {
        self.snapshot.entity.description == current.entity.description
            && self.snapshot.attributes == current.attributes
    }
}

/// Everything an approval writes, committed as one unit.
#[derive(Debug, Clone)]
pub struct ApprovalCommit {
    pub job_id: Uuid,
    pub entity_id: String,
    pub moderator: String,
    pub approved_at: DateTime<Utc>,
    /// Job output the diff was computed from.
    pub output: EnrichmentResult,
    /// Entity state the diff was computed from; `None` for job types that
    /// write nothing to the entity.
    pub basis: Option<ApprovalBasis>,
    /// New description, when it changed.
    pub description: Option<String>,
    /// Attribute upserts, keyed by (entity, code).
    pub attribute_writes: Vec<AttributeValue>,
    /// Audit row; absent when nothing changed.
    pub audit: Option<ChangeHistoryEntry>,
}

/// Result of an enqueue call.
#[derive(Debug, Clone)]
pub struct EnqueueOutcome {
    pub job: EnrichmentJob,
    /// False when an existing pending job was returned.
    pub created: bool,
}

/// Entity state and audit trail.
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Load an entity with the selected attribute rows.
    async fn load_entity(
        &self,
        entity_id: &str,
        selection: AttributeSelection<'_>,
    ) -> Result<Option<EntitySnapshot>>;

    /// Stored values with their source and verification time, in code
    /// order. Rows that decode to no value are skipped.
    async fn attribute_values(&self, entity_id: &str) -> Result<Vec<AttributeValue>>;

    /// Audit entries for an entity, oldest first.
    async fn history(&self, entity_id: &str) -> Result<Vec<ChangeHistoryEntry>>;

    /// Append one audit entry outside of an approval.
    async fn append_history(&self, entry: &ChangeHistoryEntry) -> Result<()>;

    /// Apply an approval atomically.
    ///
    /// Writes the description, upserts the attribute rows, appends the audit
    /// row and moves the job from `awaiting_review` to `approved`. Either all
    /// of it becomes visible or none of it does. Fails with `NotReady` when
    /// the job is no longer awaiting review, `Conflict` when the job output
    /// or the basis snapshot changed since the diff was computed, and
    /// `StoreWrite` when a write fails.
    async fn commit_approval(&self, commit: &ApprovalCommit) -> Result<()>;
}

/// Job lifecycle persistence.
///
/// Every transition is a conditional update on the current status and
/// reports whether it took effect.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Create a pending job unless one exists for the same entity and type.
    async fn enqueue(
        &self,
        entity_id: &str,
        job_type: JobType,
        input: Option<Value>,
    ) -> Result<EnqueueOutcome>;

    async fn get_job(&self, job_id: Uuid) -> Result<Option<EnrichmentJob>>;

    /// Jobs matching a filter, newest first.
    async fn list_jobs(&self, filter: &JobFilter) -> Result<Vec<EnrichmentJob>>;

    /// Oldest pending jobs first.
    async fn pending_jobs(&self, limit: usize) -> Result<Vec<EnrichmentJob>>;

    /// `pending -> processing`; false if another worker got there first.
    async fn try_start(&self, job_id: Uuid) -> Result<bool>;

    /// `processing -> awaiting_review` with output.
    async fn complete(&self, job_id: Uuid, output: &EnrichmentResult) -> Result<bool>;

    /// `processing -> failed` with a message.
    async fn fail(&self, job_id: Uuid, message: &str) -> Result<bool>;

    /// `awaiting_review -> rejected` with a reason.
    async fn reject(&self, job_id: Uuid, reason: &str) -> Result<bool>;

    /// Terminal or `awaiting_review` -> `pending`, clearing output and
    /// approval metadata.
    async fn rerun(&self, job_id: Uuid) -> Result<bool>;
}

/// A store serving both seams.
pub trait Store: EntityStore + JobStore {}

impl<T: EntityStore + JobStore> Store for T {}
