//! Enrich: typed attribute storage with moderated AI enrichment.
//!
//! Entities carry descriptive attributes stored as typed rows keyed by an
//! attribute registry. Generated content never lands on an entity directly:
//! workers run enrichment jobs into an `awaiting_review` state, and a
//! moderator approves or rejects the proposed changes.
//!
//! # Core Principles
//!
//! - **Typed values**: Every attribute value passes through the codec for its declared data type
//! - **Human in the loop**: Only an approval writes generated content to an entity
//! - **Full provenance**: Every approved change is recorded in an append-only history
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use enrich::{
//!     AttributeRegistry, JobRunner, JobType, ModerationController, SqliteStore, StubProvider,
//!     ValueCodec, WorkerPool,
//! };
//!
//! # async fn demo() -> enrich::Result<()> {
//! let store = Arc::new(SqliteStore::connect("sqlite://enrich.db").await?);
//! let codec = ValueCodec::new(Arc::new(AttributeRegistry::builtin()));
//! let controller = ModerationController::new(store.clone(), codec.clone());
//!
//! let job = controller.enqueue("pub-1", JobType::Description).await?.job;
//!
//! let runner = Arc::new(JobRunner::new(store.clone(), Arc::new(StubProvider::new()), codec));
//! WorkerPool::new(store, runner).run_batch().await?;
//!
//! let diff = controller.preview(job.id).await?;
//! println!("{} pending changes", diff.change_count());
//! controller.approve(job.id, "moderator@example.com").await?;
//! # Ok(())
//! # }
//! ```

pub mod attribute;
pub mod audit;
pub mod codec;
pub mod config;
pub mod diff;
pub mod error;
pub mod generation;
pub mod job;
pub mod moderation;
pub mod store;

pub use attribute::{AttributeDefinition, AttributeRegistry, DataType, Tier};
pub use audit::{AuditLog, ChangeHistoryEntry};
pub use codec::{AttributeValue, CanonicalValue, RatingPolicy, StorageRow, ValueCodec, ValueSource};
pub use config::{EnrichConfig, OutputLimits};
pub use diff::{AttributeChange, Diff, DiffEngine};
pub use error::{EnrichError, Result};
pub use generation::{GenerationProvider, Prompt, PromptKind, StubProvider};
pub use job::{
    BatchReport, EnrichmentJob, EnrichmentResult, JobFilter, JobOutcome, JobRunner, JobStatus,
    JobType, WorkerPool,
};
pub use moderation::{Approval, ModerationController};
pub use store::{Entity, EntitySnapshot, MemoryStore, SqliteStore, Store};
