//! Enrichment job lifecycle.
//!
//! Jobs are created `pending`, claimed by a worker through an atomic
//! conditional update, generated into `awaiting_review` (or `failed`), and
//! finally approved or rejected by a moderator. `rerun` re-opens any
//! settled job.

mod job;
mod result;
mod runner;
mod status;
mod worker;

pub use job::{EnrichmentJob, JobError, JobFilter};
pub use result::{extract_json, parse_attributes, parse_description, EnrichmentResult, Faq};
pub use runner::{CodecReport, JobOutcome, JobRunner};
pub use status::{JobStatus, JobType};
pub use worker::{BatchReport, WorkerPool};
