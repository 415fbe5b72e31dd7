//! Moderation of generated enrichment output.
//!
//! [`ModerationController`] is the only writer of approved values: it
//! computes the [`Diff`] for a job, turns it into one [`ApprovalCommit`] and
//! hands that to the store, which applies the writes, the audit entry and the
//! status change as one unit. The commit carries the snapshot the diff was
//! computed from; if the store sees different state inside its transaction
//! the diff is recomputed, up to [`APPROVAL_ATTEMPTS`] times. A failed
//! commit leaves the job in `awaiting_review` with its `error` untouched, so
//! the approval can simply be retried.

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::audit::ChangeHistoryEntry;
use crate::codec::{AttributeValue, ValueCodec};
use crate::config::{EnrichConfig, DEFAULT_REJECT_REASON};
use crate::diff::{Diff, DiffEngine};
use crate::error::{EnrichError, Result};
use crate::job::{EnrichmentJob, JobFilter, JobType};
use crate::store::{ApprovalBasis, ApprovalCommit, AttributeSelection, EnqueueOutcome, Store};

/// Diff computations per approval before a conflict is reported.
pub const APPROVAL_ATTEMPTS: usize = 3;

/// What an approval applied.
#[derive(Debug, Clone)]
pub struct Approval {
    /// The job after the transition.
    pub job: EnrichmentJob,
    /// Changes written to the entity; empty for job types without entity
    /// fragments.
    pub diff: Diff,
    /// Audit row written with the changes.
    pub audit: Option<ChangeHistoryEntry>,
}

/// Orchestrates job transitions for an admin surface.
pub struct ModerationController {
    store: Arc<dyn Store>,
    diff: DiffEngine,
    default_reject_reason: String,
}

impl ModerationController {
    /// Create a controller.
    pub fn new(store: Arc<dyn Store>, codec: ValueCodec) -> Self {
        Self {
            store,
            diff: DiffEngine::new(codec),
            default_reject_reason: DEFAULT_REJECT_REASON.to_string(),
        }
    }

    /// Create a controller using configured policies.
    pub fn from_config(store: Arc<dyn Store>, codec: ValueCodec, config: &EnrichConfig) -> Self {
        Self::new(store, codec.with_rating_policy(config.rating_policy))
            .with_default_reject_reason(config.default_reject_reason.clone())
    }

    /// Set the reason stored when `reject` gets none.
    pub fn with_default_reject_reason(mut self, reason: impl Into<String>) -> Self {
        self.default_reject_reason = reason.into();
        self
    }

    /// The diff engine backing previews and approvals.
    pub fn diff_engine(&self) -> &DiffEngine {
        &self.diff
    }

    /// Queue a job; returns the existing pending job for the same entity and
    /// type instead of creating a second one.
    pub async fn enqueue(&self, entity_id: &str, job_type: JobType) -> Result<EnqueueOutcome> {
        self.enqueue_with_input(entity_id, job_type, None).await
    }

    /// Queue a job carrying caller input.
    pub async fn enqueue_with_input(
        &self,
        entity_id: &str,
        job_type: JobType,
        input: Option<Value>,
    ) -> Result<EnqueueOutcome> {
        let outcome = self.store.enqueue(entity_id, job_type, input).await?;
        if outcome.created {
            info!(job_id = %outcome.job.id, entity_id, job_type = %job_type, "Job enqueued");
        } else {
            info!(job_id = %outcome.job.id, entity_id, job_type = %job_type, "Job already pending");
        }
        Ok(outcome)
    }

    /// Fetch a job.
    pub async fn job(&self, job_id: Uuid) -> Result<EnrichmentJob> {
        self.store
            .get_job(job_id)
            .await?
            .ok_or(EnrichError::JobNotFound(job_id))
    }

    /// List jobs, newest first.
    pub async fn jobs(&self, filter: &JobFilter) -> Result<Vec<EnrichmentJob>> {
        self.store.list_jobs(filter).await
    }

    /// Audit trail of an entity, oldest first.
    pub async fn history(&self, entity_id: &str) -> Result<Vec<ChangeHistoryEntry>> {
        self.store.history(entity_id).await
    }

    /// Diff a job's output against the entity's current state.
    pub async fn preview(&self, job_id: Uuid) -> Result<Diff> {
        let job = self.job(job_id).await?;
        let output = job.output.as_ref().ok_or(EnrichError::MissingOutput(job_id))?;
        if !job.job_type.writes_entity() {
            return Ok(Diff::default());
        }
        self.diff
            .compute_against(self.store.as_ref(), &job.entity_id, output)
            .await
    }

    /// Apply a reviewed job and mark it approved.
    ///
    /// Fails with `NotReady` unless the job awaits review and with
    /// `MissingOutput` if it has nothing to apply. Entity writes, the audit
    /// entry and the status change are committed together or not at all,
    /// against the same state the diff was computed from.
    pub async fn approve(&self, job_id: Uuid, moderator: &str) -> Result<Approval> {
        let moderator = moderator.trim();
        if moderator.is_empty() {
            return Err(EnrichError::Validation("Moderator is required".into()));
        }

        let mut attempt = 1;
        loop {
            match self.try_approve(job_id, moderator).await {
                Err(EnrichError::Conflict(reason)) if attempt < APPROVAL_ATTEMPTS => {
                    debug!(job_id = %job_id, attempt, reason = %reason, "Recomputing approval");
                    attempt += 1;
                }
                Err(e) => {
                    warn!(job_id = %job_id, moderator, error = %e, "Approval not applied");
                    return Err(e);
                }
                Ok(approval) => return Ok(approval),
            }
        }
    }

    async fn try_approve(&self, job_id: Uuid, moderator: &str) -> Result<Approval> {
        let job = self.job(job_id).await?;
        if !job.status.is_reviewable() {
            return Err(not_ready(&job, "approve"));
        }
        let output = job.output.clone().ok_or(EnrichError::MissingOutput(job_id))?;

        let (diff, basis) = if job.job_type.writes_entity() {
            let codes = DiffEngine::proposed_codes(&output);
            let snapshot = self
                .store
                .load_entity(&job.entity_id, AttributeSelection::Codes(&codes))
                .await?
                .ok_or_else(|| EnrichError::EntityNotFound(job.entity_id.clone()))?;
            let diff = self.diff.compute(&output, &snapshot);
            (diff, Some(ApprovalBasis { codes, snapshot }))
        } else {
            (Diff::default(), None)
        };

        let now = Utc::now();
        let commit = ApprovalCommit {
            job_id,
            entity_id: job.entity_id.clone(),
            moderator: moderator.to_string(),
            approved_at: now,
            output,
            basis,
            description: diff
                .description_changed
                .then(|| diff.description_after.clone())
                .flatten(),
            attribute_writes: diff
                .attribute_changes
                .iter()
                .map(|change| {
                    AttributeValue::approved(&job.entity_id, &change.code, change.after.clone(), now)
                })
                .collect(),
            audit: ChangeHistoryEntry::for_approval(&job.entity_id, moderator, &diff, now),
        };

        self.store.commit_approval(&commit).await?;

        info!(
            job_id = %job_id,
            entity_id = %job.entity_id,
            moderator,
            changes = diff.change_count(),
            "Job approved"
        );

        Ok(Approval {
            job: self.job(job_id).await?,
            diff,
            audit: commit.audit,
        })
    }

    /// Discard a reviewed job without touching the entity.
    pub async fn reject(
        &self,
        job_id: Uuid,
        moderator: &str,
        reason: Option<&str>,
    ) -> Result<EnrichmentJob> {
        let job = self.job(job_id).await?;
        if !job.status.is_reviewable() {
            return Err(not_ready(&job, "reject"));
        }

        let reason = reason
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .unwrap_or(self.default_reject_reason.as_str());

        if !self.store.reject(job_id, reason).await? {
            let current = self.job(job_id).await?;
            return Err(not_ready(&current, "reject"));
        }

        info!(job_id = %job_id, moderator, reason, "Job rejected");
        self.job(job_id).await
    }

    /// Re-open a settled job as `pending`, clearing output, error and
    /// approval metadata.
    pub async fn rerun(&self, job_id: Uuid) -> Result<EnrichmentJob> {
        let job = self.job(job_id).await?;
        if !job.status.can_rerun() {
            return Err(not_ready(&job, "rerun"));
        }

        if !self.store.rerun(job_id).await? {
            let current = self.job(job_id).await?;
            return Err(not_ready(&current, "rerun"));
        }

        info!(job_id = %job_id, previous = %job.status, "Job re-queued");
        self.job(job_id).await
    }
}

fn not_ready(job: &EnrichmentJob, operation: &'static str) -> EnrichError {
    EnrichError::NotReady {
        job_id: job.id,
        status: job.status,
        operation,
    }
}
