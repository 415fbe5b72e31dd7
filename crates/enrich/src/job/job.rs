//! Enrichment job record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::result::EnrichmentResult;
use super::status::{JobStatus, JobType};

/// Reason attached to a failed or rejected job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobError {
    pub message: String,
}

impl JobError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// One request to enrich an entity.
///
/// Jobs are never deleted; `rerun` resets them in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichmentJob {
    pub id: Uuid,
    pub entity_id: String,
    pub job_type: JobType,
    pub status: JobStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<EnrichmentResult>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JobError>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_by: Option<String>,
}

impl EnrichmentJob {
    /// Create a new pending job.
    pub fn pending(entity_id: impl Into<String>, job_type: JobType) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            entity_id: entity_id.into(),
            job_type,
            status: JobStatus::Pending,
            input: None,
            output: None,
            error: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
            approved_at: None,
            approved_by: None,
        }
    }

    /// Attach caller-supplied input.
    pub fn with_input(mut self, input: Value) -> Self {
        self.input = Some(input);
        self
    }

    /// Check the record-level invariants.
    ///
    /// Output is present exactly in the reviewable and decided states, and
    /// approval metadata exactly when approved.
    pub fn invariants_hold(&self) -> bool {
        let output_ok = self.output.is_some() == self.status.has_output();
        let approved = self.status == JobStatus::Approved;
        let approval_ok =
            self.approved_at.is_some() == approved && self.approved_by.is_some() == approved;
        output_ok && approval_ok
    }

    /// `pending|processing -> processing`, clearing the previous error.
    pub(crate) fn mark_started(&mut self, at: DateTime<Utc>) {
        self.status = JobStatus::Processing;
        self.error = None;
        self.updated_at = at;
    }

    pub(crate) fn mark_awaiting_review(&mut self, output: EnrichmentResult, at: DateTime<Utc>) {
        self.status = JobStatus::AwaitingReview;
        self.output = Some(output);
        self.completed_at = Some(at);
        self.updated_at = at;
    }

    pub(crate) fn mark_failed(&mut self, message: impl Into<String>, at: DateTime<Utc>) {
        self.status = JobStatus::Failed;
        self.error = Some(JobError::new(message));
        self.updated_at = at;
    }

    pub(crate) fn mark_approved(&mut self, moderator: &str, at: DateTime<Utc>) {
        self.status = JobStatus::Approved;
        self.approved_at = Some(at);
        self.approved_by = Some(moderator.to_string());
        self.updated_at = at;
    }

    pub(crate) fn mark_rejected(&mut self, reason: impl Into<String>, at: DateTime<Utc>) {
        self.status = JobStatus::Rejected;
        self.error = Some(JobError::new(reason));
        self.updated_at = at;
    }

    pub(crate) fn reset(&mut self, at: DateTime<Utc>) {
        self.status = JobStatus::Pending;
        self.error = None;
        self.output = None;
        self.completed_at = None;
        self.approved_at = None;
        self.approved_by = None;
        self.updated_at = at;
    }
}

/// Filter for listing jobs.
#[derive(Debug, Clone, Default)]
pub struct JobFilter {
    pub status: Option<JobStatus>,
    pub entity_id: Option<String>,
    pub job_type: Option<JobType>,
    pub limit: Option<usize>,
}

impl JobFilter {
    /// Jobs in one status.
    pub fn status(status: JobStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    /// Restrict to one entity.
    pub fn with_entity(mut self, entity_id: impl Into<String>) -> Self {
        self.entity_id = Some(entity_id.into());
        self
    }

    /// Restrict to one job type.
    pub fn with_job_type(mut self, job_type: JobType) -> Self {
        self.job_type = Some(job_type);
        self
    }

    /// Cap the number of results.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Whether a job passes the filter, ignoring the limit.
    pub fn matches(&self, job: &EnrichmentJob) -> bool {
        self.status.is_none_or(|s| s == job.status)
            && self.entity_id.as_deref().is_none_or(|e| e == job.entity_id)
            && self.job_type.is_none_or(|t| t == job.job_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_job_invariants() {
        let job = EnrichmentJob::pending("pub-1", JobType::Description);
        assert_eq!(job.status, JobStatus::Pending);
        assert!(job.invariants_hold());
    }

    #[test]
    fn test_lifecycle_keeps_invariants() {
        let now = Utc::now();
        let mut job = EnrichmentJob::pending("pub-1", JobType::Attributes);

        job.mark_started(now);
        assert!(job.invariants_hold());

        job.mark_awaiting_review(EnrichmentResult::default(), now);
        assert!(job.invariants_hold());
        assert!(job.completed_at.is_some());

        job.mark_approved("mod-1", now);
        assert!(job.invariants_hold());
        assert_eq!(job.approved_by.as_deref(), Some("mod-1"));

        job.reset(now);
        assert!(job.invariants_hold());
        assert!(job.output.is_none());
        assert!(job.approved_at.is_none());
    }

    #[test]
    fn test_reject_keeps_output() {
        let now = Utc::now();
        let mut job = EnrichmentJob::pending("pub-1", JobType::Description);
        job.mark_started(now);
        job.mark_awaiting_review(EnrichmentResult::default(), now);
        job.mark_rejected("bad data", now);
        assert!(job.invariants_hold());
        assert_eq!(job.error, Some(JobError::new("bad data")));
    }

    #[test]
    fn test_filter_matches() {
        let job = EnrichmentJob::pending("pub-1", JobType::Faq);
        assert!(JobFilter::default().matches(&job));
        assert!(JobFilter::status(JobStatus::Pending).with_entity("pub-1").matches(&job));
        assert!(!JobFilter::status(JobStatus::Failed).matches(&job));
        assert!(!JobFilter::default().with_job_type(JobType::Schema).matches(&job));
    }
}
