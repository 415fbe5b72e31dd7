//! Job status and job type vocabularies.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::EnrichError;

/// Lifecycle state of an enrichment job.
///
/// ```text
/// pending -> processing -> awaiting_review -> approved
///                       \                 \-> rejected
///                        \-> failed
/// ```
///
/// `rerun` moves any state except `pending`/`processing` back to `pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Waiting for a worker.
    Pending,
    /// Claimed by a worker.
    Processing,
    /// Output generated, waiting for a moderator. Older rows call this
    /// `completed`; both names read as this variant.
    #[serde(alias = "completed")]
    AwaitingReview,
    /// Output applied to the entity.
    Approved,
    /// Output discarded by a moderator.
    Rejected,
    /// Generation failed.
    Failed,
}

impl JobStatus {
    /// All states in lifecycle order.
    pub const ALL: [JobStatus; 6] = [
        JobStatus::Pending,
        JobStatus::Processing,
        JobStatus::AwaitingReview,
        JobStatus::Approved,
        JobStatus::Rejected,
        JobStatus::Failed,
    ];

    /// Stable storage name.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::AwaitingReview => "awaiting_review",
            JobStatus::Approved => "approved",
            JobStatus::Rejected => "rejected",
            JobStatus::Failed => "failed",
        }
    }

    /// Get a human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            JobStatus::Pending => "Pending",
            JobStatus::Processing => "Processing",
            JobStatus::AwaitingReview => "Awaiting review",
            JobStatus::Approved => "Approved",
            JobStatus::Rejected => "Rejected",
            JobStatus::Failed => "Failed",
        }
    }

    /// Whether a moderator can approve or reject from this state.
    pub fn is_reviewable(&self) -> bool {
        matches!(self, JobStatus::AwaitingReview)
    }

    /// Whether `rerun` is allowed from this state.
    pub fn can_rerun(&self) -> bool {
        matches!(
            self,
            JobStatus::AwaitingReview | JobStatus::Approved | JobStatus::Rejected | JobStatus::Failed
        )
    }

    /// Whether a job in this state must carry generated output.
    pub fn has_output(&self) -> bool {
        matches!(
            self,
            JobStatus::AwaitingReview | JobStatus::Approved | JobStatus::Rejected
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = EnrichError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "completed" => Ok(JobStatus::AwaitingReview),
            other => JobStatus::ALL
                .into_iter()
                .find(|status| status.as_str() == other)
                .ok_or_else(|| EnrichError::Validation(format!("Unknown job status: {}", other))),
        }
    }
}

/// Kind of enrichment a job produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    /// Summary and highlights.
    Description,
    /// Structured attribute values.
    Attributes,
    /// Description and attributes generated together.
    FullEnrichment,
    Faq,
    Schema,
    Insight,
}

impl JobType {
    /// All job types.
    pub const ALL: [JobType; 6] = [
        JobType::Description,
        JobType::Attributes,
        JobType::FullEnrichment,
        JobType::Faq,
        JobType::Schema,
        JobType::Insight,
    ];

    /// Stable storage name.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobType::Description => "description",
            JobType::Attributes => "attributes",
            JobType::FullEnrichment => "full_enrichment",
            JobType::Faq => "faq",
            JobType::Schema => "schema",
            JobType::Insight => "insight",
        }
    }

    /// Whether approving this job type writes to the entity.
    pub fn writes_entity(&self) -> bool {
        matches!(
            self,
            JobType::Description | JobType::Attributes | JobType::FullEnrichment
        )
    }

    /// Whether the job runner can generate output for this type.
    pub fn is_generated(&self) -> bool {
        self.writes_entity()
    }
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobType {
    type Err = EnrichError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        JobType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| EnrichError::Validation(format!("Unsupported job_type: {}", s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completed_reads_as_awaiting_review() {
        assert_eq!("completed".parse::<JobStatus>().unwrap(), JobStatus::AwaitingReview);
        let status: JobStatus = serde_json::from_str("\"completed\"").unwrap();
        assert_eq!(status, JobStatus::AwaitingReview);
        assert_eq!(
            serde_json::to_string(&JobStatus::AwaitingReview).unwrap(),
            "\"awaiting_review\""
        );
    }

    #[test]
    fn test_status_names_round_trip() {
        for status in JobStatus::ALL {
            assert_eq!(status.as_str().parse::<JobStatus>().unwrap(), status);
        }
        assert!("done".parse::<JobStatus>().is_err());
    }

    #[test]
    fn test_rerun_allowed_states() {
        assert!(!JobStatus::Pending.can_rerun());
        assert!(!JobStatus::Processing.can_rerun());
        assert!(JobStatus::AwaitingReview.can_rerun());
        assert!(JobStatus::Failed.can_rerun());
        assert!(JobStatus::Approved.can_rerun());
    }

    #[test]
    fn test_writes_entity() {
        assert!(JobType::Description.writes_entity());
        assert!(JobType::FullEnrichment.writes_entity());
        assert!(!JobType::Faq.writes_entity());
        assert!(!JobType::Insight.writes_entity());
    }

    #[test]
    fn test_unsupported_job_type_message() {
        let err = "translation".parse::<JobType>().unwrap_err();
        assert_eq!(err.to_string(), "Validation error: Unsupported job_type: translation");
    }
}
