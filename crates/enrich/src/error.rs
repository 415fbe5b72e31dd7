//! Error types for the enrich library.

use thiserror::Error;
use uuid::Uuid;

use crate::attribute::DataType;
use crate::job::{JobStatus, JobType};

/// Main error type for enrich operations.
#[derive(Debug, Error)]
pub enum EnrichError {
    /// Provider output or caller input failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Attribute code is not present in the registry.
    #[error("Unknown attribute: {0}")]
    UnknownAttribute(String),

    /// Raw value could not be encoded for the declared data type.
    #[error("Rejected {data_type} value: {reason}")]
    RejectedValue { data_type: DataType, reason: String },

    /// No job with the given ID.
    #[error("Job not found: {0}")]
    JobNotFound(Uuid),

    /// No entity with the given ID.
    #[error("Entity not found: {0}")]
    EntityNotFound(String),

    /// Job is not in a state that allows the requested operation.
    #[error("Job {job_id} is {status}, cannot {operation}")]
    NotReady {
        job_id: Uuid,
        status: JobStatus,
        operation: &'static str,
    },

    /// Another job of the same type is already pending for the entity.
    #[error("Entity {entity_id} already has a pending {job_type} job: {existing}")]
    AlreadyPending {
        entity_id: String,
        job_type: JobType,
        existing: Uuid,
    },

    /// Job reached review without generated output.
    #[error("Job {0} has no output to apply")]
    MissingOutput(Uuid),

    /// A write inside an approval failed and was rolled back.
    #[error("Store write failed: {0}")]
    StoreWrite(String),

    /// Entity state or job output moved after the diff was computed.
    #[error("Approval conflict: {0}")]
    Conflict(String),

    /// Error from the SQL layer.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Generation provider failed.
    #[error("Generation error: {0}")]
    Generation(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl EnrichError {
    /// Whether the same call may succeed if retried unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            EnrichError::StoreWrite(_) | EnrichError::Conflict(_) | EnrichError::Database(_)
        )
    }

    /// One-line reason stored on a failed job.
    pub fn job_message(&self) -> String {
        match self {
            EnrichError::Validation(msg) | EnrichError::Generation(msg) => msg.clone(),
            EnrichError::EntityNotFound(_) => "Entity not found".to_string(),
            other => other.to_string(),
        }
    }
}

/// Result type alias for enrich operations.
pub type Result<T> = std::result::Result<T, EnrichError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable() {
        assert!(EnrichError::StoreWrite("disk full".into()).is_retryable());
        assert!(EnrichError::Conflict("description changed".into()).is_retryable());
        assert!(!EnrichError::MissingOutput(Uuid::nil()).is_retryable());
        assert!(!EnrichError::Validation("bad".into()).is_retryable());
    }

    #[test]
    fn test_job_message_is_one_line() {
        let err = EnrichError::Validation("Failed to parse JSON output: EOF".into());
        assert_eq!(err.job_message(), "Failed to parse JSON output: EOF");

        let err = EnrichError::EntityNotFound("abc".into());
        assert_eq!(err.job_message(), "Entity not found");
    }

    #[test]
    fn test_not_ready_display() {
        let err = EnrichError::NotReady {
            job_id: Uuid::nil(),
            status: JobStatus::Approved,
            operation: "approve",
        };
        assert!(err.to_string().contains("approved"));
        assert!(err.to_string().contains("cannot approve"));
    }

    #[test]
    fn test_already_pending_names_existing_job() {
        let existing = Uuid::new_v4();
        let err = EnrichError::AlreadyPending {
            entity_id: "pub-1".into(),
            job_type: JobType::Attributes,
            existing,
        };
        assert_eq!(
            err.to_string(),
            format!("Entity pub-1 already has a pending attributes job: {}", existing)
        );
    }
}
