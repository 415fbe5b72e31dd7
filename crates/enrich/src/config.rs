//! Configuration for the enrichment pipeline.

use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use crate::codec::RatingPolicy;
use crate::error::{EnrichError, Result};

/// Default reason stored when a moderator rejects without one.
pub const DEFAULT_REJECT_REASON: &str = "Rejected by moderator";

/// Shape limits enforced on generated descriptions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputLimits {
    /// Allowed summary length in characters.
    pub summary_chars: RangeInclusive<usize>,
    /// Exact number of highlights.
    pub highlight_count: usize,
    /// Allowed length of each highlight in characters.
    pub highlight_chars: RangeInclusive<usize>,
}

impl Default for OutputLimits {
    fn default() -> Self {
        Self {
            summary_chars: 20..=320,
            highlight_count: 3,
            highlight_chars: 3..=80,
        }
    }
}

/// Configuration for stores, workers and moderation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichConfig {
    /// SQLite URL, e.g. `sqlite://enrich.db` or `sqlite::memory:`.
    pub database_url: String,

    /// Maximum pending jobs pulled per worker batch.
    pub batch_limit: usize,

    /// Maximum jobs processed concurrently within a batch.
    pub worker_concurrency: usize,

    /// How out-of-range ratings are handled.
    pub rating_policy: RatingPolicy,

    /// Reason stored on reject when the moderator gives none.
    pub default_reject_reason: String,

    /// Limits applied to generated descriptions.
    pub output_limits: OutputLimits,
}

impl Default for EnrichConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://enrich.db".to_string(),
            batch_limit: 5,
            worker_concurrency: 4,
            rating_policy: RatingPolicy::Reject,
            default_reject_reason: DEFAULT_REJECT_REASON.to_string(),
            output_limits: OutputLimits::default(),
        }
    }
}

impl EnrichConfig {
    /// Create a configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the database URL.
    pub fn with_database_url(mut self, url: impl Into<String>) -> Self {
        self.database_url = url.into();
        self
    }

    /// Set the batch limit.
    pub fn with_batch_limit(mut self, limit: usize) -> Self {
        self.batch_limit = limit;
        self
    }

    /// Set the worker concurrency.
    pub fn with_worker_concurrency(mut self, workers: usize) -> Self {
        self.worker_concurrency = workers;
        self
    }

    /// Set the rating policy.
    pub fn with_rating_policy(mut self, policy: RatingPolicy) -> Self {
        self.rating_policy = policy;
        self
    }

    /// Set the default reject reason.
    pub fn with_default_reject_reason(mut self, reason: impl Into<String>) -> Self {
        self.default_reject_reason = reason.into();
        self
    }

    /// Set the output limits.
    pub fn with_output_limits(mut self, limits: OutputLimits) -> Self {
        self.output_limits = limits;
        self
    }

    /// Check values that would otherwise stall or misbehave at runtime.
    pub fn validate(&self) -> Result<()> {
        if self.batch_limit == 0 {
            return Err(EnrichError::Config("batch_limit must be at least 1".into()));
        }
        if self.worker_concurrency == 0 {
            return Err(EnrichError::Config(
                "worker_concurrency must be at least 1".into(),
            ));
        }
        if self.default_reject_reason.trim().is_empty() {
            return Err(EnrichError::Config(
                "default_reject_reason must not be empty".into(),
            ));
        }
        if self.output_limits.summary_chars.is_empty()
            || self.output_limits.highlight_chars.is_empty()
        {
            return Err(EnrichError::Config("output limits are empty ranges".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EnrichConfig::default();
        assert_eq!(config.batch_limit, 5);
        assert_eq!(config.rating_policy, RatingPolicy::Reject);
        assert_eq!(config.default_reject_reason, "Rejected by moderator");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_workers() {
        let config = EnrichConfig::new().with_worker_concurrency(0);
        assert!(matches!(config.validate(), Err(EnrichError::Config(_))));
    }

    #[test]
    fn test_builders() {
        let config = EnrichConfig::new()
            .with_database_url("sqlite::memory:")
            .with_batch_limit(10)
            .with_rating_policy(RatingPolicy::Clamp);
        assert_eq!(config.database_url, "sqlite::memory:");
        assert_eq!(config.batch_limit, 10);
        assert_eq!(config.rating_policy, RatingPolicy::Clamp);
    }
}
