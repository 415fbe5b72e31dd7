//! Single-job execution.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::attribute::AttributeRegistry;
use crate::codec::ValueCodec;
use crate::config::OutputLimits;
use crate::error::{EnrichError, Result};
use crate::generation::{attributes_prompt, description_prompt, GenerationProvider};
use crate::store::{AttributeSelection, EntitySnapshot, Store};

use super::job::EnrichmentJob;
use super::result::{parse_attributes, parse_description, EnrichmentResult};
use super::status::JobType;

/// How one `process` call ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// Output stored; the job waits for a moderator.
    AwaitingReview,
    /// The job was marked failed with this message.
    Failed(String),
    /// Another worker claimed the job first.
    Skipped,
}

/// How many proposed attributes would survive encoding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CodecReport {
    pub accepted: usize,
    pub unknown: usize,
    pub rejected: usize,
}

impl CodecReport {
    /// Classify the attributes of a result.
    pub fn of(result: &EnrichmentResult, codec: &ValueCodec) -> Self {
        let mut report = CodecReport::default();
        for (code, raw) in result.attributes.iter().flatten() {
            match codec.encode_attribute(code, raw) {
                Ok(_) => report.accepted += 1,
                Err(EnrichError::UnknownAttribute(_)) => report.unknown += 1,
                Err(_) => report.rejected += 1,
            }
        }
        report
    }
}

/// Drives one job from `pending` to `awaiting_review` or `failed`.
pub struct JobRunner {
    store: Arc<dyn Store>,
    provider: Arc<dyn GenerationProvider>,
    codec: ValueCodec,
    limits: OutputLimits,
}

impl JobRunner {
    /// Create a runner.
    pub fn new(
        store: Arc<dyn Store>,
        provider: Arc<dyn GenerationProvider>,
        codec: ValueCodec,
    ) -> Self {
        Self {
            store,
            provider,
            codec,
            limits: OutputLimits::default(),
        }
    }

    /// Set the description output limits.
    pub fn with_limits(mut self, limits: OutputLimits) -> Self {
        self.limits = limits;
        self
    }

    fn registry(&self) -> &AttributeRegistry {
        self.codec.registry()
    }

    /// Claim and run one job.
    ///
    /// Generation problems end in `failed` with a message on the job; only
    /// store errors are returned as `Err`.
    pub async fn process(&self, job: &EnrichmentJob) -> Result<JobOutcome> {
        if !self.store.try_start(job.id).await? {
            debug!(job_id = %job.id, "Job already claimed, skipping");
            return Ok(JobOutcome::Skipped);
        }

        match self.generate(job).await {
            Ok(output) => {
                let report = CodecReport::of(&output, &self.codec);
                if !self.store.complete(job.id, &output).await? {
                    warn!(job_id = %job.id, "Job left processing before completion");
                    return Ok(JobOutcome::Skipped);
                }
                info!(
                    job_id = %job.id,
                    entity_id = %job.entity_id,
                    job_type = %job.job_type,
                    accepted = report.accepted,
                    unknown = report.unknown,
                    rejected = report.rejected,
                    "Job ready for review"
                );
                Ok(JobOutcome::AwaitingReview)
            }
            Err(e) if e.is_retryable() => {
                let message = e.job_message();
                self.store.fail(job.id, &message).await?;
                Err(e)
            }
            Err(e) => {
                let message = e.job_message();
                warn!(
                    job_id = %job.id,
                    job_type = %job.job_type,
                    error = %message,
                    "Job failed"
                );
                self.store.fail(job.id, &message).await?;
                Ok(JobOutcome::Failed(message))
            }
        }
    }

    async fn generate(&self, job: &EnrichmentJob) -> Result<EnrichmentResult> {
        if !job.job_type.is_generated() {
            return Err(EnrichError::Validation(format!(
                "Unsupported job_type: {}",
                job.job_type
            )));
        }

        let entity = self
            .store
            .load_entity(&job.entity_id, AttributeSelection::All)
            .await?
            .ok_or_else(|| EnrichError::EntityNotFound(job.entity_id.clone()))?;

        match job.job_type {
            JobType::Description => self.generate_description(&entity).await,
            JobType::Attributes => self.generate_attributes(&entity).await,
            JobType::FullEnrichment => {
                let (description, attributes) = tokio::try_join!(
                    self.generate_description(&entity),
                    self.generate_attributes(&entity)
                )?;
                Ok(description.merge(attributes))
            }
            other => Err(EnrichError::Validation(format!(
                "Unsupported job_type: {}",
                other
            ))),
        }
    }

    async fn generate_description(&self, entity: &EntitySnapshot) -> Result<EnrichmentResult> {
        let prompt = description_prompt(entity, self.registry());
        let response = self.provider.generate(&prompt).await?;
        parse_description(&response, &self.limits)
    }

    async fn generate_attributes(&self, entity: &EntitySnapshot) -> Result<EnrichmentResult> {
        let prompt = attributes_prompt(entity, self.registry());
        let response = self.provider.generate(&prompt).await?;
        parse_attributes(&response)
    }
}
