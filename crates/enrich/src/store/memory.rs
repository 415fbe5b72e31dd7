//! In-memory store.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use crate::audit::ChangeHistoryEntry;
use crate::codec::{AttributeValue, StorageRow, ValueSource};
use crate::error::{EnrichError, Result};
use crate::job::{EnrichmentJob, EnrichmentResult, JobFilter, JobStatus, JobType};

use super::{
    ApprovalBasis, ApprovalCommit, AttributeSelection, EnqueueOutcome, Entity, EntitySnapshot, EntityStore,
    JobStore,
};

#[derive(Debug, Clone)]
struct StoredValue {
    row: StorageRow,
    source: ValueSource,
    last_verified_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
struct State {
    entities: IndexMap<String, Entity>,
    values: HashMap<String, IndexMap<String, StoredValue>>,
    jobs: IndexMap<Uuid, EnrichmentJob>,
    history: Vec<ChangeHistoryEntry>,
    /// Writes allowed in the next approval before it fails.
    write_budget: Option<usize>,
}

impl State {
    fn spend_write(&mut self) -> Result<()> {
        match self.write_budget.as_mut() {
            Some(0) => Err(EnrichError::StoreWrite("injected write failure".into())),
            Some(n) => {
                *n -= 1;
                Ok(())
            }
            None => Ok(()),
        }
    }

    fn pending_duplicate(&self, entity_id: &str, job_type: JobType, except: Uuid) -> Option<Uuid> {
        self.jobs
            .values()
            .find(|job| {
                job.id != except
                    && job.entity_id == entity_id
                    && job.job_type == job_type
                    && job.status == JobStatus::Pending
            })
            .map(|job| job.id)
    }

    fn snapshot(&self, entity_id: &str, selection: AttributeSelection<'_>) -> Option<EntitySnapshot> {
        let entity = self.entities.get(entity_id)?;
        let attributes = self
            .values
            .get(entity_id)
            .map(|values| {
                values
                    .iter()
                    .filter(|(code, _)| selection.includes(code))
                    .map(|(code, stored)| (code.clone(), stored.row.clone()))
                    .collect()
            })
            .unwrap_or_default();
        Some(EntitySnapshot {
            entity: entity.clone(),
            attributes,
        })
    }

    /// Reasons an approval computed earlier no longer applies.
    fn approval_conflict(&self, commit: &ApprovalCommit) -> Option<String> {
        let job = self.jobs.get(&commit.job_id)?;
        if job.output.as_ref() != Some(&commit.output) {
            return Some("job output changed".to_string());
        }
        let basis: &ApprovalBasis = commit.basis.as_ref()?;
        let current = self.snapshot(&commit.entity_id, AttributeSelection::Codes(&basis.codes));
        match current {
            Some(current) if basis.matches(&current) => None,
            Some(_) => Some(format!("entity {} changed", commit.entity_id)),
            None => Some(format!("entity {} disappeared", commit.entity_id)),
        }
    }

    fn upsert(&mut self, value: &AttributeValue) {
        self.values.entry(value.entity_id.clone()).or_default().insert(
            value.attribute_code.clone(),
            StoredValue {
                row: StorageRow::from(&value.value),
                source: value.source,
                last_verified_at: value.last_verified_at,
            },
        );
    }
}

/// Store backed by tokio-mutex guarded maps.
///
/// Approvals are applied to a copy of the state that replaces the live one
/// only when every write succeeded, which gives the same all-or-nothing
/// visibility as a database transaction.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an entity.
    pub async fn insert_entity(&self, entity: Entity) {
        let mut state = self.state.lock().await;
        state.entities.insert(entity.id.clone(), entity);
    }

    /// Insert or replace a stored attribute value.
    pub async fn set_attribute(&self, value: AttributeValue) {
        self.state.lock().await.upsert(&value);
    }

    /// Insert or replace a job record as-is.
    pub async fn insert_job(&self, job: EnrichmentJob) {
        let mut state = self.state.lock().await;
        state.jobs.insert(job.id, job);
    }

    /// Make the next approval fail after `writes` successful writes.
    ///
    /// Description update, each attribute upsert, the audit append and the
    /// status change each count as one write. The budget is cleared by the
    /// first attempt that gets past the status checks.
    pub async fn fail_writes_after(&self, writes: usize) {
        self.state.lock().await.write_budget = Some(writes);
    }
}

#[async_trait]
impl EntityStore for MemoryStore {
    async fn load_entity(
        &self,
        entity_id: &str,
        selection: AttributeSelection<'_>,
    ) -> Result<Option<EntitySnapshot>> {
        Ok(self.state.lock().await.snapshot(entity_id, selection))
    }

    async fn attribute_values(&self, entity_id: &str) -> Result<Vec<AttributeValue>> {
        let state = self.state.lock().await;
        let mut values: Vec<AttributeValue> = state
            .values
            .get(entity_id)
            .into_iter()
            .flatten()
            .filter_map(|(code, stored)| {
                let Some(value) = stored.row.decode() else {
                    debug!(entity_id, attribute = %code, "Skipping undecodable row");
                    return None;
                };
                Some(AttributeValue {
                    entity_id: entity_id.to_string(),
                    attribute_code: code.clone(),
                    value,
                    source: stored.source,
                    last_verified_at: stored.last_verified_at,
                })
            })
            .collect();
        values.sort_by(|a, b| a.attribute_code.cmp(&b.attribute_code));
        Ok(values)
    }

    async fn history(&self, entity_id: &str) -> Result<Vec<ChangeHistoryEntry>> {
        let state = self.state.lock().await;
        Ok(state
            .history
            .iter()
            .filter(|entry| entry.entity_id == entity_id)
            .cloned()
            .collect())
    }

    async fn append_history(&self, entry: &ChangeHistoryEntry) -> Result<()> {
        let mut state = self.state.lock().await;
        if !state.entities.contains_key(&entry.entity_id) {
            return Err(EnrichError::EntityNotFound(entry.entity_id.clone()));
        }
        state.history.push(entry.clone());
        Ok(())
    }

    async fn commit_approval(&self, commit: &ApprovalCommit) -> Result<()> {
        let mut live = self.state.lock().await;

        let job = live
            .jobs
            .get(&commit.job_id)
            .ok_or(EnrichError::JobNotFound(commit.job_id))?;
        if job.status != JobStatus::AwaitingReview {
            return Err(EnrichError::NotReady {
                job_id: commit.job_id,
                status: job.status,
                operation: "approve",
            });
        }
        if let Some(reason) = live.approval_conflict(commit) {
            return Err(EnrichError::Conflict(reason));
        }

        let budget = live.write_budget.take();
        let mut next = live.clone();
        next.write_budget = budget;

        if let Some(description) = &commit.description {
            next.spend_write()?;
            let entity = next
                .entities
                .get_mut(&commit.entity_id)
                .ok_or_else(|| EnrichError::EntityNotFound(commit.entity_id.clone()))?;
            entity.description = Some(description.clone());
        }

        for value in &commit.attribute_writes {
            next.spend_write()?;
            next.upsert(value);
        }

        if let Some(entry) = &commit.audit {
            next.spend_write()?;
            next.history.push(entry.clone());
        }

        next.spend_write()?;
        if let Some(job) = next.jobs.get_mut(&commit.job_id) {
            job.mark_approved(&commit.moderator, commit.approved_at);
        }

        next.write_budget = None;
        *live = next;
        Ok(())
    }
}

#[async_trait]
impl JobStore for MemoryStore {
    async fn enqueue(
        &self,
        entity_id: &str,
        job_type: JobType,
        input: Option<Value>,
    ) -> Result<EnqueueOutcome> {
        let mut state = self.state.lock().await;
        if !state.entities.contains_key(entity_id) {
            return Err(EnrichError::EntityNotFound(entity_id.to_string()));
        }

        if let Some(existing) = state.jobs.values().find(|job| {
            job.entity_id == entity_id
                && job.job_type == job_type
                && job.status == JobStatus::Pending
        }) {
            return Ok(EnqueueOutcome {
                job: existing.clone(),
                created: false,
            });
        }

        let mut job = EnrichmentJob::pending(entity_id, job_type);
        job.input = input;
        state.jobs.insert(job.id, job.clone());
        Ok(EnqueueOutcome { job, created: true })
    }

    async fn get_job(&self, job_id: Uuid) -> Result<Option<EnrichmentJob>> {
        Ok(self.state.lock().await.jobs.get(&job_id).cloned())
    }

    async fn list_jobs(&self, filter: &JobFilter) -> Result<Vec<EnrichmentJob>> {
        let state = self.state.lock().await;
        let mut jobs: Vec<_> = state
            .jobs
            .values()
            .filter(|job| filter.matches(job))
            .cloned()
            .collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        if let Some(limit) = filter.limit {
            jobs.truncate(limit);
        }
        Ok(jobs)
    }

    async fn pending_jobs(&self, limit: usize) -> Result<Vec<EnrichmentJob>> {
        let state = self.state.lock().await;
        let mut jobs: Vec<_> = state
            .jobs
            .values()
            .filter(|job| job.status == JobStatus::Pending)
            .cloned()
            .collect();
        jobs.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        jobs.truncate(limit);
        Ok(jobs)
    }

    async fn try_start(&self, job_id: Uuid) -> Result<bool> {
        let mut state = self.state.lock().await;
        match state.jobs.get_mut(&job_id) {
            Some(job) if job.status == JobStatus::Pending => {
                job.mark_started(Utc::now());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn complete(&self, job_id: Uuid, output: &EnrichmentResult) -> Result<bool> {
        let mut state = self.state.lock().await;
        match state.jobs.get_mut(&job_id) {
            Some(job) if job.status == JobStatus::Processing => {
                job.mark_awaiting_review(output.clone(), Utc::now());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn fail(&self, job_id: Uuid, message: &str) -> Result<bool> {
        let mut state = self.state.lock().await;
        match state.jobs.get_mut(&job_id) {
            Some(job) if job.status == JobStatus::Processing => {
                job.mark_failed(message, Utc::now());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn reject(&self, job_id: Uuid, reason: &str) -> Result<bool> {
        let mut state = self.state.lock().await;
        match state.jobs.get_mut(&job_id) {
            Some(job) if job.status.is_reviewable() => {
                job.mark_rejected(reason, Utc::now());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn rerun(&self, job_id: Uuid) -> Result<bool> {
        let mut state = self.state.lock().await;
        let Some(job) = state.jobs.get(&job_id) else {
            return Ok(false);
        };
        if !job.status.can_rerun() {
            return Ok(false);
        }
        if let Some(existing) = state.pending_duplicate(&job.entity_id, job.job_type, job_id) {
            return Err(EnrichError::AlreadyPending {
                entity_id: job.entity_id.clone(),
                job_type: job.job_type,
                existing,
            });
        }
        if let Some(job) = state.jobs.get_mut(&job_id) {
            job.reset(Utc::now());
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::CanonicalValue;

    async fn store_with_entity() -> MemoryStore {
        let store = MemoryStore::new();
        store
            .insert_entity(Entity::new("pub-1", "The Tap Room").with_description("Old text"))
            .await;
        store
    }

    #[tokio::test]
    async fn test_enqueue_dedups_pending() {
        let store = store_with_entity().await;
        let first = store.enqueue("pub-1", JobType::Description, None).await.unwrap();
        let second = store.enqueue("pub-1", JobType::Description, None).await.unwrap();
        assert!(first.created);
        assert!(!second.created);
        assert_eq!(first.job.id, second.job.id);

        let other = store.enqueue("pub-1", JobType::Attributes, None).await.unwrap();
        assert!(other.created);
    }

    #[tokio::test]
    async fn test_enqueue_unknown_entity() {
        let store = MemoryStore::new();
        let err = store.enqueue("nope", JobType::Description, None).await.unwrap_err();
        assert!(matches!(err, EnrichError::EntityNotFound(_)));
    }

    #[tokio::test]
    async fn test_try_start_only_once() {
        let store = store_with_entity().await;
        let job = store.enqueue("pub-1", JobType::Faq, None).await.unwrap().job;
        assert!(store.try_start(job.id).await.unwrap());
        assert!(!store.try_start(job.id).await.unwrap());
        assert_eq!(
            store.get_job(job.id).await.unwrap().unwrap().status,
            JobStatus::Processing
        );
    }

    #[tokio::test]
    async fn test_load_entity_selection() {
        let store = store_with_entity().await;
        let now = Utc::now();
        store
            .set_attribute(AttributeValue::approved("pub-1", "wifi", CanonicalValue::Bool(true), now))
            .await;
        store
            .set_attribute(AttributeValue::approved("pub-1", "karaoke", CanonicalValue::Bool(false), now))
            .await;

        let codes = vec!["wifi".to_string()];
        let snapshot = store
            .load_entity("pub-1", AttributeSelection::Codes(&codes))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(snapshot.attributes.len(), 1);
        assert_eq!(snapshot.description(), Some("Old text"));

        let all = store
            .load_entity("pub-1", AttributeSelection::All)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(all.attributes.len(), 2);
        assert!(store.load_entity("missing", AttributeSelection::All).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_pending_jobs_oldest_first() {
        let store = store_with_entity().await;
        let mut older = EnrichmentJob::pending("pub-1", JobType::Description);
        older.created_at = Utc::now() - chrono::Duration::minutes(5);
        let newer = EnrichmentJob::pending("pub-1", JobType::Attributes);
        store.insert_job(newer.clone()).await;
        store.insert_job(older.clone()).await;

        let pending = store.pending_jobs(10).await.unwrap();
        assert_eq!(pending[0].id, older.id);
        assert_eq!(store.pending_jobs(1).await.unwrap().len(), 1);
    }

    fn description_commit(job: &EnrichmentJob) -> ApprovalCommit {
        ApprovalCommit {
            job_id: job.id,
            entity_id: job.entity_id.clone(),
            moderator: "mod-1".into(),
            approved_at: Utc::now(),
            output: job.output.clone().unwrap_or_default(),
            basis: None,
            description: Some("New text".into()),
            attribute_writes: Vec::new(),
            audit: None,
        }
    }

    #[tokio::test]
    async fn test_write_budget_survives_refused_attempt() {
        let store = store_with_entity().await;
        let job = store.enqueue("pub-1", JobType::Description, None).await.unwrap().job;
        store.fail_writes_after(0).await;

        let err = store.commit_approval(&description_commit(&job)).await.unwrap_err();
        assert!(matches!(err, EnrichError::NotReady { .. }));

        assert!(store.try_start(job.id).await.unwrap());
        assert!(store.complete(job.id, &EnrichmentResult::default()).await.unwrap());
        let job = store.get_job(job.id).await.unwrap().unwrap();

        let err = store.commit_approval(&description_commit(&job)).await.unwrap_err();
        assert!(matches!(err, EnrichError::StoreWrite(_)));

        store.commit_approval(&description_commit(&job)).await.unwrap();
        let snapshot = store.load_entity("pub-1", AttributeSelection::All).await.unwrap().unwrap();
        assert_eq!(snapshot.description(), Some("New text"));
    }

    #[tokio::test]
    async fn test_commit_refuses_stale_output() {
        let store = store_with_entity().await;
        let mut job = EnrichmentJob::pending("pub-1", JobType::Description);
        job.mark_started(Utc::now());
        job.mark_awaiting_review(EnrichmentResult::default(), Utc::now());
        store.insert_job(job.clone()).await;

        let mut commit = description_commit(&job);
        commit.output.summary = Some("Something else".into());
        let err = store.commit_approval(&commit).await.unwrap_err();
        assert!(matches!(err, EnrichError::Conflict(_)));
        assert_eq!(
            store.get_job(job.id).await.unwrap().unwrap().status,
            JobStatus::AwaitingReview
        );
    }

    #[tokio::test]
    async fn test_attribute_values_skip_broken_rows() {
        let store = store_with_entity().await;
        let now = Utc::now();
        store
            .set_attribute(AttributeValue::approved("pub-1", "wifi", CanonicalValue::Bool(true), now))
            .await;
        store.state.lock().await.values.entry("pub-1".into()).or_default().insert(
            "karaoke".into(),
            StoredValue {
                row: StorageRow::default(),
                source: ValueSource::Editorial,
                last_verified_at: now,
            },
        );

        let values = store.attribute_values("pub-1").await.unwrap();
        assert_eq!(values.len(), 1);
        assert_eq!(values[0].attribute_code, "wifi");
        assert_eq!(values[0].source, ValueSource::AiEnrichmentApproved);
        assert_eq!(values[0].last_verified_at, now);
        assert!(store.attribute_values("missing").await.unwrap().is_empty());
    }
}
