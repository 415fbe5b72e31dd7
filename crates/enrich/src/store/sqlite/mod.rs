//! SQLite store.

mod schema;

use std::str::FromStr;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{QueryBuilder, Row, Sqlite, SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::audit::ChangeHistoryEntry;
use crate::codec::{AttributeValue, StorageRow, ValueSource};
use crate::error::{EnrichError, Result};
use crate::job::{EnrichmentJob, EnrichmentResult, JobError, JobFilter, JobStatus, JobType};

use super::{
    ApprovalBasis, ApprovalCommit, AttributeSelection, EnqueueOutcome, Entity, EntitySnapshot, EntityStore,
    JobStore,
};

pub use schema::apply_migrations;

/// Statuses that read as `awaiting_review`; `completed` is the legacy name.
const REVIEWABLE: &str = "('awaiting_review', 'completed')";

/// Statuses `rerun` may reset.
const RERUNNABLE: &str = "('awaiting_review', 'completed', 'approved', 'rejected', 'failed')";

const JOB_COLUMNS: &str = "id, entity_id, job_type, status, input, output, error, \
     created_at, updated_at, completed_at, approved_at, approved_by";

const VALUE_COLUMNS: &str = "attribute_code, boolean_value, int_value, numeric_min, \
     numeric_max, rating_value, tags_value, text_value, schedule_value";

/// Store backed by a SQLite database.
///
/// Pending-job uniqueness is a partial unique index and the audit table
/// rejects updates and deletes through triggers, so both hold even for
/// writers that bypass this type.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Connect to a database URL, creating the file if needed, and migrate.
    pub async fn connect(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);

        // Every connection to `:memory:` is a separate database.
        let in_memory = url.contains(":memory:");
        let pool = SqlitePoolOptions::new()
            .max_connections(if in_memory { 1 } else { 5 })
            .min_connections(if in_memory { 1 } else { 0 })
            .idle_timeout(if in_memory { None } else { Some(std::time::Duration::from_secs(60)) })
            .max_lifetime(if in_memory { None } else { Some(std::time::Duration::from_secs(1800)) })
            .connect_with(options)
            .await?;

        debug!(url, "Connected to database");
        Self::from_pool(pool).await
    }

    /// Fresh private in-memory database.
    pub async fn in_memory() -> Result<Self> {
        Self::connect("sqlite::memory:").await
    }

    /// Wrap an existing pool and migrate it.
    pub async fn from_pool(pool: SqlitePool) -> Result<Self> {
        apply_migrations(&pool).await?;
        Ok(Self { pool })
    }

    /// The underlying pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Insert or update an entity.
    pub async fn insert_entity(&self, entity: &Entity) -> Result<()> {
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO entities (id, name, description, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                description = excluded.description,
                updated_at = excluded.updated_at",
        )
        .bind(&entity.id)
        .bind(&entity.name)
        .bind(&entity.description)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Insert or replace a stored attribute value.
    pub async fn set_attribute(&self, value: &AttributeValue) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        upsert_value(&mut *conn, value).await?;
        Ok(())
    }

    /// Insert a job record as-is.
    pub async fn insert_job(&self, job: &EnrichmentJob) -> Result<()> {
        sqlx::query(&format!(
            "INSERT INTO enrichment_jobs ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            JOB_COLUMNS
        ))
        .bind(job.id.to_string())
        .bind(&job.entity_id)
        .bind(job.job_type.as_str())
        .bind(job.status.as_str())
        .bind(to_json_text(&job.input)?)
        .bind(to_json_text(&job.output)?)
        .bind(to_json_text(&job.error)?)
        .bind(job.created_at)
        .bind(job.updated_at)
        .bind(job.completed_at)
        .bind(job.approved_at)
        .bind(&job.approved_by)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn entity_exists(&self, entity_id: &str) -> Result<bool> {
        let found: Option<String> = sqlx::query_scalar("SELECT id FROM entities WHERE id = ?")
            .bind(entity_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(found.is_some())
    }

    async fn pending_job_for(
        &self,
        entity_id: &str,
        job_type: JobType,
    ) -> Result<Option<EnrichmentJob>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM enrichment_jobs
             WHERE entity_id = ? AND job_type = ? AND status = 'pending'",
            JOB_COLUMNS
        ))
        .bind(entity_id)
        .bind(job_type.as_str())
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(job_from_row).transpose()
    }

    /// Run a conditional status update binding `updated_at`, an optional
    /// error payload, then the job id.
    async fn transition(&self, sql: &str, error: Option<String>, job_id: Uuid) -> Result<bool> {
        let mut query = sqlx::query(sql).bind(Utc::now());
        if let Some(error) = error {
            query = query.bind(error);
        }
        let result = query.bind(job_id.to_string()).execute(&self.pool).await?;
        Ok(result.rows_affected() == 1)
    }
}

fn to_json_text<T: serde::Serialize>(value: &Option<T>) -> Result<Option<String>> {
    value
        .as_ref()
        .map(serde_json::to_string)
        .transpose()
        .map_err(EnrichError::from)
}

fn from_json_text<T: serde::de::DeserializeOwned>(text: Option<String>) -> Result<Option<T>> {
    text.map(|t| serde_json::from_str(&t))
        .transpose()
        .map_err(EnrichError::from)
}

fn parse_uuid(text: &str) -> Result<Uuid> {
    Uuid::parse_str(text).map_err(|e| EnrichError::Validation(format!("Bad job id {}: {}", text, e)))
}

fn job_from_row(row: &SqliteRow) -> Result<EnrichmentJob> {
    let id: String = row.try_get("id")?;
    let job_type: String = row.try_get("job_type")?;
    let status: String = row.try_get("status")?;
    Ok(EnrichmentJob {
        id: parse_uuid(&id)?,
        entity_id: row.try_get("entity_id")?,
        job_type: job_type.parse()?,
        status: status.parse()?,
        input: from_json_text::<Value>(row.try_get("input")?)?,
        output: from_json_text::<EnrichmentResult>(row.try_get("output")?)?,
        error: from_json_text::<JobError>(row.try_get("error")?)?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        completed_at: row.try_get("completed_at")?,
        approved_at: row.try_get("approved_at")?,
        approved_by: row.try_get("approved_by")?,
    })
}

/// Read a storage row; unreadable JSON slots count as empty.
fn storage_row_from(row: &SqliteRow) -> Result<StorageRow> {
    let tags: Option<String> = row.try_get("tags_value")?;
    let schedule: Option<String> = row.try_get("schedule_value")?;
    Ok(StorageRow {
        boolean_value: row.try_get("boolean_value")?,
        int_value: row.try_get("int_value")?,
        numeric_min: row.try_get("numeric_min")?,
        numeric_max: row.try_get("numeric_max")?,
        rating_value: row.try_get("rating_value")?,
        tags_value: tags.and_then(|t| serde_json::from_str(&t).ok()),
        text_value: row.try_get("text_value")?,
        schedule_value: schedule.and_then(|s| serde_json::from_str(&s).ok()),
    })
}

fn history_from_row(row: &SqliteRow) -> Result<ChangeHistoryEntry> {
    let id: String = row.try_get("id")?;
    let before: Option<String> = row.try_get("before")?;
    let after: String = row.try_get("after")?;
    Ok(ChangeHistoryEntry {
        id: parse_uuid(&id)?,
        entity_id: row.try_get("entity_id")?,
        actor: row.try_get("actor")?,
        action: row.try_get("action")?,
        before: from_json_text(before)?,
        after: serde_json::from_str(&after)?,
        created_at: row.try_get("created_at")?,
    })
}

async fn upsert_value(conn: &mut SqliteConnection, value: &AttributeValue) -> Result<()> {
    let row = StorageRow::from(&value.value);
    sqlx::query(
        "INSERT INTO attribute_values (
            entity_id, attribute_code, boolean_value, int_value, numeric_min, numeric_max,
            rating_value, tags_value, text_value, schedule_value, source, last_verified_at
         ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT(entity_id, attribute_code) DO UPDATE SET
            boolean_value = excluded.boolean_value,
            int_value = excluded.int_value,
            numeric_min = excluded.numeric_min,
            numeric_max = excluded.numeric_max,
            rating_value = excluded.rating_value,
            tags_value = excluded.tags_value,
            text_value = excluded.text_value,
            schedule_value = excluded.schedule_value,
            source = excluded.source,
            last_verified_at = excluded.last_verified_at",
    )
    .bind(&value.entity_id)
    .bind(&value.attribute_code)
    .bind(row.boolean_value)
    .bind(row.int_value)
    .bind(row.numeric_min)
    .bind(row.numeric_max)
    .bind(row.rating_value)
    .bind(to_json_text(&row.tags_value)?)
    .bind(row.text_value)
    .bind(to_json_text(&row.schedule_value)?)
    .bind(value.source.as_str())
    .bind(value.last_verified_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn load_snapshot(
    conn: &mut SqliteConnection,
    entity_id: &str,
    selection: AttributeSelection<'_>,
) -> Result<Option<EntitySnapshot>> {
    let Some(row) = sqlx::query("SELECT id, name, description FROM entities WHERE id = ?")
        .bind(entity_id)
        .fetch_optional(&mut *conn)
        .await?
    else {
        return Ok(None);
    };

    let entity = Entity {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
    };

    let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
        "SELECT {} FROM attribute_values WHERE entity_id = ",
        VALUE_COLUMNS
    ));
    query.push_bind(entity_id);
    if let AttributeSelection::Codes(codes) = selection {
        if codes.is_empty() {
            return Ok(Some(EntitySnapshot {
                entity,
                attributes: Default::default(),
            }));
        }
        query.push(" AND attribute_code IN (");
        let mut separated = query.separated(", ");
        for code in codes {
            separated.push_bind(code);
        }
        separated.push_unseparated(")");
    }
    query.push(" ORDER BY attribute_code");

    let rows = query.build().fetch_all(&mut *conn).await?;
    let mut attributes = indexmap::IndexMap::with_capacity(rows.len());
    for row in &rows {
        let code: String = row.try_get("attribute_code")?;
        attributes.insert(code, storage_row_from(row)?);
    }

    Ok(Some(EntitySnapshot { entity, attributes }))
}

/// Compare the basis of an approval with what the transaction sees now.
async fn basis_conflict(
    conn: &mut SqliteConnection,
    entity_id: &str,
    basis: &ApprovalBasis,
) -> Result<Option<String>> {
    let current = load_snapshot(conn, entity_id, AttributeSelection::Codes(&basis.codes)).await?;
    Ok(match current {
        Some(current) if basis.matches(&current) => None,
        Some(_) => Some(format!("entity {} changed", entity_id)),
        None => Some(format!("entity {} disappeared", entity_id)),
    })
}

async fn insert_history(conn: &mut SqliteConnection, entry: &ChangeHistoryEntry) -> Result<()> {
    sqlx::query(
        "INSERT INTO change_history (id, entity_id, actor, action, before, after, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(entry.id.to_string())
    .bind(&entry.entity_id)
    .bind(&entry.actor)
    .bind(&entry.action)
    .bind(to_json_text(&entry.before)?)
    .bind(serde_json::to_string(&entry.after)?)
    .bind(entry.created_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

fn store_write(e: EnrichError) -> EnrichError {
    match e {
        EnrichError::Database(db) => EnrichError::StoreWrite(db.to_string()),
        other => other,
    }
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.is_unique_violation())
}

#[async_trait]
impl EntityStore for SqliteStore {
    async fn load_entity(
        &self,
        entity_id: &str,
        selection: AttributeSelection<'_>,
    ) -> Result<Option<EntitySnapshot>> {
        let mut conn = self.pool.acquire().await?;
        load_snapshot(&mut *conn, entity_id, selection).await
    }

    async fn attribute_values(&self, entity_id: &str) -> Result<Vec<AttributeValue>> {
        let rows = sqlx::query(&format!(
            "SELECT {}, source, last_verified_at FROM attribute_values
             WHERE entity_id = ? ORDER BY attribute_code",
            VALUE_COLUMNS
        ))
        .bind(entity_id)
        .fetch_all(&self.pool)
        .await?;

        let mut values = Vec::with_capacity(rows.len());
        for row in &rows {
            let code: String = row.try_get("attribute_code")?;
            let Some(value) = storage_row_from(row)?.decode() else {
                debug!(entity_id, attribute = %code, "Skipping undecodable row");
                continue;
            };
            let source: String = row.try_get("source")?;
            let source = ValueSource::parse(&source).ok_or_else(|| {
                EnrichError::Validation(format!("Unknown value source: {}", source))
            })?;
            values.push(AttributeValue {
                entity_id: entity_id.to_string(),
                attribute_code: code,
                value,
                source,
                last_verified_at: row.try_get("last_verified_at")?,
            });
        }
        Ok(values)
    }

    async fn history(&self, entity_id: &str) -> Result<Vec<ChangeHistoryEntry>> {
        let rows = sqlx::query(
            "SELECT id, entity_id, actor, action, before, after, created_at
             FROM change_history WHERE entity_id = ?
             ORDER BY created_at, rowid",
        )
        .bind(entity_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(history_from_row).collect()
    }

    async fn append_history(&self, entry: &ChangeHistoryEntry) -> Result<()> {
        if !self.entity_exists(&entry.entity_id).await? {
            return Err(EnrichError::EntityNotFound(entry.entity_id.clone()));
        }
        let mut conn = self.pool.acquire().await?;
        insert_history(&mut *conn, entry).await
    }

    async fn commit_approval(&self, commit: &ApprovalCommit) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query("SELECT status, output FROM enrichment_jobs WHERE id = ?")
            .bind(commit.job_id.to_string())
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(EnrichError::JobNotFound(commit.job_id))?;
        let status: String = row.try_get("status")?;
        let status: JobStatus = status.parse()?;
        if status != JobStatus::AwaitingReview {
            return Err(EnrichError::NotReady {
                job_id: commit.job_id,
                status,
                operation: "approve",
            });
        }

        let output = from_json_text::<EnrichmentResult>(row.try_get("output")?)?;
        if output.as_ref() != Some(&commit.output) {
            return Err(EnrichError::Conflict("job output changed".to_string()));
        }
        if let Some(basis) = &commit.basis {
            if let Some(reason) = basis_conflict(&mut *tx, &commit.entity_id, basis).await? {
                return Err(EnrichError::Conflict(reason));
            }
        }

        if let Some(description) = &commit.description {
            let updated = sqlx::query(
                "UPDATE entities SET description = ?, updated_at = ? WHERE id = ?",
            )
            .bind(description)
            .bind(commit.approved_at)
            .bind(&commit.entity_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| EnrichError::StoreWrite(e.to_string()))?;
            if updated.rows_affected() != 1 {
                return Err(EnrichError::EntityNotFound(commit.entity_id.clone()));
            }
        }

        for value in &commit.attribute_writes {
            upsert_value(&mut *tx, value).await.map_err(store_write)?;
        }

        if let Some(entry) = &commit.audit {
            insert_history(&mut *tx, entry).await.map_err(store_write)?;
        }

        let approved = sqlx::query(&format!(
            "UPDATE enrichment_jobs
             SET status = 'approved', approved_at = ?, approved_by = ?, updated_at = ?
             WHERE id = ? AND status IN {}",
            REVIEWABLE
        ))
        .bind(commit.approved_at)
        .bind(&commit.moderator)
        .bind(commit.approved_at)
        .bind(commit.job_id.to_string())
        .execute(&mut *tx)
        .await
        .map_err(|e| EnrichError::StoreWrite(e.to_string()))?;
        if approved.rows_affected() != 1 {
            return Err(EnrichError::NotReady {
                job_id: commit.job_id,
                status,
                operation: "approve",
            });
        }

        tx.commit()
            .await
            .map_err(|e| EnrichError::StoreWrite(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl JobStore for SqliteStore {
    async fn enqueue(
        &self,
        entity_id: &str,
        job_type: JobType,
        input: Option<Value>,
    ) -> Result<EnqueueOutcome> {
        if !self.entity_exists(entity_id).await? {
            return Err(EnrichError::EntityNotFound(entity_id.to_string()));
        }

        let mut job = EnrichmentJob::pending(entity_id, job_type);
        job.input = input;

        let inserted = sqlx::query(
            "INSERT OR IGNORE INTO enrichment_jobs
                (id, entity_id, job_type, status, input, created_at, updated_at)
             VALUES (?, ?, ?, 'pending', ?, ?, ?)",
        )
        .bind(job.id.to_string())
        .bind(&job.entity_id)
        .bind(job.job_type.as_str())
        .bind(to_json_text(&job.input)?)
        .bind(job.created_at)
        .bind(job.updated_at)
        .execute(&self.pool)
        .await?;

        if inserted.rows_affected() == 1 {
            return Ok(EnqueueOutcome { job, created: true });
        }

        match self.pending_job_for(entity_id, job_type).await? {
            Some(existing) => Ok(EnqueueOutcome {
                job: existing,
                created: false,
            }),
            // The pending job left `pending` between the two statements.
            None => self.enqueue(entity_id, job_type, job.input).await,
        }
    }

    async fn get_job(&self, job_id: Uuid) -> Result<Option<EnrichmentJob>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM enrichment_jobs WHERE id = ?",
            JOB_COLUMNS
        ))
        .bind(job_id.to_string())
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(job_from_row).transpose()
    }

    async fn list_jobs(&self, filter: &JobFilter) -> Result<Vec<EnrichmentJob>> {
        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {} FROM enrichment_jobs WHERE 1 = 1",
            JOB_COLUMNS
        ));
        match filter.status {
            Some(JobStatus::AwaitingReview) => {
                query.push(" AND status IN ");
                query.push(REVIEWABLE);
            }
            Some(status) => {
                query.push(" AND status = ");
                query.push_bind(status.as_str());
            }
            None => {}
        }
        if let Some(entity_id) = &filter.entity_id {
            query.push(" AND entity_id = ");
            query.push_bind(entity_id.clone());
        }
        if let Some(job_type) = filter.job_type {
            query.push(" AND job_type = ");
            query.push_bind(job_type.as_str());
        }
        query.push(" ORDER BY created_at DESC, rowid DESC");
        if let Some(limit) = filter.limit {
            query.push(" LIMIT ");
            query.push_bind(limit as i64);
        }

        let rows = query.build().fetch_all(&self.pool).await?;
        rows.iter().map(job_from_row).collect()
    }

    async fn pending_jobs(&self, limit: usize) -> Result<Vec<EnrichmentJob>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM enrichment_jobs WHERE status = 'pending'
             ORDER BY created_at, rowid LIMIT ?",
            JOB_COLUMNS
        ))
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(job_from_row).collect()
    }

    async fn try_start(&self, job_id: Uuid) -> Result<bool> {
        self.transition(
            "UPDATE enrichment_jobs SET status = 'processing', error = NULL, updated_at = ?
             WHERE id = ? AND status = 'pending'",
            None,
            job_id,
        )
        .await
    }

    async fn complete(&self, job_id: Uuid, output: &EnrichmentResult) -> Result<bool> {
        let now = Utc::now();
        let result = sqlx::query(
            "UPDATE enrichment_jobs
             SET status = 'awaiting_review', output = ?, completed_at = ?, updated_at = ?
             WHERE id = ? AND status = 'processing'",
        )
        .bind(serde_json::to_string(output)?)
        .bind(now)
        .bind(now)
        .bind(job_id.to_string())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn fail(&self, job_id: Uuid, message: &str) -> Result<bool> {
        self.transition(
            "UPDATE enrichment_jobs SET status = 'failed', updated_at = ?, error = ?
             WHERE id = ? AND status = 'processing'",
            Some(serde_json::to_string(&JobError::new(message))?),
            job_id,
        )
        .await
    }

    async fn reject(&self, job_id: Uuid, reason: &str) -> Result<bool> {
        self.transition(
            &format!(
                "UPDATE enrichment_jobs SET status = 'rejected', updated_at = ?, error = ?
                 WHERE id = ? AND status IN {}",
                REVIEWABLE
            ),
            Some(serde_json::to_string(&JobError::new(reason))?),
            job_id,
        )
        .await
    }

    async fn rerun(&self, job_id: Uuid) -> Result<bool> {
        let sql = format!(
            "UPDATE enrichment_jobs
             SET status = 'pending', updated_at = ?, error = NULL, output = NULL,
                 completed_at = NULL, approved_at = NULL, approved_by = NULL
             WHERE id = ? AND status IN {}",
            RERUNNABLE
        );
        let result = sqlx::query(&sql)
            .bind(Utc::now())
            .bind(job_id.to_string())
            .execute(&self.pool)
            .await;
        match result {
            Ok(done) => Ok(done.rows_affected() == 1),
            Err(e) if is_unique_violation(&e) => {
                let job = self.get_job(job_id).await?.ok_or(EnrichError::JobNotFound(job_id))?;
                let existing = self
                    .pending_job_for(&job.entity_id, job.job_type)
                    .await?
                    .ok_or_else(|| EnrichError::StoreWrite(e.to_string()))?;
                Err(EnrichError::AlreadyPending {
                    entity_id: job.entity_id,
                    job_type: job.job_type,
                    existing: existing.id,
                })
            }
            Err(e) => Err(e.into()),
        }
    }
}
