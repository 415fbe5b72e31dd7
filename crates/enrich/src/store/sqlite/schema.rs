//! Embedded schema migrations.
//!
//! Each migration is a list of single statements applied in one transaction
//! and recorded in `schema_version`, so applying twice is a no-op.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::Result;

pub(crate) struct Migration {
    pub id: &'static str,
    pub statements: &'static [&'static str],
}

pub(crate) const MIGRATIONS: &[Migration] = &[
    Migration {
        id: "001_entities_and_values",
        statements: &[
            "CREATE TABLE entities (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                description TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            "CREATE TABLE attribute_values (
                entity_id TEXT NOT NULL REFERENCES entities(id),
                attribute_code TEXT NOT NULL,
                boolean_value INTEGER,
                int_value INTEGER,
                numeric_min INTEGER,
                numeric_max INTEGER,
                rating_value REAL,
                tags_value TEXT,
                text_value TEXT,
                schedule_value TEXT,
                source TEXT NOT NULL,
                last_verified_at TEXT NOT NULL,
                PRIMARY KEY (entity_id, attribute_code)
            )",
        ],
    },
    Migration {
        id: "002_enrichment_jobs",
        statements: &[
            "CREATE TABLE enrichment_jobs (
                id TEXT PRIMARY KEY,
                entity_id TEXT NOT NULL REFERENCES entities(id),
                job_type TEXT NOT NULL,
                status TEXT NOT NULL,
                input TEXT,
                output TEXT,
                error TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                completed_at TEXT,
                approved_at TEXT,
                approved_by TEXT
            )",
            "CREATE INDEX idx_jobs_status_created ON enrichment_jobs(status, created_at)",
            "CREATE UNIQUE INDEX idx_jobs_one_pending
                ON enrichment_jobs(entity_id, job_type)
                WHERE status = 'pending'",
        ],
    },
    Migration {
        id: "003_change_history",
        statements: &[
            "CREATE TABLE change_history (
                id TEXT PRIMARY KEY,
                entity_id TEXT NOT NULL REFERENCES entities(id),
                actor TEXT NOT NULL,
                action TEXT NOT NULL,
                before TEXT,
                after TEXT NOT NULL,
                created_at TEXT NOT NULL
            )",
            "CREATE INDEX idx_history_entity ON change_history(entity_id, created_at)",
            "CREATE TRIGGER change_history_no_update
                BEFORE UPDATE ON change_history
                BEGIN
                    SELECT RAISE(ABORT, 'change_history is append-only');
                END",
            "CREATE TRIGGER change_history_no_delete
                BEFORE DELETE ON change_history
                BEGIN
                    SELECT RAISE(ABORT, 'change_history is append-only');
                END",
        ],
    },
];

/// Apply all pending migrations.
pub async fn apply_migrations(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS schema_version (
            migration_id TEXT PRIMARY KEY,
            applied_at TEXT NOT NULL
        )",
    )
    .execute(pool)
    .await?;

    for migration in MIGRATIONS {
        let applied: Option<String> =
            sqlx::query_scalar("SELECT migration_id FROM schema_version WHERE migration_id = ?")
                .bind(migration.id)
                .fetch_optional(pool)
                .await?;
        if applied.is_some() {
            debug!(migration = migration.id, "Migration already applied");
            continue;
        }

        let mut tx = pool.begin().await?;
        for statement in migration.statements {
            sqlx::query(statement).execute(&mut *tx).await?;
        }
        sqlx::query("INSERT INTO schema_version (migration_id, applied_at) VALUES (?, ?)")
            .bind(migration.id)
            .bind(Utc::now().to_rfc3339())
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        info!(migration = migration.id, "Applied migration");
    }

    Ok(())
}
