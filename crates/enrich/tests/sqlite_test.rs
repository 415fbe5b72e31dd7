//! SQLite-specific guarantees: schema, triggers and legacy rows.

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tempfile::TempDir;

use enrich::audit::AuditLog;
use enrich::store::{AttributeSelection, EntityStore, JobStore};
use enrich::{
    AttributeRegistry, AttributeValue, CanonicalValue, Entity, JobFilter, JobStatus, JobType,
    ModerationController, SqliteStore, StorageRow, ValueCodec,
};

fn db_url(dir: &TempDir) -> String {
    format!("sqlite://{}", dir.path().join("enrich.db").display())
}

async fn seeded(url: &str) -> SqliteStore {
    let store = SqliteStore::connect(url).await.unwrap();
    store
        .insert_entity(&Entity::new("pub-1", "The Tap Room").with_description("Old text"))
        .await
        .unwrap();
    store
}

// ============================================================================
// Schema
// ============================================================================

#[tokio::test]
async fn test_reconnect_keeps_data_and_skips_migrations() {
    let dir = TempDir::new().unwrap();
    let url = db_url(&dir);

    let job_id = {
        let store = seeded(&url).await;
        store
            .set_attribute(&AttributeValue::approved(
                "pub-1",
                "wifi",
                CanonicalValue::Bool(true),
                Utc::now(),
            ))
            .await
            .unwrap();
        let job = store.enqueue("pub-1", JobType::Description, None).await.unwrap().job;
        store.pool().close().await;
        job.id
    };

    let store = SqliteStore::connect(&url).await.unwrap();
    let versions: Vec<String> =
        sqlx::query_scalar("SELECT migration_id FROM schema_version ORDER BY migration_id")
            .fetch_all(store.pool())
            .await
            .unwrap();
    assert_eq!(
        versions,
        vec!["001_entities_and_values", "002_enrichment_jobs", "003_change_history"]
    );

    let snapshot = store
        .load_entity("pub-1", AttributeSelection::All)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        snapshot.row("wifi").and_then(|r| r.decode()),
        Some(CanonicalValue::Bool(true))
    );
    assert_eq!(
        store.get_job(job_id).await.unwrap().unwrap().status,
        JobStatus::Pending
    );
}

#[tokio::test]
async fn test_values_require_existing_entity() {
    let store = SqliteStore::in_memory().await.unwrap();
    let result = store
        .set_attribute(&AttributeValue::approved(
            "ghost",
            "wifi",
            CanonicalValue::Bool(true),
            Utc::now(),
        ))
        .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_pending_uniqueness_holds_for_raw_inserts() {
    let store = seeded("sqlite::memory:").await;
    let job = store.enqueue("pub-1", JobType::Attributes, None).await.unwrap().job;

    let duplicate = sqlx::query(
        "INSERT INTO enrichment_jobs (id, entity_id, job_type, status, created_at, updated_at)
         VALUES ('dup', 'pub-1', 'attributes', 'pending', ?, ?)",
    )
    .bind(Utc::now())
    .bind(Utc::now())
    .execute(store.pool())
    .await;
    assert!(duplicate.is_err());

    let jobs = store.list_jobs(&JobFilter::default()).await.unwrap();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].id, job.id);
}

// ============================================================================
// Value round trips
// ============================================================================

#[tokio::test]
async fn test_representative_values_survive_storage() {
    let store = seeded("sqlite::memory:").await;
    let codec = ValueCodec::new(Arc::new(AttributeRegistry::builtin()));
    let cases = [
        ("wifi", json!(true)),
        ("wifi", json!(false)),
        ("floor_count", json!(0)),
        ("floor_count", json!(42)),
        ("floor_count", json!(-3)),
        ("cost_for_two_range", json!({"min": 100, "max": 2500})),
        ("food_quality_rating", json!(4.5)),
        ("music_genres", json!(["rock", "retro"])),
        ("stag_entry_policy", json!("Allowed with cover")),
        (
            "happy_hour_schedule",
            json!({"monday": [{"start": "18:00", "end": "20:00"}]}),
        ),
    ];

    for (code, raw) in cases {
        let value = codec.encode_attribute(code, &raw).unwrap();
        assert_eq!(value.to_json(), raw, "{code}");

        let row = StorageRow::from(&value);
        assert_eq!(row.populated_slots(), 1, "{code}");
        assert_eq!(row.decode().as_ref(), Some(&value), "{code}");

        store
            .set_attribute(&AttributeValue::approved("pub-1", code, value.clone(), Utc::now()))
            .await
            .unwrap();
        let snapshot = store
            .load_entity("pub-1", AttributeSelection::All)
            .await
            .unwrap()
            .unwrap();
        let stored = snapshot.row(code).and_then(|r| codec.decode(r));
        assert_eq!(stored.as_ref(), Some(&value), "{code}");
        assert_eq!(stored.map(|v| v.to_json()), Some(raw.clone()), "{code}");

        let listed = store.attribute_values("pub-1").await.unwrap();
        let listed = listed.iter().find(|v| v.attribute_code == code).unwrap();
        assert_eq!(listed.value, value, "{code}");
    }
}

// ============================================================================
// Append-only history
// ============================================================================

#[tokio::test]
async fn test_history_rejects_update_and_delete() {
    let store = seeded("sqlite::memory:").await;
    let entry = AuditLog::new(&store)
        .append("pub-1", "editor", "manual_note", None, json!({"note": "checked"}))
        .await
        .unwrap();

    let update = sqlx::query("UPDATE change_history SET actor = 'someone' WHERE id = ?")
        .bind(entry.id.to_string())
        .execute(store.pool())
        .await;
    let err = update.unwrap_err().to_string();
    assert!(err.contains("append-only"), "{err}");

    let delete = sqlx::query("DELETE FROM change_history")
        .execute(store.pool())
        .await;
    assert!(delete.is_err());

    let history = store.history("pub-1").await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].id, entry.id);
    assert_eq!(history[0].actor, "editor");
}

#[tokio::test]
async fn test_history_is_oldest_first() {
    let store = seeded("sqlite::memory:").await;
    let log = AuditLog::new(&store);
    for n in 0..3 {
        log.append("pub-1", "editor", "manual_note", None, json!({ "n": n }))
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }

    let notes: Vec<_> = log
        .entries("pub-1")
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.after["n"].clone())
        .collect();
    assert_eq!(notes, vec![json!(0), json!(1), json!(2)]);
}

// ============================================================================
// Legacy rows
// ============================================================================

#[tokio::test]
async fn test_legacy_completed_job_can_be_approved() {
    let store = Arc::new(seeded("sqlite::memory:").await);
    let job = store.enqueue("pub-1", JobType::Description, None).await.unwrap().job;
    sqlx::query(
        "UPDATE enrichment_jobs SET status = 'completed', output = ?, completed_at = ? WHERE id = ?",
    )
    .bind(json!({"summary": "New text", "highlights": ["a", "b", "c"]}).to_string())
    .bind(Utc::now())
    .bind(job.id.to_string())
    .execute(store.pool())
    .await
    .unwrap();

    let codec = ValueCodec::new(Arc::new(AttributeRegistry::builtin()));
    let controller = ModerationController::new(store.clone(), codec);

    let queue = controller
        .jobs(&JobFilter::status(JobStatus::AwaitingReview))
        .await
        .unwrap();
    assert_eq!(queue.len(), 1);

    let approval = controller.approve(job.id, "mod-1").await.unwrap();
    assert_eq!(approval.job.status, JobStatus::Approved);

    let raw: String = sqlx::query_scalar("SELECT status FROM enrichment_jobs WHERE id = ?")
        .bind(job.id.to_string())
        .fetch_one(store.pool())
        .await
        .unwrap();
    assert_eq!(raw, "approved");

    let entry = &controller.history("pub-1").await.unwrap()[0];
    assert_eq!(
        entry.after,
        json!({"description": "New text", "highlights": ["a", "b", "c"]})
    );
}
