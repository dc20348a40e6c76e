//! EventStore — canonical events keyed by upstream `event_id`, backed by Postgres.
//!
//! Lookup-then-write is not transactional. Two concurrent ingest runs for the
//! same `event_id` race and the last write wins; the unique index on
//! `event_id` turns a double insert into a database error for the loser.

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use turnout_common::CanonicalEventRecord;

use crate::error::{Result, StoreError};
use crate::types::StoredEvent;

#[async_trait]
pub trait EventStore: Send + Sync {
    async fn exists_by_event_id(&self, event_id: &str) -> Result<bool>;

    async fn read_by_event_id(&self, event_id: &str) -> Result<Option<StoredEvent>>;

    /// Persist a new event. The store assigns the `uuid`.
    async fn create(&self, record: &CanonicalEventRecord) -> Result<StoredEvent>;

    /// Overwrite the event identified by `record.uuid` if its content hash
    /// differs from what is stored. Returns whether a write happened.
    async fn update_with_hash(&self, record: &CanonicalEventRecord) -> Result<bool>;
}

// ---------------------------------------------------------------------------
// PgEventStore
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct PgEventStore {
    pool: PgPool,
}

impl PgEventStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPool::connect(database_url).await?;
        Ok(Self::new(pool))
    }

    /// Create the `events` table if it does not exist yet.
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS events (
                uuid               UUID         PRIMARY KEY,
                event_id           TEXT         NOT NULL UNIQUE,
                name               TEXT         NOT NULL,
                content_hash       TEXT         NOT NULL,
                payload            JSONB        NOT NULL,
                timestamp_creation TIMESTAMPTZ  NOT NULL,
                updated_at         TIMESTAMPTZ  NOT NULL DEFAULT now()
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    #[cfg(feature = "test-utils")]
    pub async fn truncate(&self) -> Result<()> {
        sqlx::query("TRUNCATE events").execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl EventStore for PgEventStore {
    async fn exists_by_event_id(&self, event_id: &str) -> Result<bool> {
        let row = sqlx::query_as::<_, (bool,)>(
            "SELECT EXISTS(SELECT 1 FROM events WHERE event_id = $1)",
        )
        .bind(event_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.0)
    }

    async fn read_by_event_id(&self, event_id: &str) -> Result<Option<StoredEvent>> {
        let row = sqlx::query_as::<_, StoredEvent>(
            r#"
            SELECT uuid, event_id, content_hash, payload, timestamp_creation, updated_at
            FROM events
            WHERE event_id = $1
            "#,
        )
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn create(&self, record: &CanonicalEventRecord) -> Result<StoredEvent> {
        let uuid = Uuid::new_v4();
        let mut record = record.clone();
        record.uuid = None;
        let timestamp_creation = record.timestamp_creation.take();
        let payload = serde_json::to_value(&record)?;

        let stored = sqlx::query_as::<_, StoredEvent>(
            r#"
            INSERT INTO events (uuid, event_id, name, content_hash, payload, timestamp_creation)
            VALUES ($1, $2, $3, $4, $5, COALESCE($6, now()))
            RETURNING uuid, event_id, content_hash, payload, timestamp_creation, updated_at
            "#,
        )
        .bind(uuid)
        .bind(&record.event_id)
        .bind(&record.name)
        .bind(record.content_hash())
        .bind(&payload)
        .bind(timestamp_creation)
        .fetch_one(&self.pool)
        .await?;

        debug!(%uuid, event_id = record.event_id.as_str(), "Created event row");
        Ok(stored)
    }

    async fn update_with_hash(&self, record: &CanonicalEventRecord) -> Result<bool> {
        let uuid = record
            .uuid
            .ok_or_else(|| StoreError::MissingIdentity(record.event_id.clone()))?;
        let hash = record.content_hash();

        let current = sqlx::query_as::<_, (String,)>("SELECT content_hash FROM events WHERE uuid = $1")
            .bind(uuid)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound(uuid))?;

        if current.0 == hash {
            debug!(%uuid, "Content hash unchanged, skipping update");
            return Ok(false);
        }

        let mut content = record.clone();
        content.uuid = None;
        content.timestamp_creation = None;
        let payload = serde_json::to_value(&content)?;

        sqlx::query(
            r#"
            UPDATE events
            SET event_id = $2, name = $3, content_hash = $4, payload = $5, updated_at = now()
            WHERE uuid = $1
            "#,
        )
        .bind(uuid)
        .bind(&record.event_id)
        .bind(&record.name)
        .bind(&hash)
        .bind(&payload)
        .execute(&self.pool)
        .await?;

        Ok(true)
    }
}

// ---------------------------------------------------------------------------
// sqlx::FromRow for StoredEvent
// ---------------------------------------------------------------------------

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for StoredEvent {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> std::result::Result<Self, sqlx::Error> {
        use sqlx::Row;

        let uuid: Uuid = row.try_get("uuid")?;
        let timestamp_creation = row.try_get("timestamp_creation")?;
        let payload: serde_json::Value = row.try_get("payload")?;

        let mut record: CanonicalEventRecord =
            serde_json::from_value(payload).map_err(|e| sqlx::Error::ColumnDecode {
                index: "payload".to_string(),
                source: Box::new(e),
            })?;
        record.uuid = Some(uuid);
        record.timestamp_creation = Some(timestamp_creation);

        Ok(StoredEvent {
            uuid,
            event_id: row.try_get("event_id")?,
            content_hash: row.try_get("content_hash")?,
            timestamp_creation,
            updated_at: row.try_get("updated_at")?,
            record,
        })
    }
}
