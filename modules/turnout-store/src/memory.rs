// In-memory EventStore for tests. Same hash semantics as PgEventStore, plus
// call counters so tests can assert which operations reconciliation issued.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use turnout_common::CanonicalEventRecord;

use crate::error::{Result, StoreError};
use crate::store::EventStore;
use crate::types::StoredEvent;

#[derive(Default)]
pub struct MemoryEventStore {
    events: Mutex<HashMap<String, StoredEvent>>,
    creates: Mutex<u32>,
    updates: Mutex<u32>,
    fail_event_ids: Vec<String>,
}

impl MemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every write for `event_id` fail with a database error.
    pub fn failing_on(mut self, event_id: &str) -> Self {
        self.fail_event_ids.push(event_id.to_string());
        self
    }

    /// Seed a stored event directly, bypassing `create`.
    pub fn insert(&self, stored: StoredEvent) {
        self.events
            .lock()
            .unwrap()
            .insert(stored.event_id.clone(), stored);
    }

    pub fn get(&self, event_id: &str) -> Option<StoredEvent> {
        self.events.lock().unwrap().get(event_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.events.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn create_calls(&self) -> u32 {
        *self.creates.lock().unwrap()
    }

    pub fn update_calls(&self) -> u32 {
        *self.updates.lock().unwrap()
    }

    fn check_failure(&self, event_id: &str) -> Result<()> {
        if self.fail_event_ids.iter().any(|id| id == event_id) {
            return Err(StoreError::Database(format!(
                "MemoryEventStore: injected failure for {event_id}"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl EventStore for MemoryEventStore {
    async fn exists_by_event_id(&self, event_id: &str) -> Result<bool> {
        Ok(self.events.lock().unwrap().contains_key(event_id))
    }

    async fn read_by_event_id(&self, event_id: &str) -> Result<Option<StoredEvent>> {
        Ok(self.get(event_id))
    }

    async fn create(&self, record: &CanonicalEventRecord) -> Result<StoredEvent> {
        *self.creates.lock().unwrap() += 1;
        self.check_failure(&record.event_id)?;

        let now = Utc::now();
        let uuid = Uuid::new_v4();
        let timestamp_creation = record.timestamp_creation.unwrap_or(now);

        let mut stored_record = record.clone();
        stored_record.uuid = Some(uuid);
        stored_record.timestamp_creation = Some(timestamp_creation);

        let stored = StoredEvent {
            uuid,
            event_id: record.event_id.clone(),
            content_hash: record.content_hash(),
            timestamp_creation,
            updated_at: now,
            record: stored_record,
        };
        self.insert(stored.clone());
        Ok(stored)
    }

    async fn update_with_hash(&self, record: &CanonicalEventRecord) -> Result<bool> {
        *self.updates.lock().unwrap() += 1;
        self.check_failure(&record.event_id)?;

        let uuid = record
            .uuid
            .ok_or_else(|| StoreError::MissingIdentity(record.event_id.clone()))?;
        let hash = record.content_hash();

        let mut events = self.events.lock().unwrap();
        let key = events
            .iter()
            .find(|(_, e)| e.uuid == uuid)
            .map(|(key, _)| key.clone())
            .ok_or(StoreError::NotFound(uuid))?;

        if events[&key].content_hash == hash {
            return Ok(false);
        }

        // Keyed by event_id, so a renamed event moves to its new key.
        let Some(mut stored) = events.remove(&key) else {
            return Err(StoreError::NotFound(uuid));
        };
        let mut updated = record.clone();
        updated.timestamp_creation = Some(stored.timestamp_creation);
        stored.event_id = record.event_id.clone();
        stored.record = updated;
        stored.content_hash = hash;
        stored.updated_at = Utc::now();
        events.insert(stored.event_id.clone(), stored);
        Ok(true)
    }
}
