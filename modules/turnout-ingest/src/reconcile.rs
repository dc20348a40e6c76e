use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use turnout_common::{CanonicalEventRecord, Clock};
use turnout_store::{EventStore, StoreError};

/// What reconciliation did with one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Inserted { uuid: Uuid },
    /// `changed` is false when the store found the content hash unchanged.
    Updated { uuid: Uuid, changed: bool },
}

/// Insert-or-update against the event store, keyed by upstream `event_id`.
///
/// The lookup and the write are separate store calls with no lock between
/// them; concurrent runs for the same event resolve last-write-wins.
pub struct ReconciliationEngine {
    store: Arc<dyn EventStore>,
    clock: Arc<dyn Clock>,
}

impl ReconciliationEngine {
    pub fn new(store: Arc<dyn EventStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub async fn reconcile(&self, mut record: CanonicalEventRecord) -> Result<Outcome, StoreError> {
        if self.store.exists_by_event_id(&record.event_id).await? {
            if let Some(existing) = self.store.read_by_event_id(&record.event_id).await? {
                record.uuid = Some(existing.uuid);
                info!(
                    event_id = record.event_id.as_str(),
                    uuid = %existing.uuid,
                    name = record.name.as_str(),
                    "Updating record for '{}'.",
                    record.name
                );
                let changed = self.store.update_with_hash(&record).await?;
                return Ok(Outcome::Updated {
                    uuid: existing.uuid,
                    changed,
                });
            }
        }

        info!(
            event_id = record.event_id.as_str(),
            name = record.name.as_str(),
            "Inserting record for '{}'.",
            record.name
        );
        record.timestamp_creation = Some(self.clock.now());
        let stored = self.store.create(&record).await?;
        Ok(Outcome::Inserted { uuid: stored.uuid })
    }
}
