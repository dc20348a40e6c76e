use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use turnout_common::CanonicalEventRecord;

/// A canonical event as persisted, with the identity the store assigned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredEvent {
    pub uuid: Uuid,
    pub event_id: String,
    pub content_hash: String,
    pub timestamp_creation: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub record: CanonicalEventRecord,
}
