use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An event object as the upstream API emitted it: untyped, possibly missing
/// keys, numbers and booleans often encoded as strings.
pub type RawEventRecord = serde_json::Map<String, serde_json::Value>;

/// Event start as the source reported it. Some feeds carry a UTC offset,
/// most only a local wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StartTime {
    Naive(NaiveDateTime),
    Aware(DateTime<FixedOffset>),
}

impl StartTime {
    /// Wall-clock time at the venue.
    pub fn local(&self) -> NaiveDateTime {
        match self {
            StartTime::Naive(dt) => *dt,
            StartTime::Aware(dt) => dt.naive_local(),
        }
    }

    /// Calendar date at the venue.
    pub fn date(&self) -> NaiveDate {
        self.local().date()
    }
}

/// Normalized event, ready for the store. Every field is always present;
/// strings fall back to `""` and counts to `0` when the source omits them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalEventRecord {
    // Identity
    pub event_id: String,
    pub event_id_obfuscated: String,
    pub url: String,

    // Scheduling
    pub name: String,
    pub date: String,
    pub event_date: String,
    pub start_time: Option<StartTime>,
    pub timezone: String,

    pub description: String,
    pub event_type_name: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub is_official: bool,
    pub attendee_count: u32,
    pub capacity: u32,

    // Source
    pub site: String,
    pub lang: String,

    // Venue
    pub venue_name: String,
    pub venue_address1: String,
    pub venue_address2: String,
    pub venue_address3: String,
    pub venue_city: String,
    pub venue_state: String,
    pub venue_zip: String,

    // Set during reconciliation, never by translation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp_creation: Option<DateTime<Utc>>,
}

impl CanonicalEventRecord {
    /// A record carrying only sentinels.
    pub fn empty() -> Self {
        Self {
            event_id: String::new(),
            event_id_obfuscated: String::new(),
            url: String::new(),
            name: String::new(),
            date: String::new(),
            event_date: String::new(),
            start_time: None,
            timezone: String::new(),
            description: String::new(),
            event_type_name: String::new(),
            latitude: None,
            longitude: None,
            is_official: false,
            attendee_count: 0,
            capacity: 0,
            site: String::new(),
            lang: String::new(),
            venue_name: String::new(),
            venue_address1: String::new(),
            venue_address2: String::new(),
            venue_address3: String::new(),
            venue_city: String::new(),
            venue_state: String::new(),
            venue_zip: String::new(),
            uuid: None,
            timestamp_creation: None,
        }
    }

    /// Hex SHA-256 over the event's content. Store identity and creation
    /// time are excluded, so a re-fetched unchanged event hashes the same.
    pub fn content_hash(&self) -> String {
        use sha2::{Digest, Sha256};

        let mut content = self.clone();
        content.uuid = None;
        content.timestamp_creation = None;

        let bytes = serde_json::to_vec(&content).unwrap_or_default();
        hex::encode(Sha256::digest(&bytes))
    }
}
