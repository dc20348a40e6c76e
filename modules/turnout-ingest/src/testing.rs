// Test doubles for the ingest pipeline.
//
// MockEventSource stands in for the BSD API; pair it with
// turnout_store::MemoryEventStore and FixedClock for fully deterministic runs.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

use bsd_client::{BsdCredentials, BsdError, RequestSigner, SignedRequest, SEARCH_EVENTS_PATH};
use turnout_common::RawEventRecord;

use crate::traits::EventSource;

/// 2024-03-01T12:00:00Z.
pub fn test_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
}

pub fn test_signer() -> RequestSigner {
    RequestSigner::new(
        BsdCredentials::new("https://example.bsd.net", "turnout", "s3cret"),
        SEARCH_EVENTS_PATH,
    )
    .unwrap()
}

/// Convert a `json!({...})` fixture into a raw record.
pub fn raw_event(value: Value) -> RawEventRecord {
    match value {
        Value::Object(map) => map,
        other => panic!("raw_event fixture must be a JSON object, got {other}"),
    }
}

/// Returns a canned event list, or a canned error, and remembers the URLs it
/// was asked for.
pub struct MockEventSource {
    response: Mutex<Option<Result<Vec<RawEventRecord>, BsdError>>>,
    requested: Mutex<Vec<String>>,
}

impl MockEventSource {
    pub fn with_events(events: Vec<RawEventRecord>) -> Self {
        Self {
            response: Mutex::new(Some(Ok(events))),
            requested: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(err: BsdError) -> Self {
        Self {
            response: Mutex::new(Some(Err(err))),
            requested: Mutex::new(Vec::new()),
        }
    }

    pub fn requested_urls(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventSource for MockEventSource {
    async fn fetch(&self, request: &SignedRequest) -> Result<Vec<RawEventRecord>, BsdError> {
        self.requested.lock().unwrap().push(request.url());
        self.response
            .lock()
            .unwrap()
            .take()
            .unwrap_or_else(|| Err(BsdError::Network("MockEventSource: already fetched".into())))
    }
}
