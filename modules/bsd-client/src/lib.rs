pub mod error;
pub mod signer;

pub use error::{BsdError, Result};
pub use signer::{BsdCredentials, RequestSigner, SignedRequest, SEARCH_EVENTS_PATH};

use std::time::Duration;

use reqwest::StatusCode;
use serde_json::{Map, Value};

/// One event object exactly as the API returned it.
pub type RawEvent = Map<String, Value>;

pub struct BsdClient {
    client: reqwest::Client,
}

impl BsdClient {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self { client })
    }

    /// Issue the signed GET and decode the JSON array of events. One shot:
    /// no paging, no retries.
    pub async fn search_events(&self, request: &SignedRequest) -> Result<Vec<RawEvent>> {
        tracing::info!(call_path = request.call_path(), "Fetching events from BSD");

        let resp = self.client.get(request.url()).send().await?;

        let status = resp.status();
        let body = if status.is_success() {
            resp.text().await?
        } else {
            resp.text().await.unwrap_or_default()
        };
        check_status(status, &body)?;

        let events = parse_events(&body)?;
        tracing::info!(count = events.len(), "Fetched BSD events");
        Ok(events)
    }
}

/// 401/403 are auth failures and are never retried. Any other non-2xx keeps
/// the body as the error message.
fn check_status(status: StatusCode, body: &str) -> Result<()> {
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(BsdError::Auth {
            status: status.as_u16(),
        });
    }
    if !status.is_success() {
        return Err(BsdError::Api {
            status: status.as_u16(),
            message: body.to_string(),
        });
    }
    Ok(())
}

/// Decode a response body into raw events. Anything other than an array of
/// objects is a parse error.
pub fn parse_events(body: &str) -> Result<Vec<RawEvent>> {
    let value: Value = serde_json::from_str(body)?;
    let Value::Array(items) = value else {
        return Err(BsdError::Parse("expected a JSON array of events".to_string()));
    };

    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| match item {
            Value::Object(map) => Ok(map),
            other => Err(BsdError::Parse(format!(
                "event {i} is not an object: {other}"
            ))),
        })
        .collect()
}
