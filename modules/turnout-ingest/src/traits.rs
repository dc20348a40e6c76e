// Trait seam between the ingestion driver and the upstream API, so driver
// tests can run against MockEventSource with no network.

use async_trait::async_trait;

use bsd_client::{BsdClient, BsdError, SignedRequest};
use turnout_common::RawEventRecord;

#[async_trait]
pub trait EventSource: Send + Sync {
    /// Perform the single signed fetch and return the raw event list.
    async fn fetch(&self, request: &SignedRequest) -> Result<Vec<RawEventRecord>, BsdError>;
}

#[async_trait]
impl EventSource for BsdClient {
    async fn fetch(&self, request: &SignedRequest) -> Result<Vec<RawEventRecord>, BsdError> {
        self.search_events(request).await
    }
}
