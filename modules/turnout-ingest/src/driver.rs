use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use tracing::{error, info, warn};

use bsd_client::{BsdError, RequestSigner};
use turnout_common::{Clock, RawEventRecord, TranslationError};
use turnout_store::StoreError;

use crate::reconcile::{Outcome, ReconciliationEngine};
use crate::traits::EventSource;
use crate::translator::translate;

/// Stats from an ingest run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IngestStats {
    pub fetched: usize,
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub previewed: usize,
    pub translation_failed: usize,
    pub store_failed: usize,
}

impl IngestStats {
    pub fn failed(&self) -> usize {
        self.translation_failed + self.store_failed
    }
}

impl fmt::Display for IngestStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "fetched={} inserted={} updated={} unchanged={} previewed={} translation_failed={} store_failed={}",
            self.fetched,
            self.inserted,
            self.updated,
            self.unchanged,
            self.previewed,
            self.translation_failed,
            self.store_failed,
        )
    }
}

/// Why a single record was skipped. Never aborts the batch.
#[derive(Debug, Error)]
enum RecordError {
    #[error(transparent)]
    Translation(#[from] TranslationError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// One ingest pass: sign, fetch once, then translate and reconcile each
/// event in order. Without an engine it only previews the translated records.
pub struct IngestionDriver {
    signer: RequestSigner,
    source: Arc<dyn EventSource>,
    clock: Arc<dyn Clock>,
    engine: Option<ReconciliationEngine>,
}

impl IngestionDriver {
    pub fn new(
        signer: RequestSigner,
        source: Arc<dyn EventSource>,
        clock: Arc<dyn Clock>,
        engine: ReconciliationEngine,
    ) -> Self {
        Self {
            signer,
            source,
            clock,
            engine: Some(engine),
        }
    }

    /// A driver that translates and logs but never writes.
    pub fn dry_run(signer: RequestSigner, source: Arc<dyn EventSource>, clock: Arc<dyn Clock>) -> Self {
        Self {
            signer,
            source,
            clock,
            engine: None,
        }
    }

    /// Fetch failures end the run. Per-record failures are logged, counted,
    /// and skipped.
    pub async fn run(&self) -> Result<IngestStats, BsdError> {
        let request = self.signer.sign_at(self.clock.now().timestamp());
        let events = self.source.fetch(&request).await?;

        let mut stats = IngestStats {
            fetched: events.len(),
            ..Default::default()
        };
        info!(count = stats.fetched, dry_run = self.engine.is_none(), "Processing events");

        for (index, raw) in events.iter().enumerate() {
            match self.process(raw, &mut stats).await {
                Ok(()) => {}
                Err(RecordError::Translation(e)) => {
                    stats.translation_failed += 1;
                    warn!(index, event_id = ?raw_event_id(raw), error = %e, "Skipping untranslatable event");
                }
                Err(RecordError::Store(e)) => {
                    stats.store_failed += 1;
                    error!(index, event_id = ?raw_event_id(raw), error = %e, "Failed to store event");
                }
            }
        }

        if stats.failed() > 0 {
            warn!(failed = stats.failed(), "Ingest run finished with skipped events");
        }
        Ok(stats)
    }

    async fn process(&self, raw: &RawEventRecord, stats: &mut IngestStats) -> Result<(), RecordError> {
        let record = translate(raw)?;

        let Some(engine) = &self.engine else {
            let json = serde_json::to_string(&record).unwrap_or_default();
            info!(event_id = record.event_id.as_str(), record = %json, "Dry run: translated event");
            stats.previewed += 1;
            return Ok(());
        };

        match engine.reconcile(record).await? {
            Outcome::Inserted { .. } => stats.inserted += 1,
            Outcome::Updated { changed: true, .. } => stats.updated += 1,
            Outcome::Updated { changed: false, .. } => stats.unchanged += 1,
        }
        Ok(())
    }
}

/// Best-effort upstream id for log lines about records that failed to translate.
fn raw_event_id(raw: &RawEventRecord) -> Option<String> {
    ["original_id", "event_id"]
        .iter()
        .find_map(|key| raw.get(*key))
        .map(|v| match v {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_display_is_one_line() {
        let stats = IngestStats {
            fetched: 3,
            inserted: 1,
            updated: 1,
            translation_failed: 1,
            ..Default::default()
        };
        let line = stats.to_string();
        assert!(!line.contains('\n'));
        assert!(line.starts_with("fetched=3 inserted=1 updated=1"));
        assert_eq!(stats.failed(), 1);
    }

    #[test]
    fn raw_event_id_prefers_original_id() {
        let raw = crate::testing::raw_event(serde_json::json!({"original_id": 7, "event_id": "x"}));
        assert_eq!(raw_event_id(&raw).as_deref(), Some("7"));
    }
}
