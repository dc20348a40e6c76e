use thiserror::Error;

#[derive(Error, Debug)]
pub enum TurnoutError {
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Per-record failures while normalizing an upstream event. These skip the
/// record, never the batch.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TranslationError {
    #[error("Event has no original_id")]
    MissingEventId,

    #[error("Unparsable start time: {0:?}")]
    InvalidStartTime(String),

    #[error("Unresolvable timezone: {0:?}")]
    UnknownTimezone(String),
}
