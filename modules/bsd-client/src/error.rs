use thiserror::Error;

pub type Result<T> = std::result::Result<T, BsdError>;

#[derive(Debug, Error)]
pub enum BsdError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),

    /// The API rejected the request signature or credentials. Never retried.
    #[error("Authentication rejected (status {status}): check BSD_API_ID / BSD_API_SECRET")]
    Auth { status: u16 },

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for BsdError {
    fn from(err: reqwest::Error) -> Self {
        BsdError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for BsdError {
    fn from(err: serde_json::Error) -> Self {
        BsdError::Parse(err.to_string())
    }
}
