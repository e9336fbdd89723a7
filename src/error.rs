use chrono::{DateTime, Utc};
use thiserror::Error;

/// A malformed request, filter, proxy or lookup code.
///
/// Always raised before any network activity.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("invalid {field}: {reason}")]
pub struct ValidationError {
    pub field: &'static str,
    pub reason: String,
}

impl ValidationError {
    pub fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

/// Failure fetching or decoding a single feed page.
#[derive(Error, Debug)]
pub enum PageError {
    #[error("request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("error response {status}{hint}")]
    Status {
        status: reqwest::StatusCode,
        hint: &'static str,
    },

    #[error("failed to read response body: {0}")]
    Body(#[source] reqwest::Error),

    #[error("failed to decode feed page: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum FeedError {
    #[error("invalid input: {0}")]
    Validation(#[from] ValidationError),

    #[error("failed to build feed url: {0}")]
    Url(#[from] url::ParseError),

    #[error("failed to build http client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("page before {cursor} failed: {source}")]
    Page {
        cursor: DateTime<Utc>,
        #[source]
        source: PageError,
    },

    #[error("feed returned no listings before {cursor}")]
    Exhausted { cursor: DateTime<Utc> },

    #[error("feed returned no new listings before {cursor}")]
    Stalled { cursor: DateTime<Utc> },

    #[error("fetch cancelled")]
    Cancelled,
}

pub type FeedResult<T> = Result<T, FeedError>;
