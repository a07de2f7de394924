use std::time::Duration;
use thiserror::Error;

/// External market-data / balance fetch failure. Treated as transient:
/// the evaluator degrades to "no signal" instead of surfacing it.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("api error {status}: {body}")]
    Api { status: u16, body: String },
}

/// Order placement failure. Fail-closed: no order is placed on ambiguous
/// state, and the caller is told the order was not placed.
#[derive(Debug, Error)]
pub enum OrderError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("order rejected: {0}")]
    Rejected(String),
}
