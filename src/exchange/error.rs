//! Errors surfaced by the Bybit REST client.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExchangeError {
    /// The exchange answered with a non-zero `retCode`.
    #[error("Bybit API error: {message} (code: {code})")]
    Api { code: i64, message: String },

    /// Non-2xx HTTP status.
    #[error("HTTP {status} from {endpoint}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },

    /// Transport failure (DNS, TLS, timeout, ...).
    #[error("API request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Body was not the expected JSON shape.
    #[error("Failed to decode {endpoint} response: {source}")]
    Decode {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Bybit API credentials are not configured")]
    MissingCredentials,
}

pub type ExchangeResult<T> = Result<T, ExchangeError>;
