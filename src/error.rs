//! Error types for the Oekofen client library

use thiserror::Error;

/// Result type alias for library operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while decoding device data or talking to the controller
#[derive(Error, Debug)]
pub enum Error {
    /// A choice-table string could not be parsed
    #[error("malformed format '{format}': {reason}")]
    MalformedFormat { format: String, reason: String },

    /// An attribute's metadata could not be coerced
    #[error("malformed attribute '{key}': {reason}")]
    MalformedAttribute { key: String, reason: String },

    /// A write was rejected because it falls outside the writable range
    #[error("setting value {value}, min={min}, max={max}")]
    ValueOutOfBoundary { value: i64, min: f64, max: f64 },

    /// A numeric write has neither a choice table nor min/max to check against
    #[error("attribute '{key}' has no writable range")]
    NoWritableRange { key: String },

    /// The input type does not fit the attribute
    #[error("attribute '{key}' does not accept {input} ({expected} expected)")]
    IncompatibleInput {
        key: String,
        input: String,
        expected: &'static str,
    },

    /// Controller answered with a non-success status
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    /// Request could not be sent or the body could not be read
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body was not valid JSON
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Response had a shape the caller did not ask for
    #[error("unexpected payload: {0}")]
    UnexpectedPayload(String),
}

impl Error {
    pub fn malformed_attribute(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedAttribute {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// True for failures that belong to the network layer
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Status { .. } | Self::Http(_))
    }
}
