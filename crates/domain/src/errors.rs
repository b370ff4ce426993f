//! Error types used throughout the application

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Terminal outcome of one logical HTTP request.
///
/// Transient conditions (429, 5xx, timeouts, refused connections) are retried
/// inside the resilient client and only surface here once the attempt budget
/// is spent.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum ApiError {
    /// Non-429 4xx response. Never retried.
    #[error("client error {status}: {message}")]
    Client { status: u16, message: String, body: serde_json::Value },

    /// 429 responses exhausted the attempt budget.
    #[error("rate limit exceeded after {attempts} attempts")]
    RateLimitExceeded { attempts: u32 },

    /// 5xx responses exhausted the attempt budget.
    #[error("server error {status} after {attempts} attempts: {body}")]
    Server { status: u16, attempts: u32, body: String },

    /// Timeouts or connection failures exhausted the attempt budget.
    #[error("connection failed after {attempts} attempts: {message}")]
    ConnectionExhausted { attempts: u32, message: String },

    /// A backoff sleep was interrupted by cancellation.
    #[error("request cancelled")]
    Cancelled,

    /// The request could not be built (bad URL, unserializable body).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A successful response carried a body that is not valid JSON.
    #[error("invalid response body: {0}")]
    Decode(String),
}

impl ApiError {
    /// HTTP status associated with the failure, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Client { status, .. } | Self::Server { status, .. } => Some(*status),
            Self::RateLimitExceeded { .. } => Some(429),
            _ => None,
        }
    }

    /// Whether the failure came from exhausting retries on a transient
    /// condition (as opposed to a request the remote side rejected).
    pub fn is_retry_exhaustion(&self) -> bool {
        matches!(
            self,
            Self::RateLimitExceeded { .. } | Self::Server { .. } | Self::ConnectionExhausted { .. }
        )
    }

    /// Short stable label for logs.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Client { .. } => "client",
            Self::RateLimitExceeded { .. } => "rate_limit",
            Self::Server { .. } => "server",
            Self::ConnectionExhausted { .. } => "connection",
            Self::Cancelled => "cancelled",
            Self::InvalidRequest(_) => "invalid_request",
            Self::Decode(_) => "decode",
        }
    }
}

/// Main error type for SheetSync
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum SheetSyncError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Target error: {0}")]
    Target(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl SheetSyncError {
    /// Short stable label for logs.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Api(err) => err.category(),
            Self::Config(_) => "config",
            Self::Target(_) => "target",
            Self::InvalidInput(_) => "invalid_input",
            Self::Internal(_) => "internal",
        }
    }
}

/// Result type alias for SheetSync operations
pub type Result<T> = std::result::Result<T, SheetSyncError>;
