//! Conversions from external infrastructure errors into domain errors.

use reqwest::Error as HttpError;
use sheetsync_domain::{ApiError, SheetSyncError};

use crate::http::TransportError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub SheetSyncError);

impl From<InfraError> for SheetSyncError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<SheetSyncError> for InfraError {
    fn from(value: SheetSyncError) -> Self {
        Self(value)
    }
}

impl From<ApiError> for InfraError {
    fn from(value: ApiError) -> Self {
        Self(SheetSyncError::Api(value))
    }
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → TransportError */
/* -------------------------------------------------------------------------- */

impl From<HttpError> for TransportError {
    fn from(err: HttpError) -> Self {
        let message = err.to_string();
        if err.is_timeout() {
            Self::Timeout(message)
        } else if err.is_connect() {
            Self::Connect(message)
        } else if err.is_builder() {
            Self::InvalidRequest(message)
        } else {
            Self::Network(message)
        }
    }
}

/// Client construction failures are configuration problems.
impl From<HttpError> for InfraError {
    fn from(err: HttpError) -> Self {
        Self(SheetSyncError::Config(format!("http client: {err}")))
    }
}

/* -------------------------------------------------------------------------- */
/* url / serde_json / toml → SheetSyncError */
/* -------------------------------------------------------------------------- */

impl From<url::ParseError> for InfraError {
    fn from(err: url::ParseError) -> Self {
        Self(SheetSyncError::Config(format!("invalid base url: {err}")))
    }
}

impl From<serde_json::Error> for InfraError {
    fn from(err: serde_json::Error) -> Self {
        Self(SheetSyncError::Api(ApiError::Decode(err.to_string())))
    }
}

impl From<toml::de::Error> for InfraError {
    fn from(err: toml::de::Error) -> Self {
        Self(SheetSyncError::Config(format!("Invalid TOML format: {err}")))
    }
}
