//! Error types for the weather gateway.
//!
//! The `Display` text of [`GatewayError`] is exactly what ends up in the
//! `{"error": ...}` envelope handed back to the client.

use serde_json::json;
use thiserror::Error;

use crate::gateway::Operation;

/// Something unexpected went wrong while serving an operation.
#[derive(Debug, Error)]
pub enum FetchFault {
    #[error(transparent)]
    Url(#[from] url::ParseError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Fetcher(String),
}

/// Coarse classification of a [`GatewayError`], used for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    Unavailable,
    Internal,
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Latitude must be between -90 and 90")]
    InvalidLatitude,

    #[error("Longitude must be between -180 and 180")]
    InvalidLongitude,

    #[error("Location name cannot be empty.")]
    EmptyLocationName,

    /// Upstream gave no usable response
    #[error("{}", .0.unavailable_message())]
    Unavailable(Operation),

    #[error("{}: {source}", .operation.fault_prefix())]
    Fault {
        operation: Operation,
        #[source]
        source: FetchFault,
    },
}

impl GatewayError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GatewayError::InvalidLatitude
            | GatewayError::InvalidLongitude
            | GatewayError::EmptyLocationName => ErrorKind::InvalidInput,
            GatewayError::Unavailable(_) => ErrorKind::Unavailable,
            GatewayError::Fault { .. } => ErrorKind::Internal,
        }
    }

    /// Render as the `{"error": "..."}` envelope, pretty-printed like payloads.
    pub fn to_envelope(&self) -> String {
        let envelope = json!({ "error": self.to_string() });
        serde_json::to_string_pretty(&envelope).unwrap_or_else(|_| envelope.to_string())
    }
}
