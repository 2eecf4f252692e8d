//! Error types for the Icinga client

use std::fmt;

use crate::item::ItemKind;

/// Result type alias for client and normalization operations
pub type IcingaResult<T> = Result<T, IcingaError>;

/// Errors that can occur while talking to the Icinga API
#[derive(Debug)]
pub enum IcingaError {
    /// A raw API record lacks a required attribute or carries the wrong type
    MalformedRecord { kind: ItemKind, reason: String },

    /// An HTTP call failed (non-2xx status, timeout, transport or TLS error)
    ApiRequest {
        endpoint: String,
        status: Option<u16>,
        message: String,
    },

    /// The client could not be set up from the given configuration
    InvalidConfig(String),
}

impl IcingaError {
    pub fn malformed(kind: ItemKind, reason: impl ToString) -> Self {
        IcingaError::MalformedRecord {
            kind,
            reason: reason.to_string(),
        }
    }

    pub(crate) fn request(endpoint: &str, err: reqwest::Error) -> Self {
        IcingaError::ApiRequest {
            endpoint: endpoint.to_string(),
            status: err.status().map(|status| status.as_u16()),
            message: err.to_string(),
        }
    }

    /// HTTP status of a failed request, if the server answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            IcingaError::ApiRequest { status, .. } => *status,
            _ => None,
        }
    }
}

impl fmt::Display for IcingaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IcingaError::MalformedRecord { kind, reason } => {
                write!(f, "malformed {kind} record: {reason}")
            }
            IcingaError::ApiRequest {
                endpoint,
                status: Some(status),
                message,
            } => write!(f, "request to {endpoint} failed with status {status}: {message}"),
            IcingaError::ApiRequest {
                endpoint,
                status: None,
                message,
            } => write!(f, "request to {endpoint} failed: {message}"),
            IcingaError::InvalidConfig(msg) => write!(f, "invalid client configuration: {msg}"),
        }
    }
}

impl std::error::Error for IcingaError {}
