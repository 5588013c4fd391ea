//! Errors raised by the Azure DevOps client.
//!
//! A 404 is never an error here: operations report it as `None`, an empty
//! collection, or `false`.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    /// Team, project or access token is missing. Raised before any network call.
    #[error("The repository is not fully configured: missing {0}")]
    NotConfigured(&'static str),

    /// Any status other than 200, 201 or 404. `reason` is the raw response body.
    #[error("An unexpected status code was returned: {status}")]
    UnexpectedStatus { status: u16, reason: String },

    #[error("Azure DevOps request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Failed to parse {context}: {source}")]
    Decode {
        context: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to encode {context}: {source}")]
    Encode {
        context: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid timestamp '{value}': {source}")]
    InvalidTimestamp {
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("Invalid request URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("The client has already been closed")]
    Closed,

    #[error("The operation was cancelled")]
    Cancelled,

    /// A blocking call was made from inside an async runtime.
    #[error("Cannot block on a client operation from inside an async runtime")]
    NestedRuntime,

    #[error("Failed to start runtime: {0}")]
    Runtime(#[from] std::io::Error),
}

impl ClientError {
    /// Raw response body attached to an unexpected status, for operator diagnosis.
    pub fn reason(&self) -> Option<&str> {
        match self {
            ClientError::UnexpectedStatus { reason, .. } => Some(reason),
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ClientError::Cancelled)
    }
}

pub type Result<T, E = ClientError> = std::result::Result<T, E>;
