//! Error types for ibx-nios

use ibx_common::ApiFailure;
use thiserror::Error;

/// WAPI call failures
///
/// Every variant names the action that was being attempted so the
/// message printed on exit tells the operator which step broke.
#[derive(Debug, Error)]
pub enum WapiError {
    /// DNS, connection or TLS failure before any HTTP status arrived
    #[error("Error trying to {action}: {source}")]
    Transport {
        action: String,
        #[source]
        source: reqwest::Error,
    },

    /// The grid answered with a non-success status
    #[error("Cannot {action}: {failure}")]
    Api { action: String, failure: ApiFailure },

    /// The grid answered successfully but not with what WAPI documents
    #[error("Unexpected response while trying to {action}: {message}")]
    InvalidResponse { action: String, message: String },

    /// Local file error
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// Invalid user input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl WapiError {
    pub(crate) fn transport(action: &str, source: reqwest::Error) -> Self {
        WapiError::Transport {
            action: action.to_string(),
            source,
        }
    }

    pub(crate) fn invalid(action: &str, message: impl ToString) -> Self {
        WapiError::InvalidResponse {
            action: action.to_string(),
            message: message.to_string(),
        }
    }

    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        WapiError::Io {
            context: context.into(),
            source,
        }
    }

    pub(crate) async fn rejected(action: &str, response: reqwest::Response) -> Self {
        WapiError::Api {
            action: action.to_string(),
            failure: ApiFailure::from_response(response).await,
        }
    }

    /// HTTP status of a rejected call, if the grid answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            WapiError::Api { failure, .. } => Some(failure.status),
            WapiError::Transport { source, .. } => source.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
