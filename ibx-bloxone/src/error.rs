//! Error types for ibx-bloxone

use ibx_common::ApiFailure;
use thiserror::Error;

/// BloxOne API call failures
#[derive(Debug, Error)]
pub enum B1Error {
    /// DNS, connection or TLS failure before any HTTP status arrived
    #[error("Error trying to {action}: {source}")]
    Transport {
        action: String,
        #[source]
        source: reqwest::Error,
    },

    /// The API answered with a non-success status
    #[error("Cannot {action}: {failure}")]
    Api { action: String, failure: ApiFailure },

    /// The API answered successfully but the body was not what we expected
    #[error("Unexpected response while trying to {action}: {message}")]
    InvalidResponse { action: String, message: String },

    /// Invalid user input or command-line parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl B1Error {
    pub(crate) fn transport(action: &str, source: reqwest::Error) -> Self {
        B1Error::Transport {
            action: action.to_string(),
            source,
        }
    }

    pub(crate) fn invalid(action: &str, message: impl ToString) -> Self {
        B1Error::InvalidResponse {
            action: action.to_string(),
            message: message.to_string(),
        }
    }

    pub(crate) async fn rejected(action: &str, response: reqwest::Response) -> Self {
        B1Error::Api {
            action: action.to_string(),
            failure: ApiFailure::from_response(response).await,
        }
    }

    /// HTTP status of a rejected call
    pub fn status(&self) -> Option<u16> {
        match self {
            B1Error::Api { failure, .. } => Some(failure.status),
            _ => None,
        }
    }
}
