//! Reporting of failed WAPI / BloxOne API calls
//!
//! Both APIs answer errors with either a JSON object carrying a `text`
//! member or a bare text body, depending on which layer rejected the call.

use std::fmt;

/// Best-effort error message from an API error body.
///
/// Returns the `text` member of a JSON object body, otherwise the raw body.
pub fn extract_error_text(body: &str) -> String {
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(serde_json::Value::Object(map)) => match map.get("text") {
            Some(serde_json::Value::String(text)) => text.clone(),
            _ => body.to_string(),
        },
        _ => body.to_string(),
    }
}

/// A non-success HTTP response, reduced to what an operator needs to see
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiFailure {
    pub status: u16,
    pub reason: String,
    pub text: String,
}

impl ApiFailure {
    /// Build from a status code and raw response body
    pub fn new(status: reqwest::StatusCode, body: &str) -> Self {
        Self {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
            text: extract_error_text(body),
        }
    }

    /// Consume a response and capture its status and error text
    pub async fn from_response(response: reqwest::Response) -> Self {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Self::new(status, &body)
    }
}

impl fmt::Display for ApiFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP error {} ({})", self.status, self.reason)?;
        if !self.text.is_empty() {
            write!(f, ": {}", self.text.trim_end())?;
        }
        Ok(())
    }
}
