//! WAPI session establishment
//!
//! The first call authenticates with HTTP Basic auth against the `grid`
//! object; the grid answers with an `ibapauth` session cookie that every
//! later call presents instead of the password.

use crate::error::WapiError;
use ibx_common::GridProfile;
use reqwest::header::COOKIE;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::Deserialize;
use std::fmt;
use std::time::Duration;
use tracing::{debug, info};

/// Name of the WAPI session cookie
pub const AUTH_COOKIE: &str = "ibapauth";

const USER_AGENT: &str = concat!("ibx-nios/", env!("CARGO_PKG_VERSION"));
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct GridObject {
    #[serde(rename = "_ref")]
    reference: String,
}

/// An authenticated WAPI session
///
/// Created once per run and only read afterwards.
pub struct WapiSession {
    client: Client,
    base_url: String,
    valid_cert: bool,
    auth_cookie: String,
    grid_ref: String,
}

impl fmt::Debug for WapiSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WapiSession")
            .field("base_url", &self.base_url)
            .field("valid_cert", &self.valid_cert)
            .field("grid_ref", &self.grid_ref)
            .finish()
    }
}

impl WapiSession {
    /// Authenticate to the grid and capture the session cookie.
    ///
    /// Not retried: any transport failure or non-success status is returned
    /// as-is.
    pub async fn authenticate(profile: &GridProfile) -> Result<Self, WapiError> {
        let base_url = normalize_base_url(&profile.url);
        let action = format!("connect to grid at \"{}\"", base_url);

        if !profile.valid_cert {
            debug!("TLS certificate verification disabled for {}", base_url);
        }

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(CONNECT_TIMEOUT)
            .danger_accept_invalid_certs(!profile.valid_cert)
            .build()
            .map_err(|e| WapiError::transport(&action, e))?;

        debug!(url = %base_url, userid = %profile.userid, "Authenticating to grid");
        let response = client
            .get(format!("{}grid", base_url))
            .basic_auth(&profile.userid, Some(&profile.password))
            .send()
            .await
            .map_err(|e| WapiError::transport(&action, e))?;
        let response = expect_success(response, &action).await?;

        let auth_cookie = response
            .cookies()
            .find(|cookie| cookie.name() == AUTH_COOKIE)
            .map(|cookie| cookie.value().to_string())
            .ok_or_else(|| WapiError::invalid(&action, "no ibapauth cookie in response"))?;

        let grids: Vec<GridObject> = response
            .json()
            .await
            .map_err(|e| WapiError::invalid(&action, e))?;
        let grid_ref = grids
            .into_iter()
            .next()
            .map(|grid| grid.reference)
            .ok_or_else(|| WapiError::invalid(&action, "no grid object returned"))?;

        info!(grid = %grid_ref, "Authenticated to grid");

        Ok(Self {
            client,
            base_url,
            valid_cert: profile.valid_cert,
            auth_cookie,
            grid_ref,
        })
    }

    /// WAPI base URL, always ending in `/`
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Reference of the grid object returned at login
    pub fn grid_ref(&self) -> &str {
        &self.grid_ref
    }

    pub fn valid_cert(&self) -> bool {
        self.valid_cert
    }

    /// Build a request carrying the session cookie.
    ///
    /// `target` is either a WAPI object path relative to the base URL
    /// (`fileop`, `record:a`, an object reference) or an absolute URL handed
    /// out by the grid for file transfers.
    pub(crate) fn request(&self, method: Method, target: &str) -> RequestBuilder {
        self.client
            .request(method, self.resolve(target))
            .header(COOKIE, format!("{}={}", AUTH_COOKIE, self.auth_cookie))
    }

    pub(crate) fn get(&self, target: &str) -> RequestBuilder {
        self.request(Method::GET, target)
    }

    pub(crate) fn post(&self, target: &str) -> RequestBuilder {
        self.request(Method::POST, target)
    }

    fn resolve(&self, target: &str) -> String {
        if target.starts_with("http://") || target.starts_with("https://") {
            target.to_string()
        } else {
            format!("{}{}", self.base_url, target.trim_start_matches('/'))
        }
    }
}

/// Pass a successful response through, turn anything else into
/// [`WapiError::Api`]
pub(crate) async fn expect_success(response: Response, action: &str) -> Result<Response, WapiError> {
    if response.status().is_success() {
        Ok(response)
    } else {
        Err(WapiError::rejected(action, response).await)
    }
}

fn normalize_base_url(url: &str) -> String {
    let trimmed = url.trim();
    if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{}/", trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_base_url() {
        assert_eq!(
            normalize_base_url("https://gm.example.com/wapi/v2.11"),
            "https://gm.example.com/wapi/v2.11/"
        );
        assert_eq!(
            normalize_base_url(" https://gm.example.com/wapi/v2.11/ "),
            "https://gm.example.com/wapi/v2.11/"
        );
    }
}
