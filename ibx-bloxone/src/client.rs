//! BloxOne host_app API client

use crate::error::B1Error;
use crate::host::{HostUpdate, OnPremHost};
use ibx_common::BloxOneProfile;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Client, Response};
use serde::Deserialize;
use std::fmt;
use std::net::Ipv4Addr;
use std::time::Duration;
use tracing::{debug, warn};

const USER_AGENT: &str = concat!("ibx-bloxone/", env!("CARGO_PKG_VERSION"));

/// How the operator named the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostSelector {
    Name(String),
    Address(Ipv4Addr),
}

impl HostSelector {
    /// A dotted-quad IPv4 address selects by address, anything else by name
    pub fn parse(host: &str) -> Self {
        match host.trim().parse::<Ipv4Addr>() {
            Ok(addr) => HostSelector::Address(addr),
            Err(_) => HostSelector::Name(host.to_string()),
        }
    }

    /// `_filter` expression matching this host
    pub fn filter(&self) -> String {
        match self {
            HostSelector::Name(name) => format!("display_name==\"{}\"", name),
            HostSelector::Address(addr) => format!("ip_address==\"{}\"", addr),
        }
    }
}

impl fmt::Display for HostSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostSelector::Name(name) => f.write_str(name),
            HostSelector::Address(addr) => write!(f, "{}", addr),
        }
    }
}

#[derive(Debug, Deserialize)]
struct HostList {
    #[serde(default)]
    result: Vec<OnPremHost>,
}

/// Client for the on-prem host endpoints
pub struct B1Client {
    client: Client,
    base_url: String,
}

impl fmt::Debug for B1Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("B1Client")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl B1Client {
    /// Build a client authenticating with the profile's API key
    pub fn new(profile: &BloxOneProfile) -> Result<Self, B1Error> {
        let action = "set up BloxOne API client";

        let mut token = HeaderValue::from_str(&format!("Token {}", profile.api_key))
            .map_err(|_| B1Error::InvalidInput("api_key contains invalid characters".to_string()))?;
        token.set_sensitive(true);
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, token);

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(Duration::from_secs(30))
            .default_headers(headers)
            .build()
            .map_err(|e| B1Error::transport(action, e))?;

        Ok(Self {
            client,
            base_url: format!(
                "{}/api/host_app/{}",
                profile.url.trim_end_matches('/'),
                profile.api_version
            ),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Look up exactly one on-prem host.
    ///
    /// Returns `None`, with a warning, when nothing or more than one host
    /// matches.
    pub async fn find_host(&self, selector: &HostSelector) -> Result<Option<OnPremHost>, B1Error> {
        let action = format!("find on-prem host {}", selector);
        let filter = selector.filter();
        debug!(filter = %filter, "Looking up on-prem host");

        let response = self
            .client
            .get(format!("{}/on_prem_hosts", self.base_url))
            .query(&[("_filter", filter.as_str())])
            .send()
            .await
            .map_err(|e| B1Error::transport(&action, e))?;
        let body = expect_success(response, &action)
            .await?
            .text()
            .await
            .map_err(|e| B1Error::transport(&action, e))?;

        let hosts: HostList = serde_json::from_str(&body).map_err(|e| B1Error::invalid(&action, e))?;
        match hosts.result.len() {
            0 => {
                warn!("No on-prem hosts match {}", filter);
                Ok(None)
            }
            1 => Ok(hosts.result.into_iter().next()),
            n => {
                warn!("{} on-prem hosts match {}", n, filter);
                Ok(None)
            }
        }
    }

    /// Apply `update` to the host with `id`
    pub async fn update_host(&self, id: &str, update: &HostUpdate) -> Result<(), B1Error> {
        let action = format!("update on-prem host {}", id);
        let url = format!("{}/on_prem_hosts/{}", self.base_url, id_segment(id));
        debug!(url = %url, "Updating on-prem host");

        let response = self
            .client
            .put(url)
            .json(update)
            .send()
            .await
            .map_err(|e| B1Error::transport(&action, e))?;
        expect_success(response, &action).await?;
        Ok(())
    }
}

async fn expect_success(response: Response, action: &str) -> Result<Response, B1Error> {
    if response.status().is_success() {
        Ok(response)
    } else {
        Err(B1Error::rejected(action, response).await)
    }
}

/// Host ids may come back as full resource paths (`host_app/on_prem_host/42`);
/// the update URL takes only the last segment.
fn id_segment(id: &str) -> &str {
    id.rsplit('/').next().unwrap_or(id)
}
