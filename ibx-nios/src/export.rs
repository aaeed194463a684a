//! DNS A record export
//!
//! Writes A records in the layout the NIOS CSV import accepts, so an
//! export can be edited and fed back through `ibx-csv-import`.

use crate::error::WapiError;
use crate::wapi::{expect_success, WapiSession};
use serde::Deserialize;
use std::io::Write;
use tracing::info;

/// Fields requested for each A record
pub const A_RECORD_FIELDS: [&str; 8] = [
    "comment", "disable", "dns_name", "ipv4addr", "name", "ttl", "view", "zone",
];

/// Header row of the `arecord` CSV import object
pub const A_RECORD_HEADER: [&str; 9] = [
    "header-arecord",
    "address*",
    "_new_address",
    "fqdn*",
    "_new_fqdn",
    "comment",
    "disabled",
    "ttl",
    "view",
];

/// Default `_max_results` magnitude
pub const DEFAULT_MAX_RESULTS: u32 = 20_000;

/// A `record:a` object as returned with [`A_RECORD_FIELDS`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ARecord {
    pub ipv4addr: String,
    pub name: String,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub disable: bool,
    #[serde(default)]
    pub dns_name: Option<String>,
    #[serde(default)]
    pub ttl: Option<u32>,
    #[serde(default)]
    pub view: Option<String>,
    #[serde(default)]
    pub zone: Option<String>,
}

/// Fetch every A record, up to `max_results`.
///
/// The limit is sent negated, which makes the grid fail the call rather
/// than silently truncate when more records exist.
pub async fn fetch_a_records(session: &WapiSession, max_results: u32) -> Result<Vec<ARecord>, WapiError> {
    let action = "get A records";
    let return_fields = A_RECORD_FIELDS.join(",");
    let limit = format!("-{}", max_results);

    let response = session
        .get("record:a")
        .query(&[
            ("_return_fields", return_fields.as_str()),
            ("_max_results", limit.as_str()),
        ])
        .send()
        .await
        .map_err(|e| WapiError::transport(action, e))?;
    let records: Vec<ARecord> = expect_success(response, action)
        .await?
        .json()
        .await
        .map_err(|e| WapiError::invalid(action, e))?;

    info!(count = records.len(), "Fetched A records");
    Ok(records)
}

/// Write `records` as an `arecord` CSV import file
pub fn write_a_records<W: Write>(writer: W, records: &[ARecord]) -> csv::Result<()> {
    let mut out = csv::Writer::from_writer(writer);
    out.write_record(A_RECORD_HEADER)?;

    for record in records {
        let ttl = record.ttl.map(|t| t.to_string()).unwrap_or_default();
        out.write_record([
            "arecord",
            record.ipv4addr.as_str(),
            "",
            record.name.as_str(),
            "",
            record.comment.as_deref().unwrap_or(""),
            if record.disable { "TRUE" } else { "FALSE" },
            ttl.as_str(),
            record.view.as_deref().unwrap_or(""),
        ])?;
    }

    out.flush()?;
    Ok(())
}
