//! WAPI `fileop` calls used by the CSV import workflow
//!
//! Uploads and downloads go through short-lived tokens handed out by the
//! grid. The token-carrying types here are neither `Clone` nor `Copy`:
//! each step takes the previous step's value by move.

use crate::error::WapiError;
use crate::wapi::{expect_success, WapiSession};
use reqwest::header::CONTENT_TYPE;
use reqwest::multipart::{Form, Part};
use reqwest::{Body, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::io::Write;
use std::path::PathBuf;
use tempfile::NamedTempFile;
use tokio_util::io::ReaderStream;
use tracing::{debug, info};

/// A pending upload slot returned by `uploadinit`
#[derive(Debug)]
pub struct UploadHandle {
    url: String,
    token: String,
}

impl UploadHandle {
    /// Where the file body must be sent
    pub fn url(&self) -> &str {
        &self.url
    }
}

/// A file that reached the grid and can be handed to exactly one import task
#[derive(Debug)]
pub struct UploadedFile {
    token: String,
    filename: String,
}

impl UploadedFile {
    pub fn filename(&self) -> &str {
        &self.filename
    }
}

/// A submitted CSV import task
#[derive(Debug)]
pub struct ImportJob {
    task_ref: String,
    import_id: u64,
}

impl ImportJob {
    pub(crate) fn new(task_ref: String, import_id: u64) -> Self {
        Self { task_ref, import_id }
    }

    /// WAPI reference of the `csvimporttask` object
    pub fn task_ref(&self) -> &str {
        &self.task_ref
    }

    pub fn import_id(&self) -> u64 {
        self.import_id
    }
}

/// How the grid should treat the rows of an import
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportPolicy {
    /// `CONTINUE` keeps going past bad rows, `STOP` aborts on the first one
    pub on_error: &'static str,
    pub operation: &'static str,
    /// `OVERRIDE` replaces matching objects rather than merging into them
    pub update_method: &'static str,
}

impl Default for ImportPolicy {
    fn default() -> Self {
        Self {
            on_error: "CONTINUE",
            operation: "INSERT",
            update_method: "OVERRIDE",
        }
    }
}

#[derive(Debug, Deserialize)]
struct TransferSlot {
    url: String,
    token: String,
}

#[derive(Debug, Deserialize)]
struct CsvImportReply {
    csv_import_task: CsvImportTaskRef,
}

#[derive(Debug, Deserialize)]
struct CsvImportTaskRef {
    #[serde(rename = "_ref")]
    reference: String,
    import_id: u64,
}

/// Ask the grid for an upload slot for `filename`.
///
/// `filename` must already be sanitized.
pub async fn init_upload(session: &WapiSession, filename: &str) -> Result<UploadHandle, WapiError> {
    let action = format!("initiate upload of CSV file {}", filename);
    debug!(filename, "Initiating upload");

    let response = session
        .post("fileop")
        .query(&[("_function", "uploadinit"), ("filename", filename)])
        .send()
        .await
        .map_err(|e| WapiError::transport(&action, e))?;
    let slot: TransferSlot = expect_success(response, &action)
        .await?
        .json()
        .await
        .map_err(|e| WapiError::invalid(&action, e))?;

    Ok(UploadHandle {
        url: slot.url,
        token: slot.token,
    })
}

/// Stream `csv` to the upload slot as multipart part `filedata`.
///
/// The handle is consumed; the returned token is the only way to refer to
/// the uploaded bytes afterwards. The upload response is not JSON and is
/// ignored beyond its status.
pub async fn upload_file(
    session: &WapiSession,
    handle: UploadHandle,
    csv: tokio::fs::File,
    filename: &str,
) -> Result<UploadedFile, WapiError> {
    let action = format!("upload CSV file {}", filename);

    let length = csv
        .metadata()
        .await
        .map_err(|e| WapiError::io(format!("Error reading CSV file {}", filename), e))?
        .len();
    debug!(filename, bytes = length, "Uploading CSV file");

    let body = Body::wrap_stream(ReaderStream::new(csv));
    let form = Form::new().part(
        "filedata",
        Part::stream_with_length(body, length).file_name(filename.to_string()),
    );

    let response = session
        .post(&handle.url)
        .query(&[("name", filename)])
        .multipart(form)
        .send()
        .await
        .map_err(|e| WapiError::transport(&action, e))?;
    expect_success(response, &action).await?;

    Ok(UploadedFile {
        token: handle.token,
        filename: filename.to_string(),
    })
}

/// Start a CSV import task over an uploaded file
pub async fn submit_import(
    session: &WapiSession,
    uploaded: UploadedFile,
    policy: &ImportPolicy,
) -> Result<ImportJob, WapiError> {
    let action = format!("import CSV file {}", uploaded.filename);

    let response = session
        .post("fileop")
        .query(&[
            ("_function", "csv_import"),
            ("token", uploaded.token.as_str()),
            ("doimport", "true"),
            ("on_error", policy.on_error),
            ("operation", policy.operation),
            ("update_method", policy.update_method),
        ])
        .send()
        .await
        .map_err(|e| WapiError::transport(&action, e))?;
    let reply: CsvImportReply = expect_success(response, &action)
        .await?
        .json()
        .await
        .map_err(|e| WapiError::invalid(&action, e))?;

    info!(
        task = %reply.csv_import_task.reference,
        import_id = reply.csv_import_task.import_id,
        "CSV import task started"
    );

    Ok(ImportJob::new(
        reply.csv_import_task.reference,
        reply.csv_import_task.import_id,
    ))
}

/// Download the per-line error log of a finished import.
///
/// Returns `None` when the grid produced no log (404). Otherwise the log
/// is written to a new uniquely named `.csv` file in the system temp
/// directory and kept once the grid has acknowledged `downloadcomplete`.
/// If that acknowledgement fails no file is left behind.
pub async fn fetch_error_log(session: &WapiSession, job: ImportJob) -> Result<Option<PathBuf>, WapiError> {
    let import_id = job.import_id;

    let action = format!("request error log for CSV import {}", import_id);
    let response = session
        .post("fileop")
        .query(&[("_function", "csv_error_log")])
        .json(&json!({ "import_id": import_id }))
        .send()
        .await
        .map_err(|e| WapiError::transport(&action, e))?;
    if response.status() == StatusCode::NOT_FOUND {
        info!(import_id, "No error log produced");
        return Ok(None);
    }
    let slot: TransferSlot = expect_success(response, &action)
        .await?
        .json()
        .await
        .map_err(|e| WapiError::invalid(&action, e))?;

    let action = format!("download error log for CSV import {}", import_id);
    let response = session
        .get(&slot.url)
        .header(CONTENT_TYPE, "application/force-download")
        .send()
        .await
        .map_err(|e| WapiError::transport(&action, e))?;
    let content = expect_success(response, &action)
        .await?
        .bytes()
        .await
        .map_err(|e| WapiError::transport(&action, e))?;

    // Removed on drop unless the download is acknowledged
    let log = write_error_log(&content)?;

    let action = format!("complete error log download for CSV import {}", import_id);
    let response = session
        .post("fileop")
        .query(&[("_function", "downloadcomplete")])
        .json(&json!({ "token": slot.token }))
        .send()
        .await
        .map_err(|e| WapiError::transport(&action, e))?;
    expect_success(response, &action).await?;

    let (_, path) = log
        .keep()
        .map_err(|e| WapiError::io(SAVE_CONTEXT, e.error))?;
    debug!(path = %path.display(), bytes = content.len(), "Saved error log");
    Ok(Some(path))
}

const SAVE_CONTEXT: &str = "Error saving CSV error log";

fn write_error_log(content: &[u8]) -> Result<NamedTempFile, WapiError> {
    let mut file = tempfile::Builder::new()
        .prefix("csv-import-errors-")
        .suffix(".csv")
        .tempfile()
        .map_err(|e| WapiError::io(SAVE_CONTEXT, e))?;
    file.write_all(content)
        .map_err(|e| WapiError::io(SAVE_CONTEXT, e))?;
    file.flush().map_err(|e| WapiError::io(SAVE_CONTEXT, e))?;
    Ok(file)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy_continues_and_overrides() {
        let policy = ImportPolicy::default();
        assert_eq!(policy.on_error, "CONTINUE");
        assert_eq!(policy.operation, "INSERT");
        assert_eq!(policy.update_method, "OVERRIDE");
    }

    #[test]
    fn test_csv_import_reply_parsing() {
        let body = r#"{"csv_import_task": {
            "_ref": "csvimporttask/b25lLmNzdl9pbXBvcnRfdGFzayQ3:7",
            "import_id": 7,
            "status": "PENDING",
            "lines_processed": 0
        }}"#;
        let reply: CsvImportReply = serde_json::from_str(body).unwrap();
        assert_eq!(reply.csv_import_task.import_id, 7);
        assert!(reply.csv_import_task.reference.starts_with("csvimporttask/"));
    }

    #[test]
    fn test_error_log_files_are_unique() {
        let first = write_error_log(b"line 1 failed\n").unwrap();
        let second = write_error_log(b"line 2 failed\n").unwrap();

        assert_ne!(first.path(), second.path());
        assert_eq!(std::fs::read(first.path()).unwrap(), b"line 1 failed\n");
        assert!(first.path().extension().is_some_and(|ext| ext == "csv"));
    }

    #[test]
    fn test_unacknowledged_error_log_is_removed() {
        let log = write_error_log(b"line 1 failed\n").unwrap();
        let path = log.path().to_path_buf();
        assert!(path.exists());

        drop(log);
        assert!(!path.exists());
    }
}
