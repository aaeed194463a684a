//! CSV import workflow
//!
//! Drives one import from local file to finished task:
//! upload slot → file upload → import task → progress polling →
//! error log (only when lines failed).

use crate::error::WapiError;
use crate::fileop::{fetch_error_log, init_upload, submit_import, upload_file, ImportPolicy};
use crate::poller::{poll_import, ImportTaskStatus, PollConfig, PollOutcome};
use crate::wapi::WapiSession;
use ibx_common::sanitized_filename;
use std::path::PathBuf;
use tracing::info;

/// Everything one import run needs besides the session
#[derive(Debug, Clone)]
pub struct ImportOptions {
    pub csv_path: PathBuf,
    pub poll: PollConfig,
    pub policy: ImportPolicy,
}

impl ImportOptions {
    /// Options with the default 30 s / 30 min polling and continue-on-error policy
    pub fn new(csv_path: impl Into<PathBuf>) -> Self {
        Self {
            csv_path: csv_path.into(),
            poll: PollConfig::default(),
            policy: ImportPolicy::default(),
        }
    }
}

/// What an import run observed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportReport {
    pub outcome: PollOutcome,
    /// Local copy of the grid's error log, when lines failed and the grid
    /// produced one
    pub error_log: Option<PathBuf>,
}

impl ImportReport {
    /// One-line human-readable result
    pub fn summary(&self) -> String {
        match self.outcome {
            PollOutcome::Completed(counts) => format!(
                "Imported {} lines ({} failed)",
                counts.lines_processed, counts.lines_failed
            ),
            PollOutcome::TimedOut { counts, waited } => format!(
                "Import still running after {} seconds, processed: {}, failed: {}",
                waited.as_secs(),
                counts.lines_processed,
                counts.lines_failed
            ),
        }
    }
}

/// Import `options.csv_path` into the grid behind `session`.
///
/// Runs exactly one import task. The error log is fetched only when the
/// task finished with failed lines; a task still running at timeout is
/// left to the grid.
pub async fn run_import<F>(
    session: &WapiSession,
    options: &ImportOptions,
    on_progress: F,
) -> Result<ImportReport, WapiError>
where
    F: FnMut(&ImportTaskStatus),
{
    let csv_path = &options.csv_path;
    let csv = tokio::fs::File::open(csv_path)
        .await
        .map_err(|e| WapiError::io(format!("Error opening CSV file {}", csv_path.display()), e))?;

    let filename = sanitized_filename(csv_path);
    if filename.is_empty() {
        return Err(WapiError::InvalidInput(format!(
            "CSV file name {} has no usable characters",
            csv_path.display()
        )));
    }
    info!(path = %csv_path.display(), filename = %filename, "Importing CSV file");

    let handle = init_upload(session, &filename).await?;
    let uploaded = upload_file(session, handle, csv, &filename).await?;
    let job = submit_import(session, uploaded, &options.policy).await?;

    let outcome = poll_import(session, &job, &options.poll, on_progress).await?;

    let error_log = match outcome {
        PollOutcome::Completed(counts) if counts.lines_failed > 0 => {
            fetch_error_log(session, job).await?
        }
        _ => None,
    };

    Ok(ImportReport { outcome, error_log })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::poller::ImportCounts;
    use std::time::Duration;

    #[test]
    fn test_summary_for_completed_import() {
        let report = ImportReport {
            outcome: PollOutcome::Completed(ImportCounts {
                lines_processed: 100,
                lines_failed: 0,
            }),
            error_log: None,
        };
        assert_eq!(report.summary(), "Imported 100 lines (0 failed)");
    }

    #[test]
    fn test_summary_for_timed_out_import() {
        let report = ImportReport {
            outcome: PollOutcome::TimedOut {
                counts: ImportCounts {
                    lines_processed: 4000,
                    lines_failed: 3,
                },
                waited: Duration::from_secs(1800),
            },
            error_log: None,
        };
        assert_eq!(
            report.summary(),
            "Import still running after 1800 seconds, processed: 4000, failed: 3"
        );
    }

    #[test]
    fn test_options_defaults() {
        let options = ImportOptions::new("/tmp/ranges.csv");
        assert_eq!(options.poll, PollConfig::default());
        assert_eq!(options.policy, ImportPolicy::default());
    }
}
