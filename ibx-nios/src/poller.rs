//! CSV import progress polling
//!
//! The grid runs an import asynchronously. Progress is observed by
//! re-reading the `csvimporttask` object on a fixed cadence until it
//! carries an `end_time` or the time budget runs out.

use crate::error::WapiError;
use crate::fileop::ImportJob;
use crate::wapi::WapiSession;
use ibx_common::ApiFailure;
use serde::{Deserialize, Deserializer};
use std::fmt;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Polling cadence and time budget
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    /// Pause between status checks
    pub interval: Duration,
    /// Total time budget across all checks
    pub timeout: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            timeout: Duration::from_secs(1800),
        }
    }
}

/// Line counters of an import task
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportCounts {
    pub lines_processed: u64,
    pub lines_failed: u64,
}

/// One observation of a `csvimporttask` object
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ImportTaskStatus {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub lines_processed: u64,
    #[serde(default)]
    pub lines_failed: u64,
    /// Present, whatever its value, once the task is finished
    #[serde(default, deserialize_with = "present")]
    pub end_time: Option<serde_json::Value>,
}

impl ImportTaskStatus {
    pub fn is_finished(&self) -> bool {
        self.end_time.is_some()
    }

    pub fn counts(&self) -> ImportCounts {
        ImportCounts {
            lines_processed: self.lines_processed,
            lines_failed: self.lines_failed,
        }
    }
}

/// Maps a present key to `Some`, including an explicit `null`
fn present<'de, D>(deserializer: D) -> Result<Option<serde_json::Value>, D::Error>
where
    D: Deserializer<'de>,
{
    serde_json::Value::deserialize(deserializer).map(Some)
}

impl fmt::Display for ImportTaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Import {}, processed: {}, failed: {}",
            self.status.as_deref().unwrap_or("UNKNOWN"),
            self.lines_processed,
            self.lines_failed
        )
    }
}

/// Result of one status check
#[derive(Debug, Clone)]
pub enum StatusReply {
    Snapshot(ImportTaskStatus),
    /// The grid refused this check; polling carries on
    Rejected(ApiFailure),
}

/// Anything that can report the status of an import task
#[allow(async_fn_in_trait)]
pub trait ImportStatusSource {
    async fn import_status(&self, task_ref: &str) -> Result<StatusReply, WapiError>;
}

impl ImportStatusSource for WapiSession {
    async fn import_status(&self, task_ref: &str) -> Result<StatusReply, WapiError> {
        let action = format!("check status of CSV task {}", task_ref);
        let response = self
            .get(task_ref)
            .send()
            .await
            .map_err(|e| WapiError::transport(&action, e))?;

        if !response.status().is_success() {
            return Ok(StatusReply::Rejected(ApiFailure::from_response(response).await));
        }

        let snapshot = response
            .json()
            .await
            .map_err(|e| WapiError::invalid(&action, e))?;
        Ok(StatusReply::Snapshot(snapshot))
    }
}

/// How polling ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// The task reported an `end_time`
    Completed(ImportCounts),
    /// The time budget ran out first; counts are the last ones seen
    TimedOut {
        counts: ImportCounts,
        waited: Duration,
    },
}

impl PollOutcome {
    pub fn counts(&self) -> ImportCounts {
        match self {
            PollOutcome::Completed(counts) => *counts,
            PollOutcome::TimedOut { counts, .. } => *counts,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, PollOutcome::Completed(_))
    }
}

/// Poll `job` until it finishes or `config.timeout` has been spent.
///
/// `on_progress` sees every non-final snapshot. A rejected check is logged
/// and counts against the budget like any other; transport errors end
/// polling with an error.
pub async fn poll_import<S, F>(
    source: &S,
    job: &ImportJob,
    config: &PollConfig,
    mut on_progress: F,
) -> Result<PollOutcome, WapiError>
where
    S: ImportStatusSource,
    F: FnMut(&ImportTaskStatus),
{
    // A zero interval would never exhaust the budget
    let step = config.interval.max(Duration::from_millis(1));
    let mut waited = Duration::ZERO;
    let mut last_seen = ImportCounts::default();
    let mut checks = 0u32;

    while waited < config.timeout {
        checks += 1;
        match source.import_status(job.task_ref()).await? {
            StatusReply::Snapshot(snapshot) => {
                last_seen = snapshot.counts();
                if snapshot.is_finished() {
                    info!(
                        task = job.task_ref(),
                        checks,
                        lines_processed = last_seen.lines_processed,
                        lines_failed = last_seen.lines_failed,
                        "CSV import finished"
                    );
                    return Ok(PollOutcome::Completed(last_seen));
                }
                debug!(task = job.task_ref(), checks, "{}", snapshot);
                on_progress(&snapshot);
            }
            StatusReply::Rejected(failure) => {
                warn!(
                    "Cannot check status of CSV task {}: {}",
                    job.task_ref(),
                    failure
                );
            }
        }

        waited += step;
        tokio::time::sleep(step).await;
    }

    warn!(
        task = job.task_ref(),
        checks,
        "CSV import still running after {} seconds",
        waited.as_secs()
    );
    Ok(PollOutcome::TimedOut {
        counts: last_seen,
        waited,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    #[test]
    fn test_status_parsing_without_end_time() {
        let body = r#"{"_ref": "csvimporttask/x:1", "status": "RUNNING", "lines_processed": 40, "lines_failed": 2}"#;
        let status: ImportTaskStatus = serde_json::from_str(body).unwrap();
        assert!(!status.is_finished());
        assert_eq!(status.counts(), ImportCounts { lines_processed: 40, lines_failed: 2 });
        assert_eq!(status.to_string(), "Import RUNNING, processed: 40, failed: 2");
    }

    #[test]
    fn test_status_parsing_with_end_time() {
        let body = r#"{"status": "COMPLETED", "lines_processed": 100, "lines_failed": 0, "end_time": 1700000000}"#;
        let status: ImportTaskStatus = serde_json::from_str(body).unwrap();
        assert!(status.is_finished());
    }

    #[test]
    fn test_null_end_time_is_finished() {
        let body = r#"{"status": "COMPLETED", "lines_processed": 100, "lines_failed": 0, "end_time": null}"#;
        let status: ImportTaskStatus = serde_json::from_str(body).unwrap();
        assert!(status.is_finished());
        assert_eq!(status.counts(), ImportCounts { lines_processed: 100, lines_failed: 0 });
    }

    #[test]
    fn test_non_numeric_end_time_is_finished() {
        let body = r#"{"status": "COMPLETED", "end_time": "2024-01-01T00:00:00Z"}"#;
        let status: ImportTaskStatus = serde_json::from_str(body).unwrap();
        assert!(status.is_finished());
    }

    /// Replays a fixed sequence of replies, one per check
    struct ScriptedGrid {
        replies: Mutex<VecDeque<StatusReply>>,
        checks: Mutex<u32>,
    }

    impl ScriptedGrid {
        fn new(replies: Vec<StatusReply>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                checks: Mutex::new(0),
            }
        }

        fn checks(&self) -> u32 {
            *self.checks.lock().unwrap()
        }

        fn remaining(&self) -> usize {
            self.replies.lock().unwrap().len()
        }
    }

    impl ImportStatusSource for ScriptedGrid {
        async fn import_status(&self, _task_ref: &str) -> Result<StatusReply, WapiError> {
            *self.checks.lock().unwrap() += 1;
            Ok(self
                .replies
                .lock()
                .unwrap()
                .pop_front()
                .expect("grid polled more often than scripted"))
        }
    }

    fn running(processed: u64, failed: u64) -> StatusReply {
        StatusReply::Snapshot(ImportTaskStatus {
            status: Some("RUNNING".to_string()),
            lines_processed: processed,
            lines_failed: failed,
            end_time: None,
        })
    }

    fn finished(processed: u64, failed: u64) -> StatusReply {
        StatusReply::Snapshot(ImportTaskStatus {
            status: Some("COMPLETED".to_string()),
            lines_processed: processed,
            lines_failed: failed,
            end_time: Some(serde_json::json!(1_700_000_000)),
        })
    }

    fn job() -> ImportJob {
        ImportJob::new("csvimporttask/b25lLmNzdl9pbXBvcnRfdGFzayQx:1".to_string(), 1)
    }

    #[tokio::test(start_paused = true)]
    async fn test_completed_on_first_check() {
        let grid = ScriptedGrid::new(vec![finished(100, 0)]);
        let start = tokio::time::Instant::now();
        let mut progress = Vec::new();

        let outcome = poll_import(&grid, &job(), &PollConfig::default(), |s| progress.push(s.clone()))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            PollOutcome::Completed(ImportCounts { lines_processed: 100, lines_failed: 0 })
        );
        assert_eq!(grid.checks(), 1);
        assert!(progress.is_empty());
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reports_progress_until_finished() {
        let grid = ScriptedGrid::new(vec![running(10, 0), running(55, 1), finished(100, 5)]);
        let start = tokio::time::Instant::now();
        let mut progress = Vec::new();

        let outcome = poll_import(&grid, &job(), &PollConfig::default(), |s| progress.push(s.to_string()))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            PollOutcome::Completed(ImportCounts { lines_processed: 100, lines_failed: 5 })
        );
        assert_eq!(
            progress,
            vec![
                "Import RUNNING, processed: 10, failed: 0".to_string(),
                "Import RUNNING, processed: 55, failed: 1".to_string(),
            ]
        );
        assert_eq!(start.elapsed(), Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out_after_sixty_checks() {
        let replies = (0..61).map(|i| running(i, 0)).collect();
        let grid = ScriptedGrid::new(replies);
        let start = tokio::time::Instant::now();

        let outcome = poll_import(&grid, &job(), &PollConfig::default(), |_| {})
            .await
            .unwrap();

        assert_eq!(grid.checks(), 60);
        assert_eq!(grid.remaining(), 1);
        assert_eq!(start.elapsed(), Duration::from_secs(1800));
        assert_eq!(
            outcome,
            PollOutcome::TimedOut {
                counts: ImportCounts { lines_processed: 59, lines_failed: 0 },
                waited: Duration::from_secs(1800),
            }
        );
        assert!(!outcome.is_completed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_check_does_not_stop_polling() {
        let rejected = StatusReply::Rejected(ApiFailure::new(
            reqwest::StatusCode::SERVICE_UNAVAILABLE,
            "grid busy",
        ));
        let grid = ScriptedGrid::new(vec![running(5, 0), rejected, finished(20, 0)]);

        let outcome = poll_import(&grid, &job(), &PollConfig::default(), |_| {})
            .await
            .unwrap();

        assert!(outcome.is_completed());
        assert_eq!(outcome.counts().lines_processed, 20);
        assert_eq!(grid.checks(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_with_only_rejections_reports_zero_counts() {
        let config = PollConfig {
            interval: Duration::from_secs(10),
            timeout: Duration::from_secs(20),
        };
        let rejected = || StatusReply::Rejected(ApiFailure::new(reqwest::StatusCode::BAD_GATEWAY, ""));
        let grid = ScriptedGrid::new(vec![rejected(), rejected()]);

        let outcome = poll_import(&grid, &job(), &config, |_| {}).await.unwrap();

        assert_eq!(outcome.counts(), ImportCounts::default());
        assert_eq!(grid.checks(), 2);
    }

    #[test]
    fn test_default_poll_config() {
        let config = PollConfig::default();
        assert_eq!(config.interval, Duration::from_secs(30));
        assert_eq!(config.timeout, Duration::from_secs(1800));
    }
}
