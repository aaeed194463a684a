//! ibx-nios library - NIOS grid tools over WAPI
//!
//! The CSV import workflow runs strictly in order:
//! authenticate, initiate upload, upload file, submit import task,
//! poll task progress, and (only when lines failed) fetch the error log.
//! Each step consumes the handle produced by the step before it, so an
//! upload slot or import task can never be used twice.

pub mod error;
pub mod export;
pub mod fileop;
pub mod import;
pub mod poller;
pub mod wapi;

pub use error::WapiError;
pub use fileop::{ImportJob, ImportPolicy, UploadHandle, UploadedFile};
pub use import::{run_import, ImportOptions, ImportReport};
pub use poller::{poll_import, ImportCounts, ImportTaskStatus, PollConfig, PollOutcome};
pub use wapi::WapiSession;
