//! # ibx Common Library
//!
//! Shared code for the Infoblox grid and BloxOne tools including:
//! - Error types
//! - Credential profile loading (NIOS `~/.infoblox`, BloxOne `~/.bloxone.ini`)
//! - API error reporting helpers
//! - Upload filename sanitizing
//! - Logging setup

pub mod api_error;
pub mod config;
pub mod error;
pub mod filename;
pub mod logging;

pub use api_error::{extract_error_text, ApiFailure};
pub use config::{BloxOneProfile, GridProfile};
pub use error::{Error, Result};
pub use filename::sanitized_filename;
