//! Common error types for the ibx tools

use std::path::PathBuf;
use thiserror::Error;

/// Common result type for ibx operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised before any request reaches a grid
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file could not be opened or read
    #[error("Could not open configuration file \"{}\": {source}", path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration file is not valid INI
    #[error("Could not read configuration file \"{}\": {message}", path.display())]
    ConfigParse { path: PathBuf, message: String },

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),
}
