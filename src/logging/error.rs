use std::{io, path::PathBuf, result};

use thiserror::Error;
use tracing_subscriber::{filter::ParseError, util::TryInitError};

#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("Invalid log filter `{filter}`: {e}")]
    InvalidFilter { filter: String, e: ParseError },

    #[error("Failed to create log directory {dir:?}: {e}")]
    CreateDir { dir: PathBuf, e: io::Error },

    #[error("Failed to open log file {path:?}: {e}")]
    OpenFile { path: PathBuf, e: io::Error },

    #[error("Failed to install tracing subscriber: {0}")]
    Init(TryInitError),
}

pub(crate) type Result<T> = result::Result<T, LoggingError>;
