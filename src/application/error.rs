//! Application-level errors (wraps domain errors)

use std::path::PathBuf;
use thiserror::Error;

use crate::domain::{DomainError, MergeStage};

/// Application errors wrap domain errors and add application-level context.
#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("{0}")]
    Domain(#[from] DomainError),

    /// One or more notes could not be read; nothing was written.
    #[error("cannot read {} note(s): {}", paths.len(), paths.join(", "))]
    ContentReadFailure { paths: Vec<String> },

    #[error("cannot write {}", path.display())]
    WriteFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("output already exists: {0}")]
    OutputExists(PathBuf),

    #[error("merge cancelled while {0}")]
    Cancelled(MergeStage),

    #[error("not inside vault {vault}: {path}")]
    NotInVault { path: PathBuf, vault: PathBuf },

    #[error("config error: {message}")]
    Config { message: String },

    #[error("operation failed: {context}")]
    OperationFailed {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Result type for application layer operations.
pub type ApplicationResult<T> = Result<T, ApplicationError>;
