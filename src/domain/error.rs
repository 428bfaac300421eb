//! Domain-level errors (no external dependencies)

use thiserror::Error;

/// Domain errors represent invalid merge parameters.
/// These are independent of infrastructure concerns.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid sort mode: {0} (expected alphabetical, creationDate or logical)")]
    InvalidSortMode(String),

    #[error("invalid heading level: {0} (expected 1-6)")]
    InvalidHeadingLevel(i64),

    #[error("invalid conflict policy: {0} (expected rename, overwrite or fail)")]
    InvalidConflictPolicy(String),

    #[error("invalid index pattern: {0}")]
    InvalidPattern(String),

    #[error("invalid output name: {0:?}")]
    InvalidOutputName(String),
}
