//! Domain entities: core data structures

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::warn;

use crate::domain::DomainError;

/// A leaf note inside the vault.
///
/// Content is not held here; it is read on demand when the merge is assembled.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileRef {
    /// Vault-relative path with `/` separators, unique within the vault
    pub path: String,
    /// Display name (file name without extension)
    pub name: String,
    /// Creation timestamp, source of truth for creation-date ordering
    pub created_at: DateTime<Utc>,
}

impl FileRef {
    pub fn new(path: impl Into<String>, name: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
            created_at,
        }
    }
}

/// A folder node owning files and further folders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderRef {
    pub path: String,
    pub name: String,
    pub children: Vec<Entry>,
}

impl FolderRef {
    pub fn new(path: impl Into<String>, name: impl Into<String>, children: Vec<Entry>) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
            children,
        }
    }
}

/// A user-selected item: either a single note or a folder of notes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    File(FileRef),
    Folder(FolderRef),
}

impl Entry {
    pub fn path(&self) -> &str {
        match self {
            Entry::File(f) => &f.path,
            Entry::Folder(d) => &d.path,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Entry::File(f) => &f.name,
            Entry::Folder(d) => &d.name,
        }
    }
}

impl From<FileRef> for Entry {
    fn from(file: FileRef) -> Self {
        Entry::File(file)
    }
}

impl From<FolderRef> for Entry {
    fn from(folder: FolderRef) -> Self {
        Entry::Folder(folder)
    }
}

/// Ordering policy applied to collected notes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortMode {
    #[default]
    Alphabetical,
    CreationDate,
    Logical,
}

impl SortMode {
    /// Settings-file name of the mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            SortMode::Alphabetical => "alphabetical",
            SortMode::CreationDate => "creationDate",
            SortMode::Logical => "logical",
        }
    }

    /// Parse a mode, falling back to `Alphabetical` for unknown values.
    ///
    /// Used for persisted settings, where a stale or misspelled value must not
    /// break every merge. Strict parsing is available through `FromStr`.
    pub fn parse_or_default(s: &str) -> Self {
        s.parse().unwrap_or_else(|e: DomainError| {
            warn!("{e}, falling back to alphabetical");
            SortMode::Alphabetical
        })
    }
}

impl FromStr for SortMode {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace(['-', '_'], "").as_str() {
            "alphabetical" => Ok(SortMode::Alphabetical),
            "creationdate" => Ok(SortMode::CreationDate),
            "logical" => Ok(SortMode::Logical),
            _ => Err(DomainError::InvalidSortMode(s.to_string())),
        }
    }
}

impl fmt::Display for SortMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for SortMode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for SortMode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(SortMode::parse_or_default(&raw))
    }
}

/// Markdown heading level (1..=6) for per-note headings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct HeadingLevel(u8);

impl HeadingLevel {
    pub fn new(level: u8) -> Result<Self, DomainError> {
        if (1..=6).contains(&level) {
            Ok(Self(level))
        } else {
            Err(DomainError::InvalidHeadingLevel(level.into()))
        }
    }

    pub fn level(&self) -> u8 {
        self.0
    }

    /// Heading line for a note, e.g. `## Name`.
    pub fn render(&self, title: &str) -> String {
        format!("{} {}", "#".repeat(self.0 as usize), title)
    }
}

impl TryFrom<u8> for HeadingLevel {
    type Error = DomainError;

    fn try_from(level: u8) -> Result<Self, Self::Error> {
        Self::new(level)
    }
}

/// For settings sources that deliver wider integers (env vars).
impl TryFrom<i64> for HeadingLevel {
    type Error = DomainError;

    fn try_from(level: i64) -> Result<Self, Self::Error> {
        u8::try_from(level)
            .map_err(|_| DomainError::InvalidHeadingLevel(level))
            .and_then(Self::new)
    }
}

impl From<HeadingLevel> for u8 {
    fn from(level: HeadingLevel) -> Self {
        level.0
    }
}

/// Parameters of a single merge run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeConfig {
    pub entries: Vec<Entry>,
    pub include_nested_folders: bool,
    pub sort_mode: SortMode,
    pub output_file_name: String,
    pub separator: String,
    /// Insert the note name as a heading before each body
    pub headings: Option<HeadingLevel>,
}

/// Stage of the merge pipeline.
///
/// Stages only move forward; any failure ends in `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeStage {
    Collecting,
    Sorting,
    Assembling,
    Writing,
    Done,
    Failed,
}

impl MergeStage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, MergeStage::Done | MergeStage::Failed)
    }

    /// The stage following this one on success.
    pub fn next(&self) -> Self {
        match self {
            MergeStage::Collecting => MergeStage::Sorting,
            MergeStage::Sorting => MergeStage::Assembling,
            MergeStage::Assembling => MergeStage::Writing,
            MergeStage::Writing => MergeStage::Done,
            MergeStage::Done => MergeStage::Done,
            MergeStage::Failed => MergeStage::Failed,
        }
    }
}

impl fmt::Display for MergeStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MergeStage::Collecting => "collecting",
            MergeStage::Sorting => "sorting",
            MergeStage::Assembling => "assembling",
            MergeStage::Writing => "writing",
            MergeStage::Done => "done",
            MergeStage::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Policy when the output file already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictPolicy {
    /// Pick the next free name: `Merged 1.md`, `Merged 2.md`, ...
    #[default]
    Rename,
    Overwrite,
    Fail,
}

impl FromStr for ConflictPolicy {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rename" => Ok(ConflictPolicy::Rename),
            "overwrite" => Ok(ConflictPolicy::Overwrite),
            "fail" => Ok(ConflictPolicy::Fail),
            _ => Err(DomainError::InvalidConflictPolicy(s.to_string())),
        }
    }
}

/// Expand environment variables in a path string.
///
/// Supports:
/// - `$VAR` syntax
/// - `${VAR}` syntax
/// - `~` for home directory
pub fn expand_env_vars(path: &str) -> String {
    shellexpand::full(path)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| path.to_string())
}
