//! I/O boundary traits for testability
//!
//! These traits abstract external I/O operations, allowing services
//! to be tested with mock implementations.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use tracing::debug;

use crate::domain::ConflictPolicy;

/// Filesystem abstraction for testability.
pub trait FileSystem: Send + Sync {
    /// Read file contents to string.
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Write string content to file.
    fn write(&self, path: &Path, content: &str) -> io::Result<()>;

    /// Write content via a temp file in the same directory, then rename.
    /// Readers never observe a partially written file.
    fn write_atomic(&self, path: &Path, content: &str) -> io::Result<()>;

    /// Like [`FileSystem::write_atomic`], but never replaces an existing file.
    /// Fails with `ErrorKind::AlreadyExists` if `path` exists at rename time.
    fn write_atomic_new(&self, path: &Path, content: &str) -> io::Result<()>;

    /// Check if path exists.
    fn exists(&self, path: &Path) -> bool;

    /// Check if path is a file.
    fn is_file(&self, path: &Path) -> bool;

    /// Check if path is a directory.
    fn is_dir(&self, path: &Path) -> bool;

    /// Create directory and all parent directories.
    fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    /// Canonicalize path (resolve symlinks, make absolute).
    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf>;

    /// Direct children of a directory, sorted by file name.
    fn list_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>>;

    /// Creation time, falling back to modification time where the
    /// platform does not record birth time.
    fn created(&self, path: &Path) -> io::Result<SystemTime>;

    /// Create parent directories if needed.
    fn ensure_parent(&self, path: &Path) -> io::Result<()>;
}

/// Persists an assembled document.
pub trait OutputWriter: Send + Sync {
    /// Write `content` to `target` and return the path actually written,
    /// which differs from `target` when a conflict forced a rename.
    fn write_output(&self, target: &Path, content: &str) -> io::Result<PathBuf>;
}

/// Item for FZF-style selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionItem {
    /// Display text shown in selector
    pub display: String,
    /// Actual value (e.g., file path)
    pub value: String,
}

/// Interactive FZF-style selector abstraction.
pub trait Selector: Send + Sync {
    /// Present items to user and return selected ones.
    /// Returns an empty list if user cancels (Esc/Ctrl-C).
    fn select_many(&self, items: &[SelectionItem], prompt: &str)
        -> Result<Vec<SelectionItem>, String>;
}

/// Editor abstraction for opening files.
pub trait Editor: Send + Sync {
    /// Open a file in the editor.
    /// Blocks until editor exits.
    fn open(&self, path: &Path) -> io::Result<()>;
}

// ============================================================
// REAL IMPLEMENTATIONS
// ============================================================

/// Real filesystem implementation.
#[derive(Debug, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn write(&self, path: &Path, content: &str) -> io::Result<()> {
        std::fs::write(path, content)
    }

    fn write_atomic(&self, path: &Path, content: &str) -> io::Result<()> {
        let tmp = staged_temp_file(path, content)?;
        tmp.persist(path).map_err(|e| e.error)?;
        Ok(())
    }

    fn write_atomic_new(&self, path: &Path, content: &str) -> io::Result<()> {
        let tmp = staged_temp_file(path, content)?;
        tmp.persist_noclobber(path).map_err(|e| e.error)?;
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        std::fs::create_dir_all(path)
    }

    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf> {
        std::fs::canonicalize(path)
    }

    fn list_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        use walkdir::WalkDir;

        let mut children = Vec::new();
        for entry in WalkDir::new(path)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.map_err(io::Error::from)?;
            children.push(entry.into_path());
        }
        Ok(children)
    }

    fn created(&self, path: &Path) -> io::Result<SystemTime> {
        let meta = std::fs::metadata(path)?;
        meta.created().or_else(|_| meta.modified())
    }

    fn ensure_parent(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                self.create_dir_all(parent)?;
            }
        }
        Ok(())
    }
}

/// Temp file next to `path`, holding `content` synced to disk.
fn staged_temp_file(path: &Path, content: &str) -> io::Result<tempfile::NamedTempFile> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(content.as_bytes())?;
    tmp.as_file().sync_all()?;
    Ok(tmp)
}

/// Writes merged documents into the vault, resolving name conflicts
/// according to a [`ConflictPolicy`].
pub struct VaultOutputWriter {
    fs: Arc<dyn FileSystem>,
    policy: ConflictPolicy,
}

impl VaultOutputWriter {
    pub fn new(fs: Arc<dyn FileSystem>, policy: ConflictPolicy) -> Self {
        Self { fs, policy }
    }

    /// Write to `target`, or the first free `"<stem> N.<ext>"` next to it.
    ///
    /// Each candidate is claimed by a no-clobber rename, so a file created
    /// concurrently under the same name is skipped, never replaced.
    fn write_first_free(&self, target: &Path, content: &str) -> io::Result<PathBuf> {
        let mut n = 0u32;
        loop {
            let candidate = numbered(target, n);
            match self.fs.write_atomic_new(&candidate, content) {
                Ok(()) => return Ok(candidate),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    debug!("write_output: {} taken", candidate.display());
                    n += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// `target` itself for `n == 0`, else `"<stem> N.<ext>"` in the same folder.
fn numbered(target: &Path, n: u32) -> PathBuf {
    if n == 0 {
        return target.to_path_buf();
    }
    let stem = target
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let ext = target
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    target.with_file_name(format!("{stem} {n}{ext}"))
}

impl OutputWriter for VaultOutputWriter {
    fn write_output(&self, target: &Path, content: &str) -> io::Result<PathBuf> {
        debug!(
            "write_output: {} ({} bytes, {:?})",
            target.display(),
            content.len(),
            self.policy
        );
        self.fs.ensure_parent(target)?;
        match self.policy {
            ConflictPolicy::Overwrite => {
                self.fs.write_atomic(target, content)?;
                Ok(target.to_path_buf())
            }
            ConflictPolicy::Fail => {
                self.fs.write_atomic_new(target, content)?;
                Ok(target.to_path_buf())
            }
            ConflictPolicy::Rename => self.write_first_free(target, content),
        }
    }
}

/// Real selector implementation using skim (FZF-like).
#[derive(Debug, Default)]
pub struct SkimSelector;

/// Real editor implementation using $EDITOR, $VISUAL, or vim.
#[derive(Debug, Default)]
pub struct EnvironmentEditor;

impl Selector for SkimSelector {
    fn select_many(
        &self,
        items: &[SelectionItem],
        prompt: &str,
    ) -> Result<Vec<SelectionItem>, String> {
        use skim::prelude::*;
        use std::io::Cursor;

        if items.is_empty() {
            return Ok(Vec::new());
        }

        // Build input as newline-separated display strings
        let input = items
            .iter()
            .map(|i| i.display.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        let options = SkimOptionsBuilder::default()
            .prompt(Some(prompt))
            .height(Some("50%"))
            .multi(true)
            .build()
            .map_err(|e| format!("failed to build skim options: {e}"))?;

        let item_reader = SkimItemReader::default();
        let items_arc = item_reader.of_bufread(Cursor::new(input));

        let output = Skim::run_with(&options, Some(items_arc));

        match output {
            Some(out) if out.is_abort => Ok(Vec::new()),
            Some(out) => Ok(out
                .selected_items
                .iter()
                .filter_map(|selected| {
                    let display = selected.output().to_string();
                    items.iter().find(|i| i.display == display).cloned()
                })
                .collect()),
            None => Ok(Vec::new()),
        }
    }
}

impl Editor for EnvironmentEditor {
    fn open(&self, path: &Path) -> io::Result<()> {
        use std::process::Command;

        // Determine editor: $VISUAL > $EDITOR > vim
        let editor = std::env::var("VISUAL")
            .or_else(|_| std::env::var("EDITOR"))
            .unwrap_or_else(|_| "vim".to_string());

        let status = Command::new(&editor).arg(path).status()?;

        if status.success() {
            Ok(())
        } else {
            Err(io::Error::new(
                io::ErrorKind::Other,
                format!("editor exited with status: {}", status),
            ))
        }
    }
}
