//! Vault service
//!
//! Resolves selected paths inside a vault directory into merge entries.

use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::application::{ApplicationError, ApplicationResult, IoResultExt};
use crate::domain::{Entry, FileRef, FolderRef};
use crate::infrastructure::traits::FileSystem;

/// Service for reading the vault's folder structure.
pub struct VaultService {
    fs: Arc<dyn FileSystem>,
    root: PathBuf,
    extensions: Vec<String>,
    ignore_dirs: Vec<String>,
}

impl VaultService {
    /// Create a vault service.
    ///
    /// # Arguments
    /// * `root` - Vault root; note paths are relative to it
    /// * `extensions` - File extensions treated as notes (without dot)
    /// * `ignore_dirs` - Folder names never descended into
    pub fn new(
        fs: Arc<dyn FileSystem>,
        root: PathBuf,
        extensions: Vec<String>,
        ignore_dirs: Vec<String>,
    ) -> ApplicationResult<Self> {
        let root = fs
            .canonicalize(&root)
            .with_path_context("open vault", &root)?;
        debug!("vault: root={}", root.display());
        Ok(Self {
            fs,
            root,
            extensions,
            ignore_dirs,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve selected files and folders into entries.
    ///
    /// Relative selections are taken relative to the vault root. Without
    /// `include_nested_folders`, only the direct children of a selected folder
    /// are read; its sub-folders appear as empty placeholders and are never
    /// listed. Selected files that are not notes are skipped with a warning.
    pub fn resolve(
        &self,
        selections: &[PathBuf],
        include_nested_folders: bool,
    ) -> ApplicationResult<Vec<Entry>> {
        debug!(
            "resolve: {} selections (nested={})",
            selections.len(),
            include_nested_folders
        );
        let mut entries = Vec::new();
        for selection in selections {
            let abs = self.absolute(selection)?;
            if self.fs.is_dir(&abs) {
                let mut visited = HashSet::new();
                entries.push(Entry::Folder(self.folder(
                    &abs,
                    include_nested_folders,
                    &mut visited,
                )?));
            } else if self.is_note(&abs) {
                entries.push(Entry::File(self.file_ref(&abs)?));
            } else {
                warn!("skipping non-note selection: {}", selection.display());
            }
        }
        Ok(entries)
    }

    /// All folders of the vault (root included), as vault-relative paths.
    pub fn folders(&self) -> ApplicationResult<Vec<String>> {
        let mut visited = HashSet::new();
        let root = self.folder(&self.root, true, &mut visited)?;
        let mut out = Vec::new();
        Self::push_folders(&root, &mut out);
        Ok(out)
    }

    fn push_folders(folder: &FolderRef, out: &mut Vec<String>) {
        out.push(if folder.path.is_empty() {
            ".".to_string()
        } else {
            folder.path.clone()
        });
        for child in &folder.children {
            if let Entry::Folder(sub) = child {
                Self::push_folders(sub, out);
            }
        }
    }

    fn absolute(&self, selection: &Path) -> ApplicationResult<PathBuf> {
        let joined = if selection.is_absolute() {
            selection.to_path_buf()
        } else {
            self.root.join(selection)
        };
        let abs = self
            .fs
            .canonicalize(&joined)
            .with_path_context("resolve selection", selection)?;
        if !abs.starts_with(&self.root) {
            return Err(ApplicationError::NotInVault {
                path: selection.to_path_buf(),
                vault: self.root.clone(),
            });
        }
        Ok(abs)
    }

    fn folder(
        &self,
        dir: &Path,
        nested: bool,
        visited: &mut HashSet<PathBuf>,
    ) -> ApplicationResult<FolderRef> {
        // symlinked folders may loop back
        let canonical = self
            .fs
            .canonicalize(dir)
            .with_path_context("resolve folder", dir)?;
        visited.insert(canonical);

        let mut children = Vec::new();
        for child in self.fs.list_dir(dir).with_path_context("list folder", dir)? {
            if self.fs.is_dir(&child) {
                if self.is_ignored_dir(&child) {
                    continue;
                }
                if !nested {
                    children.push(Entry::Folder(FolderRef::new(
                        self.relative(&child),
                        file_name(&child),
                        Vec::new(),
                    )));
                    continue;
                }
                let key = self
                    .fs
                    .canonicalize(&child)
                    .with_path_context("resolve folder", &child)?;
                if visited.contains(&key) {
                    debug!("folder: skipping already visited {}", child.display());
                    continue;
                }
                children.push(Entry::Folder(self.folder(&child, nested, visited)?));
            } else if self.is_note(&child) {
                children.push(Entry::File(self.file_ref(&child)?));
            }
        }

        Ok(FolderRef::new(
            self.relative(dir),
            file_name(dir),
            children,
        ))
    }

    fn file_ref(&self, path: &Path) -> ApplicationResult<FileRef> {
        let created = self
            .fs
            .created(path)
            .with_path_context("read creation time", path)?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        Ok(FileRef::new(
            self.relative(path),
            name,
            DateTime::<Utc>::from(created),
        ))
    }

    /// Vault-relative path with `/` separators.
    fn relative(&self, path: &Path) -> String {
        let rel = pathdiff::diff_paths(path, &self.root).unwrap_or_else(|| path.to_path_buf());
        rel.components()
            .filter_map(|c| match c {
                Component::Normal(s) => Some(s.to_string_lossy().to_string()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("/")
    }

    fn is_note(&self, path: &Path) -> bool {
        self.fs.is_file(path)
            && path
                .extension()
                .map(|ext| {
                    let ext = ext.to_string_lossy();
                    self.extensions.iter().any(|e| e.eq_ignore_ascii_case(&ext))
                })
                .unwrap_or(false)
    }

    fn is_ignored_dir(&self, path: &Path) -> bool {
        let name = file_name(path);
        name.starts_with('.') || self.ignore_dirs.iter().any(|d| *d == name)
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}
