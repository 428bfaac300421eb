//! Merge service
//!
//! Runs the merge pipeline: collect → sort → assemble → write.

use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::application::{ApplicationError, ApplicationResult};
use crate::domain::{
    collect, sort, DomainError, FileRef, HeadingLevel, LogicalOrder, MergeConfig, MergeStage,
};
use crate::infrastructure::traits::{FileSystem, OutputWriter};

/// Cooperative cancellation flag shared with the caller.
///
/// Checked before every stage and right before the output is written.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Result of a merge run.
#[derive(Debug, Clone)]
pub struct MergeReport {
    /// Notes in merge order
    pub files: Vec<FileRef>,
    /// Assembled document
    pub content: String,
    /// Written file; `None` for previews and empty selections
    pub output: Option<PathBuf>,
}

impl MergeReport {
    fn empty() -> Self {
        Self {
            files: Vec::new(),
            content: String::new(),
            output: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Service merging notes of one vault.
pub struct MergeService {
    fs: Arc<dyn FileSystem>,
    writer: Arc<dyn OutputWriter>,
    root: PathBuf,
    note_extensions: Vec<String>,
}

impl MergeService {
    /// Create a merge service.
    ///
    /// `root` is the vault directory: note paths and the output name are
    /// resolved against it.
    pub fn new(fs: Arc<dyn FileSystem>, writer: Arc<dyn OutputWriter>, root: PathBuf) -> Self {
        Self {
            fs,
            writer,
            root,
            note_extensions: vec!["md".to_string()],
        }
    }

    /// Extensions an output name may already carry; any other name gets
    /// `.md` appended. Defaults to `md`.
    pub fn with_note_extensions(mut self, extensions: Vec<String>) -> Self {
        self.note_extensions = extensions;
        self
    }

    /// Collect and sort the notes a merge would include, without reading them.
    pub fn plan(&self, config: &MergeConfig, logical: &dyn LogicalOrder) -> Vec<FileRef> {
        let files = self.collect_inputs(config);
        sort(&files, config.sort_mode, logical)
    }

    /// Notes selected by `config`, minus the document the merge writes to.
    ///
    /// A previous output inside the selection is never merged into the next.
    fn collect_inputs(&self, config: &MergeConfig) -> Vec<FileRef> {
        let mut files = collect(&config.entries, config.include_nested_folders);
        if let Ok(target) = self.output_path(&config.output_file_name) {
            files.retain(|file| {
                let is_output = self.note_path(file) == target;
                if is_output {
                    debug!("collect_inputs: skipping output {}", file.path);
                }
                !is_output
            });
        }
        files
    }

    /// Run the pipeline and write the result.
    ///
    /// An empty selection, or one that contains no notes, is a no-op:
    /// nothing is read or written.
    pub fn merge(
        &self,
        config: &MergeConfig,
        logical: &dyn LogicalOrder,
        cancel: &CancelToken,
    ) -> ApplicationResult<MergeReport> {
        self.run(config, logical, cancel, true)
    }

    /// Run the pipeline without writing; the report carries the content.
    pub fn preview(
        &self,
        config: &MergeConfig,
        logical: &dyn LogicalOrder,
        cancel: &CancelToken,
    ) -> ApplicationResult<MergeReport> {
        self.run(config, logical, cancel, false)
    }

    fn run(
        &self,
        config: &MergeConfig,
        logical: &dyn LogicalOrder,
        cancel: &CancelToken,
        write: bool,
    ) -> ApplicationResult<MergeReport> {
        let mut stage = MergeStage::Collecting;
        let result = self.run_stages(config, logical, cancel, write, &mut stage);
        match &result {
            Ok(report) => debug!("merge: {} after {} files", stage, report.files.len()),
            Err(e) => warn!("merge: {} while {}: {}", MergeStage::Failed, stage, e),
        }
        result
    }

    fn run_stages(
        &self,
        config: &MergeConfig,
        logical: &dyn LogicalOrder,
        cancel: &CancelToken,
        write: bool,
        stage: &mut MergeStage,
    ) -> ApplicationResult<MergeReport> {
        if config.entries.is_empty() {
            info!("merge: empty selection, nothing to do");
            *stage = MergeStage::Done;
            return Ok(MergeReport::empty());
        }

        // output name is validated before any work is done
        let target = if write {
            Some(self.output_path(&config.output_file_name)?)
        } else {
            None
        };

        checkpoint(cancel, *stage)?;
        let files = self.collect_inputs(config);
        if files.is_empty() {
            info!("merge: selection contains no notes, nothing to do");
            *stage = MergeStage::Done;
            return Ok(MergeReport::empty());
        }

        *stage = stage.next();
        checkpoint(cancel, *stage)?;
        let files = sort(&files, config.sort_mode, logical);

        *stage = stage.next();
        checkpoint(cancel, *stage)?;
        let content = self.assemble(&files, &config.separator, config.headings)?;

        *stage = stage.next();
        checkpoint(cancel, *stage)?;
        let output = match target {
            Some(target) => Some(self.write_output(&target, &content)?),
            None => None,
        };

        *stage = stage.next();
        Ok(MergeReport {
            files,
            content,
            output,
        })
    }

    /// Read every note and join the bodies with `separator`.
    ///
    /// Reads run in parallel; the output follows the order of `ordered`.
    /// If any note cannot be read, the whole assembly fails with one error
    /// listing every unreadable path.
    pub fn assemble(
        &self,
        ordered: &[FileRef],
        separator: &str,
        headings: Option<HeadingLevel>,
    ) -> ApplicationResult<String> {
        debug!("assemble: {} files", ordered.len());
        let reads: Vec<Result<String, (&str, io::Error)>> = ordered
            .par_iter()
            .map(|file| {
                self.fs
                    .read_to_string(&self.note_path(file))
                    .map(|body| match headings {
                        Some(level) => format!("{}\n\n{}", level.render(&file.name), body),
                        None => body,
                    })
                    .map_err(|e| (file.path.as_str(), e))
            })
            .collect();

        let mut bodies = Vec::with_capacity(reads.len());
        let mut failed = Vec::new();
        for read in reads {
            match read {
                Ok(body) => bodies.push(body),
                Err((path, e)) => {
                    debug!("assemble: cannot read {}: {}", path, e);
                    failed.push(path.to_string());
                }
            }
        }

        if !failed.is_empty() {
            return Err(ApplicationError::ContentReadFailure { paths: failed });
        }
        Ok(bodies.join(separator))
    }

    /// Target path for an output name: vault-relative, `.md` appended unless
    /// the name already ends in a note extension (`Report v1.2` becomes
    /// `Report v1.2.md`).
    pub fn output_path(&self, name: &str) -> ApplicationResult<PathBuf> {
        let trimmed = name.trim();
        let rel = Path::new(trimmed);
        let valid = !trimmed.is_empty()
            && !trimmed.ends_with('/')
            && rel
                .components()
                .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        if !valid {
            return Err(DomainError::InvalidOutputName(name.to_string()).into());
        }

        let path = self.root.join(rel);
        if self.is_note_name(&path) {
            return Ok(path);
        }
        let mut named = path.into_os_string();
        named.push(".md");
        Ok(PathBuf::from(named))
    }

    fn is_note_name(&self, path: &Path) -> bool {
        path.extension()
            .map(|ext| {
                let ext = ext.to_string_lossy();
                self.note_extensions
                    .iter()
                    .any(|e| e.eq_ignore_ascii_case(&ext))
            })
            .unwrap_or(false)
    }

    fn write_output(&self, target: &Path, content: &str) -> ApplicationResult<PathBuf> {
        let written = self
            .writer
            .write_output(target, content)
            .map_err(|e| match e.kind() {
                io::ErrorKind::AlreadyExists => ApplicationError::OutputExists(target.to_path_buf()),
                _ => ApplicationError::WriteFailure {
                    path: target.to_path_buf(),
                    source: e,
                },
            })?;
        info!("merge: wrote {}", written.display());
        Ok(written)
    }

    fn note_path(&self, file: &FileRef) -> PathBuf {
        file.path
            .split('/')
            .fold(self.root.clone(), |acc, part| acc.join(part))
    }
}

fn checkpoint(cancel: &CancelToken, stage: MergeStage) -> ApplicationResult<()> {
    if cancel.is_cancelled() {
        return Err(ApplicationError::Cancelled(stage));
    }
    Ok(())
}
