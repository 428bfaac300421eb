//! Tests for VaultOutputWriter conflict handling

use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

use rstest::rstest;
use tempfile::TempDir;

use notemerge::domain::ConflictPolicy;
use notemerge::infrastructure::traits::{
    FileSystem, OutputWriter, RealFileSystem, VaultOutputWriter,
};

/// Real filesystem where another writer creates the first `claims` targets
/// right before our rename lands.
struct ContendedFileSystem {
    inner: RealFileSystem,
    claims: usize,
    claimed: Mutex<Vec<PathBuf>>,
}

impl ContendedFileSystem {
    fn new(claims: usize) -> Self {
        Self {
            inner: RealFileSystem,
            claims,
            claimed: Mutex::new(Vec::new()),
        }
    }

    fn claim(&self, path: &Path) {
        let mut claimed = self.claimed.lock().unwrap();
        if claimed.len() < self.claims && !claimed.iter().any(|p| p == path) {
            std::fs::write(path, "other writer").unwrap();
            claimed.push(path.to_path_buf());
        }
    }
}

impl FileSystem for ContendedFileSystem {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        self.inner.read_to_string(path)
    }
    fn write(&self, path: &Path, content: &str) -> io::Result<()> {
        self.inner.write(path, content)
    }
    fn write_atomic(&self, path: &Path, content: &str) -> io::Result<()> {
        self.claim(path);
        self.inner.write_atomic(path, content)
    }
    fn write_atomic_new(&self, path: &Path, content: &str) -> io::Result<()> {
        self.claim(path);
        self.inner.write_atomic_new(path, content)
    }
    fn exists(&self, path: &Path) -> bool {
        self.inner.exists(path)
    }
    fn is_file(&self, path: &Path) -> bool {
        self.inner.is_file(path)
    }
    fn is_dir(&self, path: &Path) -> bool {
        self.inner.is_dir(path)
    }
    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        self.inner.create_dir_all(path)
    }
    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf> {
        self.inner.canonicalize(path)
    }
    fn list_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        self.inner.list_dir(path)
    }
    fn created(&self, path: &Path) -> io::Result<SystemTime> {
        self.inner.created(path)
    }
    fn ensure_parent(&self, path: &Path) -> io::Result<()> {
        self.inner.ensure_parent(path)
    }
}

fn writer(policy: ConflictPolicy) -> VaultOutputWriter {
    VaultOutputWriter::new(Arc::new(RealFileSystem), policy)
}

#[rstest]
#[case(ConflictPolicy::Rename)]
#[case(ConflictPolicy::Overwrite)]
#[case(ConflictPolicy::Fail)]
fn given_free_target_when_writing_then_uses_target(#[case] policy: ConflictPolicy) {
    let temp = TempDir::new().unwrap();
    let target = temp.path().join("out/Merged.md");

    let written = writer(policy).write_output(&target, "body").unwrap();

    assert_eq!(written, target);
    assert_eq!(std::fs::read_to_string(&target).unwrap(), "body");
}

#[test]
fn given_existing_target_when_renaming_then_picks_next_free_number() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let target = temp.path().join("Merged.md");
    std::fs::write(&target, "old").unwrap();
    std::fs::write(temp.path().join("Merged 1.md"), "older").unwrap();

    // Act
    let written = writer(ConflictPolicy::Rename)
        .write_output(&target, "new")
        .unwrap();

    // Assert
    assert_eq!(written, temp.path().join("Merged 2.md"));
    assert_eq!(std::fs::read_to_string(&target).unwrap(), "old");
    assert_eq!(std::fs::read_to_string(&written).unwrap(), "new");
}

#[test]
fn given_existing_target_when_overwriting_then_replaces_content() {
    let temp = TempDir::new().unwrap();
    let target = temp.path().join("Merged.md");
    std::fs::write(&target, "old").unwrap();

    let written = writer(ConflictPolicy::Overwrite)
        .write_output(&target, "new")
        .unwrap();

    assert_eq!(written, target);
    assert_eq!(std::fs::read_to_string(&target).unwrap(), "new");
}

#[test]
fn given_existing_target_when_policy_fails_then_already_exists() {
    let temp = TempDir::new().unwrap();
    let target = temp.path().join("Merged.md");
    std::fs::write(&target, "old").unwrap();

    let err = writer(ConflictPolicy::Fail)
        .write_output(&target, "new")
        .unwrap_err();

    assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
    assert_eq!(std::fs::read_to_string(&target).unwrap(), "old");
}

#[test]
fn given_concurrent_writer_when_renaming_then_its_files_are_kept() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let target = temp.path().join("Merged.md");
    let writer = VaultOutputWriter::new(
        Arc::new(ContendedFileSystem::new(2)),
        ConflictPolicy::Rename,
    );

    // Act
    let written = writer.write_output(&target, "ours").unwrap();

    // Assert
    assert_eq!(written, temp.path().join("Merged 2.md"));
    assert_eq!(std::fs::read_to_string(&target).unwrap(), "other writer");
    assert_eq!(
        std::fs::read_to_string(temp.path().join("Merged 1.md")).unwrap(),
        "other writer"
    );
    assert_eq!(std::fs::read_to_string(&written).unwrap(), "ours");
}

#[test]
fn given_concurrent_writer_when_policy_fails_then_already_exists() {
    let temp = TempDir::new().unwrap();
    let target = temp.path().join("Merged.md");
    let writer = VaultOutputWriter::new(
        Arc::new(ContendedFileSystem::new(1)),
        ConflictPolicy::Fail,
    );

    let err = writer.write_output(&target, "ours").unwrap_err();

    assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
    assert_eq!(std::fs::read_to_string(&target).unwrap(), "other writer");
}

#[test]
fn given_concurrent_writer_when_overwriting_then_replaces_content() {
    let temp = TempDir::new().unwrap();
    let target = temp.path().join("Merged.md");
    let writer = VaultOutputWriter::new(
        Arc::new(ContendedFileSystem::new(1)),
        ConflictPolicy::Overwrite,
    );

    let written = writer.write_output(&target, "ours").unwrap();

    assert_eq!(written, target);
    assert_eq!(std::fs::read_to_string(&target).unwrap(), "ours");
}
