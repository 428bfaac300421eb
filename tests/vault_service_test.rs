//! Tests for VaultService

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use tempfile::TempDir;

use notemerge::application::services::VaultService;
use notemerge::application::ApplicationError;
use notemerge::domain::{collect, Entry};
use notemerge::infrastructure::traits::{FileSystem, RealFileSystem};

/// Real filesystem that cannot list folders with the given name.
struct UnlistableFileSystem {
    inner: RealFileSystem,
    deny: &'static str,
}

impl FileSystem for UnlistableFileSystem {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        self.inner.read_to_string(path)
    }
    fn write(&self, path: &Path, content: &str) -> io::Result<()> {
        self.inner.write(path, content)
    }
    fn write_atomic(&self, path: &Path, content: &str) -> io::Result<()> {
        self.inner.write_atomic(path, content)
    }
    fn write_atomic_new(&self, path: &Path, content: &str) -> io::Result<()> {
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
        if path.file_name().is_some_and(|n| n == self.deny) {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"));
        }
        self.inner.list_dir(path)
    }
    fn created(&self, path: &Path) -> io::Result<SystemTime> {
        self.inner.created(path)
    }
    fn ensure_parent(&self, path: &Path) -> io::Result<()> {
        self.inner.ensure_parent(path)
    }
}

fn create_note(dir: &TempDir, rel: &str, content: &str) -> PathBuf {
    let path = dir.path().join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, content).expect("write note");
    path
}

fn vault(dir: &TempDir) -> VaultService {
    VaultService::new(
        Arc::new(RealFileSystem),
        dir.path().to_path_buf(),
        vec!["md".to_string()],
        vec!["node_modules".to_string()],
    )
    .unwrap()
}

#[test]
fn given_folder_when_resolving_then_builds_vault_relative_tree() {
    // Arrange
    let temp = TempDir::new().unwrap();
    create_note(&temp, "Notes/b.md", "b");
    create_note(&temp, "Notes/a.md", "a");
    create_note(&temp, "Notes/Sub/c.md", "c");
    let svc = vault(&temp);

    // Act
    let entries = svc.resolve(&[PathBuf::from("Notes")], true).unwrap();

    // Assert
    assert_eq!(entries.len(), 1);
    let Entry::Folder(folder) = &entries[0] else {
        panic!("expected folder");
    };
    assert_eq!(folder.path, "Notes");
    assert_eq!(folder.name, "Notes");
    let child_paths: Vec<_> = folder.children.iter().map(Entry::path).collect();
    assert_eq!(child_paths, vec!["Notes/Sub", "Notes/a.md", "Notes/b.md"]);

    let nested = collect(&entries, true);
    assert_eq!(nested.len(), 3);
    assert_eq!(nested[2].path, "Notes/Sub/c.md");
    assert_eq!(nested[2].name, "c");
}

#[test]
fn given_non_note_files_and_hidden_folders_when_resolving_then_skips_them() {
    let temp = TempDir::new().unwrap();
    create_note(&temp, "Notes/a.md", "a");
    create_note(&temp, "Notes/image.png", "png");
    create_note(&temp, "Notes/.trash/old.md", "old");
    create_note(&temp, "Notes/node_modules/pkg.md", "pkg");
    let svc = vault(&temp);

    let entries = svc.resolve(&[PathBuf::from("Notes")], true).unwrap();

    let files = collect(&entries, true);
    let paths: Vec<_> = files.iter().map(|f| f.path.as_str()).collect();
    assert_eq!(paths, vec!["Notes/a.md"]);
}

#[test]
fn given_uppercase_extension_when_resolving_then_treated_as_note() {
    let temp = TempDir::new().unwrap();
    create_note(&temp, "README.MD", "readme");
    let svc = vault(&temp);

    let entries = svc.resolve(&[PathBuf::from("README.MD")], false).unwrap();

    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].name(), "README");
}

#[test]
fn given_selected_non_note_file_when_resolving_then_skipped() {
    let temp = TempDir::new().unwrap();
    create_note(&temp, "data.csv", "a,b");
    let svc = vault(&temp);

    let entries = svc.resolve(&[PathBuf::from("data.csv")], false).unwrap();

    assert!(entries.is_empty());
}

#[test]
fn given_path_outside_vault_when_resolving_then_not_in_vault() {
    let outer = TempDir::new().unwrap();
    create_note(&outer, "vault/a.md", "a");
    create_note(&outer, "elsewhere.md", "x");
    let svc = VaultService::new(
        Arc::new(RealFileSystem),
        outer.path().join("vault"),
        vec!["md".to_string()],
        vec![],
    )
    .unwrap();

    let err = svc.resolve(&[PathBuf::from("../elsewhere.md")], false).unwrap_err();

    assert!(matches!(err, ApplicationError::NotInVault { .. }));
}

#[test]
fn given_missing_selection_when_resolving_then_fails_with_path() {
    let temp = TempDir::new().unwrap();
    let svc = vault(&temp);

    let err = svc.resolve(&[PathBuf::from("nope")], false).unwrap_err();

    assert!(err.to_string().contains("nope"));
}

#[test]
fn given_vault_when_listing_folders_then_includes_root_and_skips_hidden() {
    let temp = TempDir::new().unwrap();
    create_note(&temp, "Notes/a.md", "a");
    create_note(&temp, "Notes/Sub/b.md", "b");
    create_note(&temp, ".obsidian/workspace.md", "w");
    let svc = vault(&temp);

    let folders = svc.folders().unwrap();

    assert_eq!(folders, vec![".", "Notes", "Notes/Sub"]);
}

#[cfg(unix)]
#[test]
fn given_symlink_loop_when_resolving_then_terminates() {
    let temp = TempDir::new().unwrap();
    create_note(&temp, "Notes/a.md", "a");
    std::os::unix::fs::symlink(temp.path().join("Notes"), temp.path().join("Notes/loop")).unwrap();
    let svc = vault(&temp);

    let entries = svc.resolve(&[PathBuf::from("Notes")], true).unwrap();

    assert_eq!(collect(&entries, true).len(), 1);
}

#[test]
fn given_unreadable_subfolder_when_resolving_flat_then_only_direct_children_read() {
    // Arrange
    let temp = TempDir::new().unwrap();
    create_note(&temp, "Notes/a.md", "a");
    create_note(&temp, "Notes/private/secret.md", "s");
    let svc = VaultService::new(
        Arc::new(UnlistableFileSystem {
            inner: RealFileSystem,
            deny: "private",
        }),
        temp.path().to_path_buf(),
        vec!["md".to_string()],
        vec![],
    )
    .unwrap();

    // Act
    let entries = svc.resolve(&[PathBuf::from("Notes")], false).unwrap();

    // Assert
    let Entry::Folder(folder) = &entries[0] else {
        panic!("expected folder");
    };
    let child_paths: Vec<_> = folder.children.iter().map(Entry::path).collect();
    assert_eq!(child_paths, vec!["Notes/a.md", "Notes/private"]);
    let files = collect(&entries, false);
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].path, "Notes/a.md");
}

#[test]
fn given_unreadable_subfolder_when_resolving_nested_then_fails_with_folder() {
    let temp = TempDir::new().unwrap();
    create_note(&temp, "Notes/a.md", "a");
    create_note(&temp, "Notes/private/secret.md", "s");
    let svc = VaultService::new(
        Arc::new(UnlistableFileSystem {
            inner: RealFileSystem,
            deny: "private",
        }),
        temp.path().to_path_buf(),
        vec!["md".to_string()],
        vec![],
    )
    .unwrap();

    let err = svc.resolve(&[PathBuf::from("Notes")], true).unwrap_err();

    assert!(err.to_string().contains("private"));
}
