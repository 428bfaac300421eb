//! Note collection: flattens selected entries into mergeable files

use std::collections::HashSet;

use tracing::debug;

use crate::domain::{Entry, FileRef, FolderRef};

/// Flatten entries into the files to merge.
///
/// Files are taken as-is; folders contribute their direct file children, and
/// their sub-folders only when `include_nested_folders` is set. Each path
/// appears once, at its first-seen position.
pub fn collect(entries: &[Entry], include_nested_folders: bool) -> Vec<FileRef> {
    let mut seen = HashSet::new();
    let mut files = Vec::new();

    for entry in entries {
        match entry {
            Entry::File(file) => push_unique(&mut files, &mut seen, file),
            Entry::Folder(folder) => {
                collect_folder(folder, include_nested_folders, &mut files, &mut seen)
            }
        }
    }

    debug!(
        "collect: {} entries -> {} files (nested={})",
        entries.len(),
        files.len(),
        include_nested_folders
    );
    files
}

fn collect_folder<'a>(
    folder: &'a FolderRef,
    include_nested_folders: bool,
    files: &mut Vec<FileRef>,
    seen: &mut HashSet<&'a str>,
) {
    // direct files first, then descend
    for child in &folder.children {
        if let Entry::File(file) = child {
            push_unique(files, seen, file);
        }
    }

    if !include_nested_folders {
        return;
    }

    for child in &folder.children {
        if let Entry::Folder(sub) = child {
            collect_folder(sub, include_nested_folders, files, seen);
        }
    }
}

fn push_unique<'a>(files: &mut Vec<FileRef>, seen: &mut HashSet<&'a str>, file: &'a FileRef) {
    if seen.insert(file.path.as_str()) {
        files.push(file.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn file(path: &str) -> FileRef {
        let name = path
            .rsplit('/')
            .next()
            .unwrap_or(path)
            .trim_end_matches(".md");
        FileRef::new(path, name, Utc.timestamp_opt(0, 0).unwrap())
    }

    fn paths(files: &[FileRef]) -> Vec<&str> {
        files.iter().map(|f| f.path.as_str()).collect()
    }

    #[test]
    fn given_no_entries_when_collecting_then_returns_empty() {
        assert!(collect(&[], false).is_empty());
        assert!(collect(&[], true).is_empty());
    }

    #[test]
    fn given_file_selected_twice_when_collecting_then_keeps_first() {
        let entries = vec![
            Entry::File(file("b.md")),
            Entry::Folder(FolderRef::new(
                "dir",
                "dir",
                vec![file("dir/a.md").into(), file("b.md").into()],
            )),
            Entry::File(file("dir/a.md")),
        ];

        let result = collect(&entries, false);

        assert_eq!(paths(&result), vec!["b.md", "dir/a.md"]);
    }

    #[test]
    fn given_nested_folder_when_recursion_disabled_then_skips_subfolder() {
        let nested = FolderRef::new("top/sub", "sub", vec![file("top/sub/deep.md").into()]);
        let top = FolderRef::new(
            "top",
            "top",
            vec![nested.into(), file("top/shallow.md").into()],
        );

        let flat = collect(&[top.clone().into()], false);
        let deep = collect(&[top.into()], true);

        assert_eq!(paths(&flat), vec!["top/shallow.md"]);
        assert_eq!(paths(&deep), vec!["top/shallow.md", "top/sub/deep.md"]);
    }

    #[test]
    fn given_empty_folder_when_collecting_then_contributes_nothing() {
        let empty = FolderRef::new("empty", "empty", vec![]);
        assert!(collect(&[empty.into()], true).is_empty());
    }
}
