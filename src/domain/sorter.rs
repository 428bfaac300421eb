//! Note ordering

use std::cmp::Ordering;

use tracing::debug;

use crate::domain::{FileRef, LogicalOrder, SortMode};

/// Return `files` reordered according to `mode`.
///
/// The input is left untouched. Every mode is a total order with `path` as the
/// final tie-breaker, so the same file set always sorts the same way
/// regardless of input order. `logical` is only consulted for
/// `SortMode::Logical`.
pub fn sort(files: &[FileRef], mode: SortMode, logical: &dyn LogicalOrder) -> Vec<FileRef> {
    debug!("sort: {} files, mode={}", files.len(), mode);
    let mut sorted = files.to_vec();
    match mode {
        SortMode::Alphabetical => sorted.sort_by(compare_alphabetical),
        SortMode::CreationDate => sorted.sort_by(compare_creation_date),
        SortMode::Logical => {
            sorted.sort_by(|a, b| logical.compare(a, b).then_with(|| a.path.cmp(&b.path)))
        }
    }
    sorted
}

/// Case-insensitive, locale-independent name comparison.
///
/// Names are lowercased (Unicode simple lowercase) and compared by code point.
pub fn compare_names(a: &str, b: &str) -> Ordering {
    a.chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase))
}

pub fn compare_alphabetical(a: &FileRef, b: &FileRef) -> Ordering {
    compare_names(&a.name, &b.name).then_with(|| a.path.cmp(&b.path))
}

pub fn compare_creation_date(a: &FileRef, b: &FileRef) -> Ordering {
    a.created_at
        .cmp(&b.created_at)
        .then_with(|| compare_alphabetical(a, b))
}
