//! Tree rendering of merge entries

use std::collections::HashMap;

use termtree::Tree;

use crate::domain::{Entry, FileRef, FolderRef};

/// Renders entries as a `termtree` tree.
///
/// Notes show their 1-based merge position when they take part in the merge.
/// Folders outside the depth bound are shown collapsed.
pub trait ToTree {
    fn to_tree(&self, positions: &HashMap<&str, usize>, nested: bool) -> Tree<String>;
}

impl ToTree for FileRef {
    fn to_tree(&self, positions: &HashMap<&str, usize>, _nested: bool) -> Tree<String> {
        let label = match positions.get(self.path.as_str()) {
            Some(pos) => format!("{} [{}]", self.name, pos),
            None => self.name.clone(),
        };
        Tree::new(label)
    }
}

impl ToTree for FolderRef {
    fn to_tree(&self, positions: &HashMap<&str, usize>, nested: bool) -> Tree<String> {
        let leaves: Vec<_> = self
            .children
            .iter()
            .map(|child| match child {
                Entry::File(f) => f.to_tree(positions, nested),
                Entry::Folder(sub) if nested => sub.to_tree(positions, nested),
                Entry::Folder(sub) => Tree::new(format!("{}/ (not included)", sub.name)),
            })
            .collect();

        Tree::new(format!("{}/", self.name)).with_leaves(leaves)
    }
}

impl ToTree for Entry {
    fn to_tree(&self, positions: &HashMap<&str, usize>, nested: bool) -> Tree<String> {
        match self {
            Entry::File(f) => f.to_tree(positions, nested),
            Entry::Folder(d) => d.to_tree(positions, nested),
        }
    }
}

/// Map from note path to its 1-based merge position.
pub fn positions(ordered: &[FileRef]) -> HashMap<&str, usize> {
    ordered
        .iter()
        .enumerate()
        .map(|(i, f)| (f.path.as_str(), i + 1))
        .collect()
}
