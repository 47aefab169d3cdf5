//! The document tree shown in the sidebar.
//!
//! Unlike [`crate::walker`], the tree keeps directory structure and drops
//! any directory that has no markdown document somewhere beneath it.

use std::path::{Path, PathBuf};

use crate::{
    front_matter,
    walker::{EntryKind, classify_entry},
};

/// One entry of the document tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentNode {
    Directory {
        name: String,
        children: Vec<DocumentNode>,
    },
    Document {
        name: String,
        /// Path relative to the directory the tree was built from.
        relative_path: PathBuf,
    },
}

impl DocumentNode {
    pub fn name(&self) -> &str {
        match self {
            DocumentNode::Directory { name, .. }
            | DocumentNode::Document { name, .. } => name,
        }
    }

    /// Display title of a document, falling back to its file stem.
    ///
    /// `base` must be the directory the tree was built from. Titles are
    /// read on demand, so building a tree never opens a document. Returns
    /// `None` for directories.
    pub fn title(&self, base: &Path) -> Option<String> {
        match self {
            DocumentNode::Directory { .. } => None,
            DocumentNode::Document {
                name,
                relative_path,
            } => Some(
                front_matter::resolve_title(&base.join(relative_path))
                    .unwrap_or_else(|| file_stem(name)),
            ),
        }
    }

    /// Number of documents in this subtree.
    pub fn document_count(&self) -> usize {
        match self {
            DocumentNode::Directory { children, .. } => {
                children.iter().map(DocumentNode::document_count).sum()
            }
            DocumentNode::Document { .. } => 1,
        }
    }
}

/// Build the pruned tree of documents below `root`.
///
/// Siblings are sorted by name. Entries are accepted by the same rule the
/// search walker uses, with `root` as the containment boundary for
/// symlinks. A root that is missing or not a directory yields an empty
/// tree.
pub fn build_tree(root: &Path) -> Vec<DocumentNode> {
    let Ok(canonical) = root.canonicalize() else {
        return Vec::new();
    };
    if !canonical.is_dir() {
        return Vec::new();
    }
    scan(&canonical, &canonical, Path::new(""))
}

fn scan(root: &Path, dir: &Path, relative: &Path) -> Vec<DocumentNode> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::debug!(
                path = %dir.display(),
                error = %e,
                "skipping unreadable directory"
            );
            return Vec::new();
        }
    };

    let mut entries: Vec<_> = entries.filter_map(|e| e.ok()).collect();
    entries.sort_by_key(|e| e.file_name());

    let mut nodes = Vec::new();
    for entry in entries {
        let name = entry.file_name().to_string_lossy().into_owned();
        let child_relative = relative.join(&name);

        match classify_entry(root, &entry) {
            EntryKind::Directory(path) => {
                let children = scan(root, &path, &child_relative);
                if !children.is_empty() {
                    nodes.push(DocumentNode::Directory { name, children });
                }
            }
            EntryKind::Document { .. } => {
                nodes.push(DocumentNode::Document {
                    name,
                    relative_path: child_relative,
                });
            }
            EntryKind::Other => {}
        }
    }
    nodes
}

fn file_stem(name: &str) -> String {
    Path::new(name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| name.to_string())
}
