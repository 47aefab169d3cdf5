use std::path::{Path, PathBuf};

use crate::{doc_root::is_markdown, error::Result};

/// A discovered markdown document.
#[derive(Debug, Clone)]
pub struct DiscoveredFile {
    /// Path relative to the walked directory.
    pub relative_path: PathBuf,
    /// Fully resolved absolute path.
    pub absolute_path: PathBuf,
}

/// Recursively walk a directory and discover every markdown document.
///
/// Files are matched on the exact `.md` extension. Symlinked files are
/// followed only when they resolve back inside `root`; symlinked
/// directories are never traversed. Subdirectories that cannot be read are
/// skipped. Results are sorted by relative path.
pub fn discover_markdown(root: &Path) -> Result<Vec<DiscoveredFile>> {
    let canonical_root = root.canonicalize()?;
    let mut results = Vec::new();
    for entry in std::fs::read_dir(&canonical_root)? {
        visit(&canonical_root, entry, &mut results);
    }
    results.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
    Ok(results)
}

fn walk_dir(root: &Path, current: &Path, results: &mut Vec<DiscoveredFile>) {
    let entries = match std::fs::read_dir(current) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::debug!(
                path = %current.display(),
                error = %e,
                "skipping unreadable directory"
            );
            return;
        }
    };

    for entry in entries {
        visit(root, entry, results);
    }
}

fn visit(
    root: &Path,
    entry: std::io::Result<std::fs::DirEntry>,
    results: &mut Vec<DiscoveredFile>,
) {
    let Ok(entry) = entry else {
        return;
    };

    match classify_entry(root, &entry) {
        EntryKind::Directory(path) => walk_dir(root, &path, results),
        EntryKind::Document { path, resolved } => {
            results.push(make_discovered(root, &path, resolved));
        }
        EntryKind::Other => {}
    }
}

/// How a directory entry takes part in a document listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum EntryKind {
    /// A real directory (never a symlink to one).
    Directory(PathBuf),
    /// A markdown document. `resolved` is the canonical target for
    /// symlinks and the entry path otherwise.
    Document { path: PathBuf, resolved: PathBuf },
    Other,
}

/// Classify `entry` under the canonical directory `root`.
///
/// Documents are regular `.md` files, or `.md` symlinks whose target is a
/// regular file inside `root`. Broken links, links leaving `root`, FIFOs,
/// sockets and devices are `Other`.
pub(crate) fn classify_entry(
    root: &Path,
    entry: &std::fs::DirEntry,
) -> EntryKind {
    let Ok(file_type) = entry.file_type() else {
        return EntryKind::Other;
    };
    let path = entry.path();

    if file_type.is_dir() {
        return EntryKind::Directory(path);
    }
    if !is_markdown(&path) {
        return EntryKind::Other;
    }

    if file_type.is_symlink() {
        let Ok(resolved) = path.canonicalize() else {
            return EntryKind::Other;
        };
        if resolved.starts_with(root) && resolved.is_file() {
            return EntryKind::Document { path, resolved };
        }
        EntryKind::Other
    } else if file_type.is_file() {
        EntryKind::Document {
            resolved: path.clone(),
            path,
        }
    } else {
        EntryKind::Other
    }
}

fn make_discovered(
    root: &Path,
    original_path: &Path,
    absolute_path: PathBuf,
) -> DiscoveredFile {
    let relative_path = original_path
        .strip_prefix(root)
        .unwrap_or(original_path)
        .to_path_buf();

    DiscoveredFile {
        relative_path,
        absolute_path,
    }
}
