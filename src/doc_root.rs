use std::path::{Component, Path, PathBuf};

use crate::error::{Error, Result};

/// Environment variable consulted when no explicit root is given.
pub const ROOT_ENV: &str = "DOCSITE_ROOT";

/// Directory used when neither a flag nor the environment names a root.
pub const DEFAULT_ROOT: &str = "docs";

/// The directory all browsable documents live under.
///
/// Every path handed in by a client is resolved through this type so that
/// nothing outside the canonical root can be read.
#[derive(Debug, Clone)]
pub struct DocRoot {
    root: PathBuf,
}

impl DocRoot {
    /// Resolve the document root from, in order of priority:
    /// 1. An explicit path (from --root)
    /// 2. The DOCSITE_ROOT environment variable
    /// 3. `./docs`
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        let root = if let Some(path) = explicit {
            path.to_path_buf()
        } else if let Ok(val) = std::env::var(ROOT_ENV) {
            PathBuf::from(val)
        } else {
            PathBuf::from(DEFAULT_ROOT)
        };

        Self::open(&root)
    }

    /// Open an existing directory as the document root.
    pub fn open(path: &Path) -> Result<Self> {
        if !path.is_dir() {
            return Err(Error::Config(format!(
                "document root is not a directory: {}",
                path.display()
            )));
        }

        let root = path.canonicalize().map_err(|e| {
            Error::Config(format!(
                "cannot resolve document root {}: {e}",
                path.display()
            ))
        })?;

        Ok(Self { root })
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Resolve a section name to a directory inside the root.
    ///
    /// An empty section (or one made only of slashes) is the root itself.
    pub fn resolve_section(&self, section: &str) -> Result<PathBuf> {
        let trimmed = section.trim().trim_matches('/');
        if trimmed.is_empty() {
            return Ok(self.root.clone());
        }

        let resolved = self
            .contained(trimmed)
            .ok_or_else(|| Error::InvalidSection(section.to_string()))?;

        if !resolved.is_dir() {
            return Err(Error::InvalidSection(section.to_string()));
        }
        Ok(resolved)
    }

    /// Resolve a root-relative document path to a markdown file inside the
    /// root.
    pub fn resolve_document(&self, relative: &str) -> Result<PathBuf> {
        let trimmed = relative.trim().trim_start_matches('/');
        if trimmed.is_empty() {
            return Err(Error::InvalidPath(relative.to_string()));
        }

        let resolved = self
            .contained(trimmed)
            .ok_or_else(|| Error::InvalidPath(relative.to_string()))?;

        if !resolved.is_file() || !is_markdown(&resolved) {
            return Err(Error::InvalidPath(relative.to_string()));
        }
        Ok(resolved)
    }

    /// Resolve a root-relative path to any regular file inside the root.
    pub fn resolve_file(&self, relative: &str) -> Result<PathBuf> {
        let trimmed = relative.trim().trim_start_matches('/');
        let resolved = self
            .contained(trimmed)
            .filter(|p| p.is_file())
            .ok_or_else(|| Error::InvalidPath(relative.to_string()))?;
        Ok(resolved)
    }

    /// Root-relative form of `path`, joined with `/` on every platform.
    ///
    /// Returns `None` when `path` is not under the root.
    pub fn relative(&self, path: &Path) -> Option<String> {
        let stripped = path.strip_prefix(&self.root).ok()?;
        Some(join_components(stripped))
    }

    /// Canonicalise `relative` against the root and return it only when the
    /// result still lies inside the root. Symlinks are resolved before the
    /// check, so a link pointing elsewhere is rejected.
    fn contained(&self, relative: &str) -> Option<PathBuf> {
        let candidate = Path::new(relative);
        if candidate.is_absolute() {
            return None;
        }
        let resolved = self.root.join(candidate).canonicalize().ok()?;
        resolved.starts_with(&self.root).then_some(resolved)
    }
}

/// Whether a path names a markdown document. The match is case-sensitive.
pub fn is_markdown(path: &Path) -> bool {
    path.extension().and_then(|ext| ext.to_str()) == Some("md")
}

pub(crate) fn join_components(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
