use std::path::Path;

use rayon::prelude::*;
use serde::Serialize;

use crate::{
    doc_root::DocRoot,
    error::{Error, Result},
    front_matter,
    walker::{self, DiscoveredFile},
};

/// Score awarded when the query appears in the file name.
pub const FILENAME_WEIGHT: u32 = 10;
/// Score awarded when the query appears in any heading.
pub const HEADING_WEIGHT: u32 = 7;
/// Score awarded when the query appears anywhere in the document.
pub const CONTENT_WEIGHT: u32 = 3;

/// Title reported for documents without a title signal.
pub const NO_TITLE: &str = "(No Title)";

/// What to search for, and where.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchRequest {
    pub query: String,
    /// Section to restrict the search to. `None` searches the whole root.
    pub section: Option<String>,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            section: None,
        }
    }

    /// Restrict the search to `section`. A blank section means the root.
    pub fn in_section(mut self, section: impl Into<String>) -> Self {
        let section = section.into();
        self.section = (!section.trim().is_empty()).then_some(section);
        self
    }
}

/// A ranked search hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchResult {
    /// Root-relative path with the URL prefix prepended.
    pub path: String,
    pub title: String,
    pub rank: u32,
}

/// Run a keyword search over the documents under `root`.
///
/// 1. Validate the query and optional section
/// 2. Walk every markdown file below the section
/// 3. Score each file and drop zero scores
/// 4. Stable-sort by descending rank, so ties keep walk order
pub fn execute_search(
    root: &DocRoot,
    url_prefix: &str,
    request: &SearchRequest,
) -> Result<Vec<SearchResult>> {
    let query = request.query.trim();
    let section = request.section.as_deref();
    if query.is_empty() {
        return Err(Error::EmptyQuery);
    }
    let query_lower = query.to_lowercase();

    let section_path = match section {
        Some(section) => root.resolve_section(section)?,
        None => root.path().to_path_buf(),
    };

    let files = walker::discover_markdown(&section_path)
        .map_err(|_| Error::InvalidSection(section.unwrap_or_default().into()))?;
    tracing::debug!(
        query,
        section = section.unwrap_or(""),
        candidates = files.len(),
        "scoring search candidates"
    );

    let prefix = url_prefix.trim_end_matches('/');
    let mut results: Vec<SearchResult> = files
        .par_iter()
        .filter_map(|file| {
            score_file(root, &section_path, prefix, file, &query_lower)
        })
        .collect();

    results.sort_by(|a, b| b.rank.cmp(&a.rank));
    Ok(results)
}

fn score_file(
    root: &DocRoot,
    section_path: &Path,
    prefix: &str,
    file: &DiscoveredFile,
    query_lower: &str,
) -> Option<SearchResult> {
    let relative = root.relative(&section_path.join(&file.relative_path))?;
    let bytes = match std::fs::read(&file.absolute_path) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::debug!(
                path = %file.absolute_path.display(),
                error = %e,
                "skipping unreadable document"
            );
            return None;
        }
    };
    let content = String::from_utf8_lossy(&bytes);

    let stem = file
        .relative_path
        .file_stem()
        .map(|s| s.to_string_lossy())
        .unwrap_or_default();

    let rank = score(&stem, &content, query_lower);
    if rank == 0 {
        return None;
    }

    let title = front_matter::title_from_reader(content.as_bytes())
        .unwrap_or_else(|| NO_TITLE.to_string());

    Some(SearchResult {
        path: format!("{prefix}/{relative}"),
        title,
        rank,
    })
}

/// Relevance of one document. `query_lower` must already be lowercased.
///
/// Each signal counts at most once, however often the query matches.
pub fn score(file_stem: &str, content: &str, query_lower: &str) -> u32 {
    let mut rank = 0;

    if file_stem.to_lowercase().contains(query_lower) {
        rank += FILENAME_WEIGHT;
    }

    if content
        .lines()
        .filter_map(heading_text)
        .any(|heading| heading.to_lowercase().contains(query_lower))
    {
        rank += HEADING_WEIGHT;
    }

    if content.to_lowercase().contains(query_lower) {
        rank += CONTENT_WEIGHT;
    }

    rank
}

/// Text of a markdown heading of any level: one or more `#` at the start of
/// the line followed by whitespace.
pub fn heading_text(line: &str) -> Option<&str> {
    let rest = line.trim_start_matches('#');
    if rest.len() == line.len() || !rest.starts_with(char::is_whitespace) {
        return None;
    }
    Some(rest.trim())
}

/// Format results as `path | title` lines, one per result.
pub fn format_lines(results: &[SearchResult]) -> String {
    let mut out = String::new();
    for r in results {
        out.push_str(&r.path);
        out.push_str(" | ");
        out.push_str(&r.title);
        out.push('\n');
    }
    out
}

/// Format results for human-readable terminal output.
pub fn format_human(results: &[SearchResult]) {
    if results.is_empty() {
        println!("No results found.");
        return;
    }

    for (i, r) in results.iter().enumerate() {
        println!("{:>3}. [{:>2}] {}", i + 1, r.rank, r.path);
        println!("     {}", r.title);
    }
    println!("\n{} result(s)", results.len());
}

/// Format results as a JSON document.
pub fn format_json(results: &[SearchResult], query: &str) -> String {
    serde_json::json!({
        "query": query,
        "result_count": results.len(),
        "results": results,
    })
    .to_string()
}
