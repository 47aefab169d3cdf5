//! docsite - a documentation site served straight from a tree of markdown
//! files.
//!
//! Nothing is indexed ahead of time: the sidebar tree and keyword search
//! walk the document root on every request, so they always reflect what is
//! on disk.
//!
//! # Quick start
//!
//! ```no_run
//! use docsite::{DocRoot, search::{self, SearchRequest}};
//!
//! let root = DocRoot::resolve(None).unwrap();
//! let request = SearchRequest::new("widget").in_section("guide");
//! let results = search::execute_search(&root, "/docs", &request).unwrap();
//! for r in &results {
//!     println!("{} | {} ({})", r.path, r.title, r.rank);
//! }
//! ```

pub mod cli;
pub mod doc_root;
pub mod document;
pub mod error;
pub mod export;
pub mod front_matter;
pub mod render;
pub mod search;
pub mod server;
pub mod sidebar;
pub mod tree;
pub mod walker;

pub use doc_root::DocRoot;
pub use document::Document;
pub use error::{Error, Result};
pub use export::{Converter, ExportFormat};
pub use tree::DocumentNode;
