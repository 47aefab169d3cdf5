use std::path::Path;

use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};

use crate::{
    doc_root::{DocRoot, join_components},
    render::escape_html,
    tree::{self, DocumentNode},
};

/// Render the sidebar for `section` as a nested HTML list.
///
/// Each document links to `/?section=<section>&file=<path>`, where `path`
/// is relative to the document root. The link whose path equals
/// `current_file` is marked `active`. An unknown or invalid section renders
/// nothing.
pub fn render_sidebar(
    root: &DocRoot,
    section: &str,
    current_file: Option<&str>,
) -> String {
    let section = section.trim().trim_matches('/');
    if section.is_empty() {
        return String::new();
    }
    let Ok(section_dir) = root.resolve_section(section) else {
        return String::new();
    };

    let nodes = tree::build_tree(&section_dir);
    if nodes.is_empty() {
        return String::new();
    }

    let current = current_file.map(|f| f.trim().trim_start_matches('/'));
    let ctx = Context {
        section_dir: &section_dir,
        section_prefix: root.relative(&section_dir).unwrap_or_default(),
        section_param: utf8_percent_encode(section, NON_ALPHANUMERIC)
            .to_string(),
        current,
    };

    let mut html = String::from("<aside class='sidebar'>\n<h1>Directory</h1>\n");
    write_list(&mut html, &nodes, &ctx);
    html.push_str("<div class='sidebar-padding'></div>\n</aside>\n");
    html
}

struct Context<'a> {
    section_dir: &'a Path,
    /// Root-relative path of the section directory.
    section_prefix: String,
    section_param: String,
    current: Option<&'a str>,
}

fn write_list(html: &mut String, nodes: &[DocumentNode], ctx: &Context<'_>) {
    html.push_str("<ul class='sidebar-list'>\n");
    for node in nodes {
        match node {
            DocumentNode::Directory { name, children } => {
                html.push_str(&format!(
                    "<li class='directory'>\n<span class='directory-name'>{}</span>\n\
                     <div class='sub-list'>\n",
                    escape_html(name)
                ));
                write_list(html, children, ctx);
                html.push_str("</div>\n</li>\n");
            }
            DocumentNode::Document { relative_path, .. } => {
                let file = document_path(&ctx.section_prefix, relative_path);
                let title = node.title(ctx.section_dir).unwrap_or_default();
                let class = if ctx.current == Some(file.as_str()) {
                    "sidebar-link active"
                } else {
                    "sidebar-link"
                };
                html.push_str(&format!(
                    "<li><a href='/?section={}&amp;file={}' class='{class}'>{}</a></li>\n",
                    ctx.section_param,
                    utf8_percent_encode(&file, NON_ALPHANUMERIC),
                    escape_html(&title),
                ));
            }
        }
    }
    html.push_str("</ul>\n");
}

fn document_path(section_prefix: &str, relative: &Path) -> String {
    let relative = join_components(relative);
    if section_prefix.is_empty() {
        relative
    } else {
        format!("{section_prefix}/{relative}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> (tempfile::TempDir, DocRoot) {
        let tmp = tempfile::tempdir().unwrap();
        let notes = tmp.path().join("notes");
        std::fs::create_dir_all(notes.join("week 1")).unwrap();
        std::fs::create_dir_all(notes.join("empty")).unwrap();
        std::fs::write(notes.join("week 1/lab.md"), "# Lab <One>").unwrap();
        std::fs::write(notes.join("overview.md"), "plain").unwrap();
        let root = DocRoot::open(tmp.path()).unwrap();
        (tmp, root)
    }

    #[test]
    fn renders_nested_links() {
        let (_tmp, root) = fixture();
        let html = render_sidebar(&root, "notes", None);

        assert!(html.contains("<span class='directory-name'>week 1</span>"));
        assert!(!html.contains("empty"));
        assert!(html.contains(
            "href='/?section=notes&amp;file=notes%2Fweek%201%2Flab%2Emd'"
        ));
        assert!(html.contains(">Lab &lt;One&gt;</a>"));
        assert!(html.contains(">overview</a>"));
        assert!(!html.contains("active"));
    }

    #[test]
    fn marks_current_document() {
        let (_tmp, root) = fixture();
        let html = render_sidebar(&root, "notes", Some("/notes/overview.md"));

        assert!(html.contains(
            "class='sidebar-link active'>overview</a>"
        ));
        assert_eq!(html.matches("active").count(), 1);
    }

    #[test]
    fn invalid_section_renders_nothing() {
        let (_tmp, root) = fixture();
        assert_eq!(render_sidebar(&root, "missing", None), "");
        assert_eq!(render_sidebar(&root, "../..", None), "");
        assert_eq!(render_sidebar(&root, "", None), "");
        assert_eq!(render_sidebar(&root, "notes/empty", None), "");
    }

    #[cfg(unix)]
    #[test]
    fn skips_links_outside_root_and_broken_links() {
        let outside = tempfile::tempdir().unwrap();
        std::fs::write(outside.path().join("private.md"), "# Outside Heading")
            .unwrap();

        let (tmp, root) = fixture();
        let notes = tmp.path().join("notes");
        std::os::unix::fs::symlink(
            outside.path().join("private.md"),
            notes.join("leak.md"),
        )
        .unwrap();
        std::fs::create_dir(notes.join("dangling")).unwrap();
        std::os::unix::fs::symlink(
            notes.join("missing.md"),
            notes.join("dangling/broken.md"),
        )
        .unwrap();

        let html = render_sidebar(&root, "notes", None);
        assert!(!html.contains("Outside Heading"));
        assert!(!html.contains("leak"));
        assert!(!html.contains("dangling"));
        assert!(!html.contains("broken"));
        assert!(html.contains(">overview</a>"));
    }
}

