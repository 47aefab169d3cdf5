use pulldown_cmark::{CowStr, Event, Options, Parser, Tag, html};

/// Render markdown to HTML for display on the site.
///
/// Relative link and image destinations are rewritten to start with
/// `base_path` (the URL of the directory holding the document) so they
/// resolve no matter which page embeds the fragment. Raw HTML in the
/// document is passed through unchanged.
pub fn render_markdown(markdown: &str, base_path: &str) -> String {
    render(markdown, Some(base_path.trim_end_matches('/')))
}

/// Render markdown to HTML without touching any link.
pub fn markdown_to_html(markdown: &str) -> String {
    render(markdown, None)
}

fn render(markdown: &str, base: Option<&str>) -> String {
    let mut opts = Options::empty();
    opts.insert(Options::ENABLE_STRIKETHROUGH);
    opts.insert(Options::ENABLE_TABLES);
    opts.insert(Options::ENABLE_FOOTNOTES);
    opts.insert(Options::ENABLE_TASKLISTS);
    opts.insert(Options::ENABLE_SMART_PUNCTUATION);

    let parser = Parser::new_ext(markdown, opts).map(|event| match event {
        Event::Start(Tag::Link {
            link_type,
            dest_url,
            title,
            id,
        }) => Event::Start(Tag::Link {
            link_type,
            dest_url: rebase(dest_url, base),
            title,
            id,
        }),
        Event::Start(Tag::Image {
            link_type,
            dest_url,
            title,
            id,
        }) => Event::Start(Tag::Image {
            link_type,
            dest_url: rebase(dest_url, base),
            title,
            id,
        }),
        other => other,
    });

    let mut html_output = String::new();
    html::push_html(&mut html_output, parser);
    html_output
}

fn rebase<'a>(url: CowStr<'a>, base: Option<&str>) -> CowStr<'a> {
    match base {
        Some(base) if is_relative(&url) => {
            CowStr::from(format!("{base}/{}", &*url))
        }
        _ => url,
    }
}

/// Whether a link destination is relative to the current document.
///
/// Absolute paths, scheme-relative URLs, fragments, and anything carrying a
/// URL scheme (`https:`, `mailto:`, ...) are left alone.
fn is_relative(url: &str) -> bool {
    if url.is_empty() || url.starts_with('/') || url.starts_with('#') {
        return false;
    }
    match url.find(':') {
        Some(colon) => {
            let scheme = &url[..colon];
            // `a/b:c` is a path, not a scheme.
            scheme.contains(['/', '?', '#'])
                || !scheme
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || "+-.".contains(c))
        }
        None => true,
    }
}

/// Escape text for inclusion in HTML content or attribute values.
pub fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
