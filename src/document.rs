use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use sha2::{Digest, Sha256};

use crate::{
    doc_root::DocRoot,
    error::Result,
    front_matter::{self, FrontMatter},
    render::{escape_html, render_markdown},
};

/// Front-matter key holding a document's password.
pub const PASSWORD_KEY: &str = "password";

/// A markdown document loaded from inside the document root.
#[derive(Debug, Clone)]
pub struct Document {
    relative: String,
    path: PathBuf,
    meta: FrontMatter,
    text: String,
    body_start: usize,
}

/// Outcome of presenting a credential to a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// The document is public or the credential matched.
    Granted,
    /// The document is protected and no credential was given.
    Required,
    /// The document is protected and the credential did not match.
    Rejected,
}

impl Document {
    /// Load the document at root-relative path `relative`.
    ///
    /// Fails with `InvalidPath` unless the path names an existing `.md` file
    /// inside the root.
    pub fn open(root: &DocRoot, relative: &str) -> Result<Self> {
        let path = root.resolve_document(relative)?;
        let relative = root
            .relative(&path)
            .unwrap_or_else(|| relative.trim_start_matches('/').to_string());

        let bytes = std::fs::read(&path)?;
        let text = String::from_utf8_lossy(&bytes).into_owned();
        let (meta, body) = front_matter::split(&text);
        let body_start = text.len() - body.len();

        Ok(Self {
            relative,
            path,
            meta,
            text,
            body_start,
        })
    }

    /// Root-relative path, `/`-separated.
    pub fn relative(&self) -> &str {
        &self.relative
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn front_matter(&self) -> &FrontMatter {
        &self.meta
    }

    /// Markdown body with the front-matter removed.
    pub fn body(&self) -> &str {
        &self.text[self.body_start..]
    }

    /// File name without the `.md` extension.
    pub fn stem(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string())
    }

    /// Display title, falling back to the file stem.
    pub fn title(&self) -> String {
        front_matter::title_from_reader(self.text.as_bytes())
            .unwrap_or_else(|| self.stem())
    }

    pub fn password(&self) -> Option<&str> {
        self.meta.get(PASSWORD_KEY)
    }

    pub fn is_protected(&self) -> bool {
        self.password().is_some()
    }

    /// Check `credential` against the document's password.
    ///
    /// Both sides are hashed before comparing so the comparison takes the
    /// same time regardless of where, or whether, they differ.
    pub fn unlock(&self, credential: Option<&str>) -> Access {
        let Some(password) = self.password() else {
            return Access::Granted;
        };
        match credential {
            None | Some("") => Access::Required,
            Some(given) if constant_time_eq(password, given) => Access::Granted,
            Some(_) => Access::Rejected,
        }
    }

    /// URL of the directory containing this document.
    pub fn base_url(&self, url_prefix: &str) -> String {
        let prefix = url_prefix.trim_end_matches('/');
        match self.relative.rsplit_once('/') {
            Some((dir, _)) => format!("{prefix}/{dir}"),
            None => prefix.to_string(),
        }
    }

    /// Render the body to HTML, with relative links rebased under
    /// `url_prefix`.
    pub fn to_html(&self, url_prefix: &str) -> String {
        render_markdown(self.body(), &self.base_url(url_prefix))
    }
}

/// Whether the markdown file at `path` carries a password.
///
/// Only the front-matter block is read.
pub fn is_protected_file(path: &Path) -> Result<bool> {
    let file = File::open(path)?;
    let meta = FrontMatter::parse(BufReader::new(file))?;
    Ok(meta.get(PASSWORD_KEY).is_some())
}

fn constant_time_eq(expected: &str, given: &str) -> bool {
    let a = Sha256::digest(expected.as_bytes());
    let b = Sha256::digest(given.as_bytes());
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// HTML fragment for the main content area.
///
/// Unless access is granted this is a password prompt and never contains
/// any part of the body.
pub fn render_page(
    document: &Document,
    credential: Option<&str>,
    url_prefix: &str,
) -> String {
    match document.unlock(credential) {
        Access::Granted => {
            let mut html = document.to_html(url_prefix);
            html.push_str(&download_links(document, credential));
            html
        }
        Access::Required => password_form(document, false),
        Access::Rejected => password_form(document, true),
    }
}

fn password_form(document: &Document, rejected: bool) -> String {
    let notice = if rejected {
        "<p class='error'>Incorrect password. Please try again.</p>\n"
    } else {
        ""
    };
    format!(
        "<h1>Enter Password:</h1>\n\
         <p>This file is password protected.</p>\n\
         {notice}\
         <form method='post' action='/render' hx-post='/render' \
         hx-target='main' hx-swap='innerHTML'>\n\
         <input type='hidden' name='file' value='{file}'>\n\
         <input type='password' id='password' name='password' \
         placeholder='Enter password' required>\n\
         <button type='submit' id='password-submit'>Submit</button>\n\
         </form>\n",
        file = escape_html(document.relative()),
    )
}

const FORMATS: &[(&str, &str)] =
    &[("pdf", "PDF"), ("markdown", "MD"), ("html", "HTML")];

fn download_links(document: &Document, credential: Option<&str>) -> String {
    let mut html = String::from(
        "<div id='download-container'>\n<div id='download-options'>\n<ul>\n",
    );

    if document.is_protected() {
        // Protected documents post the credential instead of putting it in
        // a URL.
        let file = escape_html(document.relative());
        let password = escape_html(credential.unwrap_or_default());
        for (format, label) in FORMATS {
            html.push_str(&format!(
                "<li><form method='post' action='/download'>\
                 <input type='hidden' name='file' value='{file}'>\
                 <input type='hidden' name='format' value='{format}'>\
                 <input type='hidden' name='password' value='{password}'>\
                 <button type='submit' title='Download as {label}'>{label}</button>\
                 </form></li>\n"
            ));
        }
    } else {
        let file = utf8_percent_encode(document.relative(), NON_ALPHANUMERIC);
        for (format, label) in FORMATS {
            html.push_str(&format!(
                "<li><a href='/download?file={file}&amp;format={format}' \
                 title='Download as {label}'>{label}</a></li>\n"
            ));
        }
    }

    html.push_str("</ul>\n</div>\n</div>\n");
    html
}
