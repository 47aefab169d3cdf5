//! Front-matter handling for markdown documents.
//!
//! A front-matter block is a run of `key: value` lines fenced by `---`
//! lines. It is only recognised at the top of a document (blank lines may
//! precede it); a `---` anywhere later is an ordinary thematic break.
//! A block that is never closed extends to the end of the file.

use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};

const DELIMITER: &str = "---";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Nothing but blank lines seen so far.
    Preamble,
    /// Between the opening and closing delimiters.
    Inside,
    /// Past the block, or the document never had one.
    Body,
}

/// Classification of a single line by [`Scanner`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Line<'a> {
    /// Blank line before any content.
    Blank,
    Open,
    Close,
    /// Trimmed line inside the block.
    Field(&'a str),
    /// Trimmed line outside the block.
    Body(&'a str),
}

/// Line-at-a-time front-matter state machine.
#[derive(Debug)]
pub(crate) struct Scanner {
    state: State,
}

impl Scanner {
    pub(crate) fn new() -> Self {
        Self {
            state: State::Preamble,
        }
    }

    pub(crate) fn classify<'a>(&mut self, line: &'a str) -> Line<'a> {
        let trimmed = line.trim();
        match self.state {
            State::Preamble if trimmed.is_empty() => Line::Blank,
            State::Preamble if trimmed == DELIMITER => {
                self.state = State::Inside;
                Line::Open
            }
            State::Preamble => {
                self.state = State::Body;
                Line::Body(trimmed)
            }
            State::Inside if trimmed == DELIMITER => {
                self.state = State::Body;
                Line::Close
            }
            State::Inside => Line::Field(trimmed),
            State::Body => Line::Body(trimmed),
        }
    }
}

/// Parsed `key: value` pairs of a front-matter block, in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrontMatter {
    fields: Vec<(String, String)>,
}

impl FrontMatter {
    /// First value recorded for `key`, compared case-insensitively.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Read only the front-matter block from `reader`.
    ///
    /// Reading stops at the closing delimiter or at the first body line, so
    /// the rest of the document is never consumed. An unterminated block is
    /// read to the end of the input.
    pub fn parse<R: BufRead>(mut reader: R) -> std::io::Result<Self> {
        let mut scanner = Scanner::new();
        let mut meta = FrontMatter::default();
        let mut buf = Vec::new();

        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf)? == 0 {
                break;
            }
            let line = String::from_utf8_lossy(&buf);
            match scanner.classify(&line) {
                Line::Blank | Line::Open => {}
                Line::Field(field) => meta.push_line(field),
                Line::Close | Line::Body(_) => break,
            }
        }

        Ok(meta)
    }

    fn push_line(&mut self, line: &str) {
        if let Some((key, value)) = line.split_once(':') {
            let key = key.trim();
            if !key.is_empty() {
                self.fields.push((key.to_string(), value.trim().to_string()));
            }
        }
    }
}

/// Split a document into its front-matter and the body that follows it.
///
/// The body is a slice of `text`, byte-identical to everything after the
/// closing delimiter line. Without a block the whole text is the body.
pub fn split(text: &str) -> (FrontMatter, &str) {
    let mut scanner = Scanner::new();
    let mut meta = FrontMatter::default();
    let mut offset = 0;

    for line in text.split_inclusive('\n') {
        let end = offset + line.len();
        match scanner.classify(line) {
            Line::Blank | Line::Open => {}
            Line::Field(field) => meta.push_line(field),
            Line::Close => return (meta, &text[end..]),
            Line::Body(_) => return (meta, text),
        }
        offset = end;
    }

    match scanner.state {
        State::Inside => (meta, ""),
        _ => (meta, text),
    }
}

/// The body of a document with any front-matter block removed.
pub fn strip(text: &str) -> &str {
    split(text).1
}

/// Resolve the display title of a document read from `reader`.
///
/// The first `title:` inside the front-matter is the meta title. Scanning
/// stops at the first level-1 heading outside the block; the meta title wins
/// over the heading text when both exist. Without any heading the meta title
/// (possibly absent) is returned once the input is exhausted.
pub fn title_from_reader<R: BufRead>(mut reader: R) -> Option<String> {
    let mut scanner = Scanner::new();
    let mut meta_title: Option<String> = None;
    let mut buf = Vec::new();

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(error = %e, "stopped reading document for title");
                break;
            }
        }

        let line = String::from_utf8_lossy(&buf);
        match scanner.classify(&line) {
            Line::Field(field) => {
                if meta_title.is_none() {
                    meta_title = title_field(field).map(str::to_string);
                }
            }
            Line::Body(body) => {
                if let Some(heading) = h1_text(body) {
                    return meta_title.or_else(|| Some(heading.to_string()));
                }
            }
            Line::Blank | Line::Open | Line::Close => {}
        }
    }

    meta_title
}

/// Resolve the title of the document at `path`, or `None` if it cannot be
/// opened or carries no title signal.
pub fn resolve_title(path: &Path) -> Option<String> {
    let file = File::open(path).ok()?;
    title_from_reader(BufReader::new(file))
}

/// Value of a `title:` line (key matched case-insensitively).
fn title_field(line: &str) -> Option<&str> {
    let key = line.get(..6)?;
    if !key.eq_ignore_ascii_case("title:") {
        return None;
    }
    let value = line[6..].trim();
    (!value.is_empty()).then_some(value)
}

/// Text of a level-1 heading (`# ` followed by text).
fn h1_text(line: &str) -> Option<&str> {
    let text = line.strip_prefix("# ")?.trim();
    (!text.is_empty()).then_some(text)
}
