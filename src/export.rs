use std::{path::PathBuf, str::FromStr};

use crate::{
    document::{Access, Document},
    error::{Error, Result},
    render::markdown_to_html,
};

/// Program used for PDF conversion when none is configured.
pub const DEFAULT_CONVERTER: &str = "pandoc";

/// Formats a document can be downloaded in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Markdown,
    Html,
    Pdf,
}

impl ExportFormat {
    pub fn content_type(self) -> &'static str {
        match self {
            ExportFormat::Markdown => "text/markdown; charset=utf-8",
            ExportFormat::Html => "text/html; charset=utf-8",
            ExportFormat::Pdf => "application/pdf",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Markdown => "md",
            ExportFormat::Html => "html",
            ExportFormat::Pdf => "pdf",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "markdown" | "md" => Ok(ExportFormat::Markdown),
            "html" => Ok(ExportFormat::Html),
            "pdf" => Ok(ExportFormat::Pdf),
            _ => Err(Error::UnsupportedFormat(s.to_string())),
        }
    }
}

/// A document rendered for download.
#[derive(Debug, Clone)]
pub struct Export {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
    /// Suggested file name: the document stem plus the format's extension.
    pub filename: String,
}

/// External markdown-to-PDF converter, invoked as
/// `<program> [args...] <input.md> -o <output.pdf>`.
#[derive(Debug, Clone)]
pub struct Converter {
    program: PathBuf,
    args: Vec<String>,
}

impl Default for Converter {
    fn default() -> Self {
        Self::new(DEFAULT_CONVERTER)
    }
}

impl Converter {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Extra arguments placed before the input file.
    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    /// Convert markdown to PDF bytes.
    ///
    /// Input and output live in a private temporary directory that is
    /// removed when this returns. A converter that cannot be started or
    /// exits unsuccessfully yields `ConversionFailed` carrying its combined
    /// output.
    pub async fn to_pdf(&self, markdown: &str) -> Result<Vec<u8>> {
        let workdir = tempfile::tempdir()?;
        let input = workdir.path().join("input.md");
        let output = workdir.path().join("output.pdf");
        tokio::fs::write(&input, markdown).await?;

        let mut command = tokio::process::Command::new(&self.program);
        command.args(&self.args).arg(&input).arg("-o").arg(&output);
        let command_line = format!(
            "{} {} {} -o {}",
            self.program.display(),
            self.args.join(" "),
            input.display(),
            output.display()
        );

        tracing::debug!(command = %command_line, "running converter");
        let result = command.output().await.map_err(|e| {
            Error::ConversionFailed {
                command: command_line.clone(),
                status: "not started".to_string(),
                output: e.to_string(),
            }
        })?;

        if !result.status.success() {
            let mut output = String::from_utf8_lossy(&result.stdout).into_owned();
            output.push_str(&String::from_utf8_lossy(&result.stderr));
            tracing::warn!(
                command = %command_line,
                status = %result.status,
                "converter failed"
            );
            return Err(Error::ConversionFailed {
                command: command_line,
                status: result.status.to_string(),
                output,
            });
        }

        Ok(tokio::fs::read(&output).await?)
    }
}

/// Export `document` in `format`.
///
/// Protected documents require the same credential as viewing them.
pub async fn export(
    document: &Document,
    format: ExportFormat,
    credential: Option<&str>,
    converter: &Converter,
) -> Result<Export> {
    if document.unlock(credential) != Access::Granted {
        return Err(Error::Locked);
    }

    let body = document.body();
    let bytes = match format {
        ExportFormat::Markdown => body.as_bytes().to_vec(),
        ExportFormat::Html => markdown_to_html(body).into_bytes(),
        ExportFormat::Pdf => converter.to_pdf(body).await?,
    };

    Ok(Export {
        bytes,
        content_type: format.content_type(),
        filename: format!("{}.{}", document.stem(), format.extension()),
    })
}
