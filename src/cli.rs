use std::{net::SocketAddr, path::PathBuf};

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use crate::{export::DEFAULT_CONVERTER, server::DEFAULT_URL_PREFIX};

#[derive(Debug, Parser)]
#[command(
    name = "docsite",
    about = "Serve and search a documentation tree of markdown files"
)]
pub struct Cli {
    /// Directory holding the markdown documents
    #[arg(long, global = true, env = "DOCSITE_ROOT")]
    pub root: Option<PathBuf>,

    /// Increase log verbosity (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start the HTTP server
    Serve(ServeArgs),
    /// Search documents by keyword
    Search(SearchArgs),
    /// Print the document tree
    Tree(TreeArgs),
    /// Export a document as markdown, HTML, or PDF
    Export(ExportArgs),
    /// Generate shell completions
    #[command(hide = true)]
    Completions(CompletionsArgs),
}

// -- Serve --

#[derive(Debug, Parser)]
pub struct ServeArgs {
    /// Address to listen on
    #[arg(long, env = "DOCSITE_BIND", default_value = "127.0.0.1:8080")]
    pub bind: SocketAddr,

    /// URL prefix under which documents are published
    #[arg(long, default_value = DEFAULT_URL_PREFIX)]
    pub url_prefix: String,

    /// Directory with `<section>.html` landing pages
    #[arg(long)]
    pub index_dir: Option<PathBuf>,

    #[command(flatten)]
    pub converter: ConverterArgs,
}

#[derive(Debug, Parser)]
pub struct ConverterArgs {
    /// Markdown-to-PDF converter program
    #[arg(long, env = "DOCSITE_PANDOC", default_value = DEFAULT_CONVERTER)]
    pub pandoc: PathBuf,

    /// Extra argument passed to the converter (repeatable)
    #[arg(long = "pandoc-arg", allow_hyphen_values = true)]
    pub pandoc_args: Vec<String>,
}

// -- Search --

#[derive(Debug, Parser)]
pub struct SearchArgs {
    /// The search query
    pub query: String,

    /// Restrict the search to this section
    #[arg(short = 's', long)]
    pub section: Option<String>,

    /// Prefix prepended to result paths
    #[arg(long, default_value = DEFAULT_URL_PREFIX)]
    pub url_prefix: String,

    /// Output results as JSON
    #[arg(long)]
    pub json: bool,

    /// Output `path | title` lines, as the HTTP endpoint does
    #[arg(long, conflicts_with = "json")]
    pub lines: bool,
}

// -- Tree --

#[derive(Debug, Parser)]
pub struct TreeArgs {
    /// Show only this section
    #[arg(short = 's', long)]
    pub section: Option<String>,

    /// Show resolved titles next to file names
    #[arg(long)]
    pub titles: bool,
}

// -- Export --

#[derive(Debug, Parser)]
pub struct ExportArgs {
    /// Document path relative to the root
    pub file: String,

    /// Output format: markdown, html, or pdf
    #[arg(short, long, default_value = "markdown")]
    pub format: String,

    /// Password for protected documents
    #[arg(long, env = "DOCSITE_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Write to this file instead of the suggested name
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Write to stdout
    #[arg(long, conflicts_with = "output")]
    pub stdout: bool,

    #[command(flatten)]
    pub converter: ConverterArgs,
}

// -- Completions --

#[derive(Debug, Parser)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}

impl CompletionsArgs {
    /// Generate shell completions and print to stdout.
    pub fn generate(&self) {
        let mut cmd = Cli::command();
        clap_complete::generate(
            self.shell,
            &mut cmd,
            "docsite",
            &mut std::io::stdout(),
        );
    }
}
