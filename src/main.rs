use std::{io::Write, path::Path};

use clap::Parser;
use docsite::{
    DocRoot,
    Document,
    DocumentNode,
    cli::{Cli, Command, ConverterArgs, ExportArgs, SearchArgs, ServeArgs, TreeArgs},
    error,
    export::{self, Converter, ExportFormat},
    search::{self, SearchRequest},
    server::{self, SiteConfig},
    tree,
};
use tracing_subscriber::EnvFilter;

fn init_tracing(verbose: u8, quiet: bool) {
    let filter = if let Ok(env) = std::env::var("DOCSITE_LOG") {
        EnvFilter::new(env)
    } else if quiet {
        EnvFilter::new("warn")
    } else {
        match verbose {
            0 => EnvFilter::new("info"),
            1 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

#[tokio::main]
async fn main() -> error::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    if let Command::Completions(args) = &cli.command {
        args.generate();
        return Ok(());
    }

    let root = DocRoot::resolve(cli.root.as_deref())?;

    match cli.command {
        Command::Serve(args) => cmd_serve(root, args).await?,
        Command::Search(args) => cmd_search(&root, &args)?,
        Command::Tree(args) => cmd_tree(&root, &args)?,
        Command::Export(args) => cmd_export(&root, &args).await?,
        Command::Completions(_) => {}
    }

    Ok(())
}

fn converter(args: &ConverterArgs) -> Converter {
    Converter::new(&args.pandoc).with_args(args.pandoc_args.clone())
}

async fn cmd_serve(root: DocRoot, args: ServeArgs) -> error::Result<()> {
    // Landing pages default to an `indexes` directory next to the root.
    let index_dir = args.index_dir.clone().or_else(|| {
        let dir = root.path().parent()?.join("indexes");
        dir.is_dir().then_some(dir)
    });

    let config = SiteConfig {
        url_prefix: args.url_prefix.clone(),
        index_dir,
        converter: converter(&args.converter),
    };

    server::serve(root, config, args.bind).await
}

fn cmd_search(root: &DocRoot, args: &SearchArgs) -> error::Result<()> {
    let mut request = SearchRequest::new(args.query.as_str());
    if let Some(section) = &args.section {
        request = request.in_section(section.as_str());
    }
    let results = search::execute_search(root, &args.url_prefix, &request)?;

    if args.json {
        println!("{}", search::format_json(&results, args.query.trim()));
    } else if args.lines {
        print!("{}", search::format_lines(&results));
    } else {
        search::format_human(&results);
    }
    Ok(())
}

fn cmd_tree(root: &DocRoot, args: &TreeArgs) -> error::Result<()> {
    let base = match args.section.as_deref() {
        Some(section) => root.resolve_section(section)?,
        None => root.path().to_path_buf(),
    };

    let nodes = tree::build_tree(&base);
    if nodes.is_empty() {
        println!("No documents found.");
        return Ok(());
    }

    let mut out = std::io::stdout().lock();
    print_nodes(&mut out, &nodes, &base, args.titles, 0)?;
    let count: usize = nodes.iter().map(DocumentNode::document_count).sum();
    writeln!(out, "\n{count} document(s)")?;
    Ok(())
}

fn print_nodes(
    out: &mut impl Write,
    nodes: &[DocumentNode],
    base: &Path,
    titles: bool,
    depth: usize,
) -> std::io::Result<()> {
    let indent = "  ".repeat(depth);
    for node in nodes {
        match node {
            DocumentNode::Directory { name, children } => {
                writeln!(out, "{indent}{name}/")?;
                print_nodes(out, children, base, titles, depth + 1)?;
            }
            DocumentNode::Document { name, .. } if titles => {
                let title = node.title(base).unwrap_or_default();
                writeln!(out, "{indent}{name}\t{title}")?;
            }
            DocumentNode::Document { name, .. } => {
                writeln!(out, "{indent}{name}")?;
            }
        }
    }
    Ok(())
}

async fn cmd_export(root: &DocRoot, args: &ExportArgs) -> error::Result<()> {
    let document = Document::open(root, &args.file)?;
    let format: ExportFormat = args.format.parse()?;

    let exported = export::export(
        &document,
        format,
        args.password.as_deref(),
        &converter(&args.converter),
    )
    .await?;

    if args.stdout {
        std::io::stdout().write_all(&exported.bytes)?;
        return Ok(());
    }

    let target = args
        .output
        .clone()
        .unwrap_or_else(|| exported.filename.clone().into());
    std::fs::write(&target, &exported.bytes)?;
    eprintln!("Wrote {}", target.display());
    Ok(())
}
