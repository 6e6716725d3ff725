mod config;

use std::error::Error;
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term;
use codespan_reporting::term::termcolor::{ColorChoice, StandardStream};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use codex::Record;
use codex::parser::Dataset;
use scribe::{FragmentTable, RecordIndex, Renderer, Resolver};

use crate::config::Config;

#[derive(Parser)]
#[command(name = "scribe", version, about = "Resolve and render rules-content records")]
struct Cli {
    /// Disable colored error output
    #[arg(long, global = true)]
    no_color: bool,

    /// Log progress to stderr (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print records with their copies resolved, as JSON
    Resolve(ResolveArgs),

    /// Print records as Markdown
    Render(RenderArgs),
}

#[derive(clap::Args)]
struct Selection {
    /// JSON data file
    file: PathBuf,

    /// Collection to read, e.g. `monster` or `item`
    #[arg(short, long)]
    kind: String,

    /// Only records with this name
    #[arg(short, long)]
    name: Option<String>,
}

#[derive(clap::Args)]
struct ResolveArgs {
    #[command(flatten)]
    selection: Selection,
}

#[derive(clap::Args)]
struct RenderArgs {
    #[command(flatten)]
    selection: Selection,

    /// Field holding the document tree
    #[arg(long, default_value = "entries")]
    field: String,

    /// Collection holding template fragments, e.g. `itemEntry`
    #[arg(long)]
    fragments: Option<String>,

    /// Config file [default: ./scribe.toml if present]
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let color_choice = if cli.no_color {
        ColorChoice::Never
    } else {
        ColorChoice::Auto
    };

    match cli.command {
        Command::Resolve(args) => do_resolve(args, color_choice),
        Command::Render(args) => do_render(args, color_choice),
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "info" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn do_resolve(args: ResolveArgs, color_choice: ColorChoice) {
    let dataset = load_dataset(&args.selection.file, color_choice);
    let records = dataset.records(&args.selection.kind);
    let index = RecordIndex::from_records(records.iter().cloned());
    let mut resolver = Resolver::new(&index);

    let mut resolved = Vec::new();
    for record in selected(records, args.selection.name.as_deref()) {
        resolved.push(resolver.resolve(record).unwrap_or_else(|e| fail(&e)));
    }
    info!(records = resolved.len(), "resolved");

    let json = serde_json::to_string_pretty(&resolved).unwrap_or_else(|e| fail(&e));
    println!("{}", json);
}

fn do_render(args: RenderArgs, color_choice: ColorChoice) {
    let config = Config::load(args.config.as_deref()).unwrap_or_else(|e| fail(&e));
    let ownership = config.ownership();
    let renderer = Renderer::new(config.link_base.as_str());

    let dataset = load_dataset(&args.selection.file, color_choice);
    let records = dataset.records(&args.selection.kind);
    let index = RecordIndex::from_records(records.iter().cloned());
    let mut resolver = Resolver::new(&index);

    let fragments = match &args.fragments {
        Some(kind) => {
            FragmentTable::from_records(dataset.records(kind)).unwrap_or_else(|e| fail(&e))
        }
        None => FragmentTable::default(),
    };

    let mut documents = Vec::new();
    for record in selected(records, args.selection.name.as_deref()) {
        let resolved = resolver.resolve(record).unwrap_or_else(|e| fail(&e));
        if ownership.as_ref().is_some_and(|o| !o.is_owned(&resolved)) {
            debug!(entity = %resolved.label(), "not owned; skipped");
            continue;
        }
        let entries = fragments
            .expand(&resolved, &args.field, &renderer)
            .unwrap_or_else(|e| fail(&e));
        let body = renderer.render(&entries).unwrap_or_else(|e| fail(&e));
        documents.push(document(&resolved, &body));
    }
    info!(documents = documents.len(), "rendered");

    if !documents.is_empty() {
        println!("{}", documents.join("\n\n"));
    }
}

/// Read and parse a data file, reporting parse errors against the source.
fn load_dataset(file: &Path, color_choice: ColorChoice) -> Dataset {
    let source = match std::fs::read_to_string(file) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: cannot read '{}': {}", file.display(), e);
            process::exit(1);
        }
    };

    let mut files = SimpleFiles::new();
    let file_id = files.add(file.display().to_string(), source.clone());

    let parser = codex::parser::Parser::new(source, file_id);
    match parser.parse() {
        Ok(dataset) => dataset,
        Err(error) => {
            let writer = StandardStream::stderr(color_choice);
            let config = term::Config::default();
            let diagnostic = error.to_diagnostic();
            let _ = term::emit_to_write_style(&mut writer.lock(), &config, &files, &diagnostic);
            process::exit(1);
        }
    }
}

fn selected<'r>(records: &'r [Record], name: Option<&'r str>) -> impl Iterator<Item = &'r Record> {
    records
        .iter()
        .filter(move |record| name.is_none_or(|name| record.name() == Some(name)))
}

/// A record's Markdown document: its name as the title, then its body.
fn document(record: &Record, body: &str) -> String {
    let title = format!("# {}", record.name().unwrap_or("Untitled"));
    if body.is_empty() {
        title
    } else {
        format!("{}\n\n{}", title, body)
    }
}

fn fail(error: &dyn Error) -> ! {
    eprintln!("error: {}", error);
    let mut cause = error.source();
    while let Some(inner) = cause {
        eprintln!("  caused by: {}", inner);
        cause = inner.source();
    }
    process::exit(1);
}
