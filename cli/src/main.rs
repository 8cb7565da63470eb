mod report;

use std::path::PathBuf;
use std::process;
use std::time::Duration;

use clap::{Parser, Subcommand};
use codespan_reporting::term::termcolor::ColorChoice;
use tracing_subscriber::EnvFilter;

use doccheck::source::Document;
use sandbox::{Config, Overrides};

use report::{Reporter, Style};

const SUBCOMMANDS: &[&str] = &["check", "blocks", "help"];

#[derive(Parser)]
#[command(name = "doccheck", version, about = "Run the code samples of a document")]
struct Cli {
    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Log pipeline progress to stderr (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check the code blocks of one or more documents
    Check(CheckArgs),

    /// List the code blocks of a document
    Blocks(BlocksArgs),
}

#[derive(clap::Args)]
struct CheckArgs {
    /// Documents to check; each is checked independently
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Print failures as plain text instead of source snippets
    #[arg(long)]
    plain: bool,

    /// Per-block execution timeout in milliseconds
    #[arg(long, value_name = "MS")]
    timeout: Option<u64>,

    /// Skip linting
    #[arg(long)]
    no_lint: bool,
}

#[derive(clap::Args)]
struct BlocksArgs {
    /// Document to inspect
    file: PathBuf,

    /// Print each block's code after assertion rewriting
    #[arg(long)]
    rewritten: bool,
}

fn main() {
    // A first positional argument that is not a subcommand is a document, so
    // `doccheck guide.adoc` works like `doccheck check guide.adoc`.
    let mut args: Vec<String> = std::env::args().collect();
    let explicit = args
        .iter()
        .skip(1)
        .find(|a| !a.starts_with('-'))
        .is_none_or(|a| SUBCOMMANDS.contains(&a.as_str()));
    if !explicit {
        args.insert(1, "check".to_string());
    }

    let cli = Cli::parse_from(&args);
    init_tracing(cli.verbose);

    let color = if cli.no_color {
        ColorChoice::Never
    } else {
        ColorChoice::Auto
    };

    let code = match cli.command {
        Command::Check(check_args) => do_check(check_args, color),
        Command::Blocks(blocks_args) => do_blocks(blocks_args),
    };
    process::exit(code);
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn do_check(args: CheckArgs, color: ColorChoice) -> i32 {
    let overrides = Overrides {
        timeout: args.timeout.map(Duration::from_millis),
        lint: args.no_lint.then_some(false),
    };
    let style = if args.plain { Style::Plain } else { Style::Snippets };
    let reporter = Reporter::new(color, style);

    let mut failed = false;
    for file in &args.files {
        tracing::debug!(path = %file.display(), "checking document");
        match sandbox::check_document(file, &overrides) {
            Ok(report) => {
                if !report.is_clean() {
                    failed = true;
                }
                reporter.document(&report);
            }
            Err(err) => {
                failed = true;
                eprintln!("error: {}", err);
            }
        }
    }

    if failed { 1 } else { 0 }
}

fn do_blocks(args: BlocksArgs) -> i32 {
    let document = match Document::load(&args.file) {
        Ok(document) => document,
        Err(err) => {
            eprintln!("error: {}", err);
            return 1;
        }
    };
    let config = match Config::resolve(&document.base_dir()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("error: {}", err);
            return 1;
        }
    };

    let (extraction, advisories) = sandbox::extract(document, &config);
    report::list_blocks(&extraction, &advisories, args.rewritten);
    0
}
