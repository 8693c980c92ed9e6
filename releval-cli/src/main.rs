//! Releval CLI: evaluate ranked runs against relevance judgments.
//!
//! Judgments and runs are read as nested JSON mappings
//! (`query -> document -> grade` and `query -> document -> score`).

mod commands;

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Releval: TREC-style retrieval evaluation
#[derive(Parser, Debug)]
#[command(name = "releval", version, about, long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Evaluate a run against judgments and print per-query values
    Evaluate(EvaluateArgs),
    /// List supported measures and nicknames
    Measures,
}

#[derive(clap::Args, Debug)]
struct EvaluateArgs {
    /// Relevance judgments (JSON: query -> document -> integer grade)
    #[arg(long)]
    qrels: PathBuf,

    /// System run (JSON: query -> document -> score)
    #[arg(long)]
    run: PathBuf,

    /// Measure specifier, e.g. `map`, `P.5,10` or a nickname (repeatable)
    #[arg(short, long = "measure")]
    measures: Vec<String>,

    /// Minimum grade counted as relevant
    #[arg(short = 'l', long)]
    relevance_level: Option<i64>,

    /// Ignore retrieved documents without a judgment
    #[arg(short = 'j', long, overrides_with = "no_judged_docs_only")]
    judged_docs_only: bool,

    /// Keep unjudged retrieved documents, even if configuration says otherwise
    #[arg(long, overrides_with = "judged_docs_only")]
    no_judged_docs_only: bool,

    /// Only consider the top N retrieved documents per query
    #[arg(short = 'M', long)]
    max_docs_per_query: Option<usize>,

    /// Add an "all" entry aggregating every query
    #[arg(short, long)]
    aggregate: bool,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_env("RELEVAL_LOG").unwrap_or_else(|_| EnvFilter::new(filter));

    // Logs go to stderr; stdout carries the JSON report.
    let stderr_layer = if cli.log_json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_filter(filter)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
            .with_filter(filter)
            .boxed()
    };

    tracing_subscriber::registry().with(stderr_layer).init();

    commands::handle_command(cli.command)
}
