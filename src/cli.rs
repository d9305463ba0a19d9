//! cidex - content-addressed catalog of Python declarations
//!
//! Scans Python code for standalone, documented functions and classes and
//! stores them under content identifiers, so identical code is only kept once.
//!
//! # Usage
//!
//! ```bash
//! # Index a project, including subdirectories
//! cidex index /path/to/project --recursive
//!
//! # Preview without writing anything
//! cidex index /path/to/project -r --dry-run --exclude "legacy"
//!
//! # Show what the extractor sees in one file
//! cidex extract /path/to/module.py
//!
//! # Count stored entries
//! cidex stats
//! ```
//!
//! # Output
//!
//! - `--json` outputs machine-readable JSON
//! - Errors and logs go to stderr, results to stdout
//! - Exit codes: 0 = success, 1 = errors but something was stored,
//!   2 = errors and nothing was stored

use anyhow::{Context, Result};
use cidex::{
    Catalog, CancellationFlag, ConfigOverrides, DeclarationRecord, EntryAssembler, IndexConfig,
    Indexer, JsonCatalog, SummaryReport, Verdict, classify, extract_declarations,
};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cidex")]
#[command(version)]
#[command(about = "Content-addressed catalog of documented Python declarations")]
#[command(long_about = r#"
cidex consolidates Python code scattered across projects.

Only standalone functions, coroutines, generators and classes that carry a
docstring are stored. Methods, nested definitions, lambdas and undocumented
code are skipped. Every entry is keyed by a CIDv1 content identifier.
"#)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output JSON instead of human-readable text
    #[arg(long, global = true)]
    json: bool,

    /// Log every per-file and per-declaration decision to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan a directory and store eligible declarations
    Index {
        /// Directory to scan for Python files
        directory: PathBuf,

        /// Scan subdirectories recursively
        #[arg(short, long)]
        recursive: bool,

        /// Report what would be stored without writing
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Additional exclusion pattern (repeatable)
        #[arg(short, long = "exclude", value_name = "PATTERN")]
        exclude: Vec<String>,

        /// Catalog file (default: <DIRECTORY>/.cidex/catalog.json)
        #[arg(long)]
        catalog: Option<PathBuf>,

        /// Files processed concurrently
        #[arg(short, long)]
        jobs: Option<usize>,
    },

    /// Print the declarations of one file and their verdicts
    Extract {
        /// Python source file
        file: PathBuf,
    },

    /// Show the number of stored entries
    Stats {
        /// Catalog file (default: <WORKSPACE>/.cidex/catalog.json)
        #[arg(long)]
        catalog: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr to keep stdout clean
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();

    match run_command(&cli).await {
        Ok(output) => {
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&output)?);
            } else {
                print_human_readable(&output);
            }
            let code = output.exit_code();
            if code != 0 {
                std::process::exit(code);
            }
            Ok(())
        }
        Err(e) => {
            if cli.json {
                let err = serde_json::json!({
                    "error": format!("{e:#}")
                });
                eprintln!("{}", serde_json::to_string_pretty(&err)?);
            } else {
                eprintln!("Error: {e:#}");
            }
            std::process::exit(1);
        }
    }
}

async fn run_command(cli: &Cli) -> Result<Output> {
    match &cli.command {
        Commands::Index {
            directory,
            recursive,
            dry_run,
            exclude,
            catalog,
            jobs,
        } => {
            let root = directory
                .canonicalize()
                .with_context(|| format!("Directory not found: {}", directory.display()))?;
            let config = IndexConfig::load(ConfigOverrides {
                root: Some(root),
                recursive: recursive.then_some(true),
                dry_run: dry_run.then_some(true),
                exclude: exclude.clone(),
                catalog_path: catalog.clone(),
                jobs: *jobs,
            })?;

            let store = JsonCatalog::open(config.catalog_file())?;
            let cancel = CancellationFlag::new();
            let indexer = Indexer::new(EntryAssembler::new(&config.root))
                .with_jobs(config.jobs)
                .with_cancellation(cancel.clone());

            let interrupt = tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::warn!("Interrupted, finishing files in flight");
                    cancel.cancel();
                }
            });
            let stats = indexer.index(&config, &store).await;
            interrupt.abort();
            let stats = stats?;

            let catalog_total = (!config.dry_run).then(|| store.len());
            let exit_code = if indexer.cancellation().is_cancelled() {
                1
            } else {
                stats.exit_code()
            };
            Ok(Output::Index {
                workspace: config.root.display().to_string(),
                dry_run: config.dry_run,
                summary: stats.summary(catalog_total),
                report: stats.render(catalog_total),
                exit_code,
            })
        }

        Commands::Extract { file } => {
            let source = std::fs::read_to_string(file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let records = extract_declarations(&source, file)?
                .into_iter()
                .map(|record| {
                    let verdict = classify(&record);
                    ExtractedRecord { record, verdict }
                })
                .collect();
            Ok(Output::Extract {
                file: file.display().to_string(),
                records,
            })
        }

        Commands::Stats { catalog } => {
            let config = IndexConfig::load(ConfigOverrides {
                catalog_path: catalog.clone(),
                ..Default::default()
            })?;
            let path = config.catalog_file();
            let store = JsonCatalog::open(&path)?;
            Ok(Output::Stats {
                catalog: path.display().to_string(),
                entries: store.len(),
            })
        }
    }
}

#[derive(serde::Serialize)]
struct ExtractedRecord {
    #[serde(flatten)]
    record: DeclarationRecord,
    verdict: Verdict,
}

#[derive(serde::Serialize)]
#[serde(tag = "type")]
enum Output {
    Index {
        workspace: String,
        dry_run: bool,
        summary: SummaryReport,
        #[serde(skip)]
        report: String,
        #[serde(skip)]
        exit_code: i32,
    },
    Extract {
        file: String,
        records: Vec<ExtractedRecord>,
    },
    Stats {
        catalog: String,
        entries: usize,
    },
}

impl Output {
    fn exit_code(&self) -> i32 {
        match self {
            Output::Index { exit_code, .. } => *exit_code,
            _ => 0,
        }
    }
}

fn print_human_readable(output: &Output) {
    match output {
        Output::Index {
            workspace,
            dry_run,
            report,
            ..
        } => {
            if *dry_run {
                println!("[DRY RUN] Nothing was written");
            }
            println!("Workspace: {}", workspace);
            print!("{}", report);
        }
        Output::Extract { file, records } => {
            println!("{}", file);
            if records.is_empty() {
                println!("  No top-level callables found");
            }
            for r in records {
                match &r.verdict {
                    Verdict::Accepted => println!(
                        "  - Found: {} ({}) at line {}",
                        r.record.name, r.record.kind, r.record.start_line
                    ),
                    Verdict::Rejected(reason) => println!(
                        "  - Skipped: {} ({})",
                        r.record.name,
                        reason.as_str()
                    ),
                }
                println!("      {}", r.record.signature);
            }
        }
        Output::Stats { catalog, entries } => {
            println!("Catalog: {}", catalog);
            println!("{} code entries", entries);
        }
    }
}
