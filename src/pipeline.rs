//! Indexing pipeline.
//!
//! Each file goes through extract, classify and assemble on a blocking
//! worker. Results are consumed in discovery order, checked against the
//! catalog and stored.

use crate::catalog::{Catalog, InsertOutcome};
use crate::classify::classify;
use crate::config::IndexConfig;
use crate::entry::EntryAssembler;
use crate::error::ExtractError;
use crate::parsing;
use crate::report::{ParseErrorRecord, RecordError, RunStats};
use crate::types::{DeclarationKind, Entry, RejectReason, Verdict};
use anyhow::Result;
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shared stop signal for a running batch.
///
/// Setting it stops new files from being scheduled; files already in flight
/// still complete and are counted.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// What happened to one declaration.
#[derive(Debug, Clone)]
pub enum RecordOutcome {
    Accepted(Entry),
    Rejected {
        name: String,
        kind: DeclarationKind,
        reason: RejectReason,
    },
    /// Accepted, but no identifier could be computed.
    Failed { name: String, error: String },
}

/// Per-declaration outcomes for one file, in source order.
#[derive(Debug, Clone, Default)]
pub struct FileOutcome {
    pub records: Vec<RecordOutcome>,
}

impl FileOutcome {
    pub fn entries(&self) -> impl Iterator<Item = &Entry> {
        self.records.iter().filter_map(|r| match r {
            RecordOutcome::Accepted(entry) => Some(entry),
            _ => None,
        })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Why a whole file produced no outcomes.
#[derive(Debug)]
enum FileFailure {
    Parse(ExtractError),
    Read(String),
}

/// Runs the declaration pipeline over files.
#[derive(Debug, Clone)]
pub struct Indexer {
    assembler: Arc<EntryAssembler>,
    jobs: usize,
    cancel: CancellationFlag,
}

impl Indexer {
    pub fn new(assembler: EntryAssembler) -> Self {
        Self {
            assembler: Arc::new(assembler),
            jobs: 1,
            cancel: CancellationFlag::new(),
        }
    }

    /// Number of files processed concurrently (at least one).
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancellation(&self) -> &CancellationFlag {
        &self.cancel
    }

    pub fn assembler(&self) -> &EntryAssembler {
        &self.assembler
    }

    /// Extract, classify and assemble every declaration in `source`.
    pub fn process_source(&self, source: &str, path: &Path) -> Result<FileOutcome, ExtractError> {
        process_source(&self.assembler, source, path)
    }

    /// Discover files per `config` and run them through the pipeline.
    pub async fn index(&self, config: &IndexConfig, catalog: &dyn Catalog) -> Result<RunStats> {
        tracing::info!("Scanning {}", config.root.display());
        let files = config.discovery().discover(&config.root)?;
        tracing::info!("Found {} Python files", files.len());
        Ok(self.run(files, catalog, config.dry_run).await)
    }

    /// Process `files` and store accepted entries in `catalog`.
    ///
    /// Per-file and per-declaration failures are recorded in the returned
    /// statistics; they never stop the batch. With `dry_run` nothing is
    /// written.
    pub async fn run(&self, files: Vec<PathBuf>, catalog: &dyn Catalog, dry_run: bool) -> RunStats {
        let mut stats = RunStats::default();
        let cancel = self.cancel.clone();

        let mut results = futures::stream::iter(files)
            .take_while(move |_| futures::future::ready(!cancel.is_cancelled()))
            .map(|path| {
                let assembler = Arc::clone(&self.assembler);
                async move {
                    let worker_path = path.clone();
                    let joined =
                        tokio::task::spawn_blocking(move || process_file(&assembler, &worker_path))
                            .await;
                    let result = match joined {
                        Ok(result) => result,
                        Err(e) => Err(FileFailure::Read(format!("worker failed: {e}"))),
                    };
                    (path, result)
                }
            })
            .buffered(self.jobs);

        while let Some((path, result)) = results.next().await {
            stats.files_scanned += 1;
            tracing::info!("Processing: {}", path.display());

            let outcome = match result {
                Ok(outcome) => outcome,
                Err(FileFailure::Parse(e)) => {
                    tracing::warn!("{}", e);
                    stats.parse_errors.push(ParseErrorRecord {
                        file: path.display().to_string(),
                        error: e.to_string(),
                    });
                    continue;
                }
                Err(FileFailure::Read(message)) => {
                    tracing::warn!("Failed to read {}: {}", path.display(), message);
                    stats.errors.push(RecordError {
                        file: path.display().to_string(),
                        callable: String::new(),
                        error: message,
                    });
                    continue;
                }
            };

            if outcome.is_empty() {
                tracing::debug!("No top-level callables in {}", path.display());
            }
            for record in outcome.records {
                stats.callables_found += 1;
                self.store(record, &path, catalog, dry_run, &mut stats);
            }
        }

        if self.cancel.is_cancelled() {
            tracing::warn!("Indexing cancelled after {} files", stats.files_scanned);
        }
        if !dry_run {
            if let Err(e) = catalog.flush() {
                tracing::error!("Failed to write catalog: {}", e);
                stats.errors.push(RecordError {
                    file: String::new(),
                    callable: String::new(),
                    error: format!("catalog write failed: {e}"),
                });
            }
        }
        tracing::info!(
            "Index complete: {} files, {} callables, {} new, {} duplicates, {} errors",
            stats.files_scanned,
            stats.callables_found,
            stats.new_uploads,
            stats.skipped_duplicates,
            stats.total_errors()
        );
        stats
    }

    fn store(
        &self,
        record: RecordOutcome,
        path: &Path,
        catalog: &dyn Catalog,
        dry_run: bool,
        stats: &mut RunStats,
    ) {
        let entry = match record {
            RecordOutcome::Rejected { name, reason, .. } => {
                tracing::debug!("Skipped: {} ({})", name, reason.as_str());
                match reason {
                    RejectReason::NotStandalone => stats.skipped_not_standalone += 1,
                    RejectReason::NoDocstring => stats.skipped_no_docstring += 1,
                }
                return;
            }
            RecordOutcome::Failed { name, error } => {
                tracing::warn!("Failed to identify {} in {}: {}", name, path.display(), error);
                stats.errors.push(RecordError {
                    file: path.display().to_string(),
                    callable: name,
                    error,
                });
                return;
            }
            RecordOutcome::Accepted(entry) => entry,
        };

        let name = entry.metadata.code_name.clone();
        tracing::debug!("Found: {} ({})", name, entry.metadata.code_type);

        let result = catalog.contains(&entry.metadata.cid).and_then(|exists| {
            if exists {
                Ok(InsertOutcome::Duplicate)
            } else if dry_run {
                tracing::info!("[DRY RUN] Would store {} as {}", name, entry.cid);
                Ok(InsertOutcome::Inserted)
            } else {
                catalog.insert(&entry)
            }
        });

        match result {
            Ok(InsertOutcome::Duplicate) => {
                tracing::debug!("Duplicate interface CID for {}, skipping", name);
                stats.skipped_duplicates += 1;
            }
            Ok(InsertOutcome::Inserted) if dry_run => {}
            Ok(InsertOutcome::Inserted) => stats.new_uploads += 1,
            Err(e) => {
                tracing::warn!("Failed to store {} from {}: {}", name, path.display(), e);
                stats.errors.push(RecordError {
                    file: path.display().to_string(),
                    callable: name,
                    error: e.to_string(),
                });
            }
        }
    }
}

fn process_file(assembler: &EntryAssembler, path: &Path) -> Result<FileOutcome, FileFailure> {
    let source = std::fs::read_to_string(path).map_err(|e| FileFailure::Read(e.to_string()))?;
    process_source(assembler, &source, path).map_err(FileFailure::Parse)
}

fn process_source(
    assembler: &EntryAssembler,
    source: &str,
    path: &Path,
) -> Result<FileOutcome, ExtractError> {
    let declarations = parsing::extract_declarations(source, path)?;

    let records = declarations
        .into_iter()
        .map(|record| match classify(&record) {
            Verdict::Accepted => match assembler.assemble(&record, path) {
                Ok(entry) => RecordOutcome::Accepted(entry),
                Err(e) => RecordOutcome::Failed {
                    name: record.name,
                    error: e.to_string(),
                },
            },
            Verdict::Rejected(reason) => RecordOutcome::Rejected {
                name: record.name,
                kind: record.kind,
                reason,
            },
        })
        .collect();

    Ok(FileOutcome { records })
}
