//! Pipeline orchestration: one document through the compiler, and batches
//! across the vault.
//!
//! Documents are independent; batch compilation runs them in parallel and
//! isolates per-document failures, so one malformed source never aborts its
//! siblings. The writer is the sole contention point and serializes per
//! destination path only.

use crate::core::config::CompileConfig;
use crate::core::dialect;
use crate::core::error::ScriptoriumError;
use crate::core::estimate;
use crate::core::frontmatter;
use crate::core::record::{self, ContentRecord};
use crate::core::vault::{CollectionMatcher, DecodeFailure, SourceDocument, Vault};
use crate::core::writer::AtomicWriter;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Clone, Default)]
pub struct CompileOptions {
    /// Skip structurally invalid directive blocks instead of failing the
    /// document. Off by default.
    pub best_effort: bool,
}

/// Run the upstream pipeline stages on one loaded document.
pub fn compile_document(
    doc: &SourceDocument,
    config: &CompileConfig,
    options: &CompileOptions,
) -> Result<ContentRecord, ScriptoriumError> {
    let (frontmatter, body) = frontmatter::extract(&doc.raw_text)?;
    // The scanner sees only the body; remap its locations so errors carry
    // file-relative lines and offsets.
    let body_start = doc.raw_text.len() - body.len();
    let line_base = doc.raw_text[..body_start]
        .bytes()
        .filter(|b| *b == b'\n')
        .count();
    let scan = dialect::scan(body, options.best_effort)
        .map_err(|e| offset_dialect_error(e, line_base, body_start))?;
    let duration = estimate::estimate_duration(scan.word_count, scan.pause_count, config);
    record::assemble(
        &doc.id(),
        &doc.relative_path.to_string_lossy(),
        frontmatter,
        scan.directives,
        scan.word_count,
        scan.pause_count,
        duration,
    )
}

fn offset_dialect_error(
    error: ScriptoriumError,
    line_base: usize,
    byte_base: usize,
) -> ScriptoriumError {
    match error {
        ScriptoriumError::UnterminatedDirective { line, offset } => {
            ScriptoriumError::UnterminatedDirective {
                line: line + line_base,
                offset: offset + byte_base,
            }
        }
        ScriptoriumError::DirectiveSchema { line, detail } => ScriptoriumError::DirectiveSchema {
            line: line + line_base,
            detail,
        },
        other => other,
    }
}

/// Collaborator contract: compile one document by path.
///
/// Configuration is validated before the document is read, so a non-positive
/// `words_per_minute` fails without any document I/O.
pub fn compile(
    path: &Path,
    config: &CompileConfig,
    options: &CompileOptions,
) -> Result<ContentRecord, ScriptoriumError> {
    config.validate()?;
    let vault = Vault::new(config.vault_root.clone());
    let doc = vault.load_document(path)?;
    compile_document(&doc, config, options)
}

/// Outcome of one document within a batch.
#[derive(Debug)]
pub enum DocOutcome {
    Compiled {
        record: ContentRecord,
        artifact_path: PathBuf,
    },
    Failed(ScriptoriumError),
    Cancelled,
}

#[derive(Debug)]
pub struct BatchItem {
    pub source_path: PathBuf,
    pub relative_path: PathBuf,
    pub outcome: DocOutcome,
}

/// Per-document outcome list for a batch run. Already-committed documents
/// are retained even when the batch is cancelled midway.
#[derive(Debug)]
pub struct BatchReport {
    pub collections: Vec<String>,
    pub items: Vec<BatchItem>,
    /// Sources that could not be decoded during discovery.
    pub decode_failures: Vec<DecodeFailure>,
    /// First document skipped due to cancellation, when any.
    pub cancelled_at: Option<PathBuf>,
}

impl BatchReport {
    pub fn compiled_count(&self) -> usize {
        self.items
            .iter()
            .filter(|item| matches!(item.outcome, DocOutcome::Compiled { .. }))
            .count()
    }

    pub fn failed_count(&self) -> usize {
        let failed = self
            .items
            .iter()
            .filter(|item| matches!(item.outcome, DocOutcome::Failed(_)))
            .count();
        failed + self.decode_failures.len()
    }

    pub fn cancelled_count(&self) -> usize {
        self.items
            .iter()
            .filter(|item| matches!(item.outcome, DocOutcome::Cancelled))
            .count()
    }

    pub fn is_clean(&self) -> bool {
        self.failed_count() == 0 && self.cancelled_at.is_none()
    }
}

/// Discover, compile, and persist every document in the vault.
///
/// The cancel flag is checked before each document starts; setting it lets a
/// running batch stop between documents while keeping everything already
/// committed. The core performs no retries — callers get deterministic
/// error signals per document.
pub fn compile_batch(
    config: &CompileConfig,
    matcher: &CollectionMatcher,
    options: &CompileOptions,
    cancel: &AtomicBool,
) -> Result<BatchReport, ScriptoriumError> {
    config.validate()?;
    let vault = Vault::new(config.vault_root.clone());
    let discovery = vault.discover(matcher)?;
    let writer = AtomicWriter::new(config.vault_root.clone(), config.history_root());

    let items: Vec<BatchItem> = discovery
        .documents
        .into_par_iter()
        .map(|doc| {
            let source_path = doc.path.clone();
            let relative_path = doc.relative_path.clone();
            let outcome = if cancel.load(Ordering::SeqCst) {
                DocOutcome::Cancelled
            } else {
                match compile_and_persist(&doc, config, options, &writer) {
                    Ok((record, artifact_path)) => DocOutcome::Compiled {
                        record,
                        artifact_path,
                    },
                    Err(error) => DocOutcome::Failed(error),
                }
            };
            BatchItem {
                source_path,
                relative_path,
                outcome,
            }
        })
        .collect();

    let cancelled_at = items
        .iter()
        .find(|item| matches!(item.outcome, DocOutcome::Cancelled))
        .map(|item| item.source_path.clone());

    Ok(BatchReport {
        collections: discovery.collections,
        items,
        decode_failures: discovery.failures,
        cancelled_at,
    })
}

/// Serialize a record and persist it to the sovereign artifact path.
pub fn persist_record(
    record: &ContentRecord,
    artifact_rel_path: &Path,
    writer: &AtomicWriter,
) -> Result<PathBuf, ScriptoriumError> {
    let mut bytes = serde_json::to_vec_pretty(record)
        .map_err(|e| ScriptoriumError::Storage(format!("cannot serialize record: {}", e)))?;
    bytes.push(b'\n');
    let ack = writer.write(artifact_rel_path, &bytes)?;
    Ok(ack.path)
}

fn compile_and_persist(
    doc: &SourceDocument,
    config: &CompileConfig,
    options: &CompileOptions,
    writer: &AtomicWriter,
) -> Result<(ContentRecord, PathBuf), ScriptoriumError> {
    let record = compile_document(doc, config, options)?;
    let artifact_path = persist_record(&record, &doc.artifact_rel_path(), writer)?;
    Ok((record, artifact_path))
}
