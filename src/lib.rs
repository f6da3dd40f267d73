//! Scriptorium: a content compiler for the sovereign vault.
//!
//! **Scriptorium is a local-first compiler for dialect-annotated markdown.**
//!
//! Source documents carry a frontmatter block, embedded `!slide{}` directive
//! blocks, and pause markers. The compiler turns each document into a
//! canonical JSON record (the sovereign pair of the source) and persists it
//! with snapshot-before-write durability and full history retention.
//!
//! # Core Principles
//!
//! - **Local-first**: the vault filesystem is the only state
//! - **Deterministic**: recompiling unchanged input yields identical records
//!   (modulo `compiled_at`)
//! - **Transactional writes**: a destination is fully old or fully new, never
//!   mixed; prior bytes are always snapshotted first
//! - **Isolation**: one malformed document never aborts its batch siblings
//!
//! # Crate Structure
//!
//! - [`core::vault`]: collection discovery and document loading
//! - [`core::frontmatter`] / [`core::dialect`]: the parsing front end
//! - [`core::estimate`] / [`core::record`]: duration derivation and record
//!   assembly
//! - [`core::writer`]: the atomic versioned writer
//! - [`core::pipeline`]: orchestration and batch isolation

pub mod core;

use core::config::CompileConfig;
use core::error::ScriptoriumError;
use core::output;
use core::pipeline::{self, CompileOptions, DocOutcome};
use core::vault::{CollectionMatcher, Vault};
use core::writer::AtomicWriter;

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;

/// Default configuration file looked up in the working directory.
const CONFIG_FILE_NAME: &str = "scriptorium.toml";

#[derive(Parser, Debug)]
#[clap(
    name = "scriptorium",
    version = env!("CARGO_PKG_VERSION"),
    about = "Content compiler and versioned vault"
)]
struct Cli {
    #[clap(subcommand)]
    command: Command,

    /// Configuration file (defaults to ./scriptorium.toml when present).
    #[clap(long, global = true)]
    config: Option<PathBuf>,

    /// Vault root, overriding the configuration file.
    #[clap(long, global = true)]
    vault_root: Option<PathBuf>,

    /// Narration speed for duration estimation.
    #[clap(long, global = true)]
    words_per_minute: Option<f64>,

    /// Seconds added per pause trigger.
    #[clap(long, global = true)]
    pause_weight_seconds: Option<f64>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compile one source document and print its canonical record
    #[clap(name = "compile", visible_alias = "c")]
    Compile {
        /// Path to the source markdown file.
        path: PathBuf,
        /// Skip structurally invalid directive blocks instead of failing.
        #[clap(long)]
        best_effort: bool,
        /// Also persist the record to the sovereign artifact path.
        #[clap(long)]
        write: bool,
    },

    /// Compile and persist every document in the vault
    #[clap(name = "batch", visible_alias = "b")]
    Batch {
        /// Skip structurally invalid directive blocks instead of failing.
        #[clap(long)]
        best_effort: bool,
        /// Output format: 'text' or 'json'.
        #[clap(long, default_value = "text")]
        format: String,
    },

    /// List collections and sovereign pairs without compiling
    #[clap(name = "discover", visible_alias = "d")]
    Discover,

    /// List retained history snapshots for a vault-relative artifact path
    #[clap(name = "history", visible_alias = "h")]
    History {
        /// Vault-relative artifact path, e.g. `01_intro/lesson_001.json`.
        rel_path: PathBuf,
    },
}

fn resolve_config(cli: &Cli) -> Result<CompileConfig, ScriptoriumError> {
    let mut config = if let Some(path) = &cli.config {
        CompileConfig::load(path)?
    } else if Path::new(CONFIG_FILE_NAME).is_file() {
        CompileConfig::load(Path::new(CONFIG_FILE_NAME))?
    } else {
        let Some(vault_root) = cli.vault_root.clone() else {
            return Err(ScriptoriumError::Configuration(format!(
                "no {} found and no --vault-root given",
                CONFIG_FILE_NAME
            )));
        };
        CompileConfig::new(vault_root)
    };

    if let Some(vault_root) = &cli.vault_root {
        config.vault_root = vault_root.clone();
    }
    if let Some(wpm) = cli.words_per_minute {
        config.words_per_minute = wpm;
    }
    if let Some(pause_weight) = cli.pause_weight_seconds {
        config.pause_weight_seconds = pause_weight;
    }
    Ok(config)
}

pub fn run() -> Result<(), ScriptoriumError> {
    let cli = Cli::parse();
    let config = resolve_config(&cli)?;

    match cli.command {
        Command::Compile {
            path,
            best_effort,
            write,
        } => {
            let options = CompileOptions { best_effort };
            let record = pipeline::compile(&path, &config, &options)?;
            if write {
                let vault = Vault::new(config.vault_root.clone());
                let doc = vault.load_document(&path)?;
                let writer = AtomicWriter::new(config.vault_root.clone(), config.history_root());
                let artifact_path =
                    pipeline::persist_record(&record, &doc.artifact_rel_path(), &writer)?;
                eprintln!(
                    "{} wrote {}",
                    "✓".bright_green(),
                    artifact_path.display().to_string().bright_white()
                );
            }
            println!(
                "{}",
                serde_json::to_string_pretty(&record).map_err(|e| {
                    ScriptoriumError::Storage(format!("cannot serialize record: {}", e))
                })?
            );
        }

        Command::Batch {
            best_effort,
            format,
        } => {
            let options = CompileOptions { best_effort };
            let cancel = AtomicBool::new(false);
            let report = pipeline::compile_batch(
                &config,
                &CollectionMatcher::numeric_prefix(),
                &options,
                &cancel,
            )?;

            if format == "json" {
                print_batch_json(&report)?;
            } else {
                print_batch_text(&report);
            }
            if !report.is_clean() {
                std::process::exit(1);
            }
        }

        Command::Discover => {
            let vault = Vault::new(config.vault_root.clone());
            let discovery = vault.discover(&CollectionMatcher::numeric_prefix())?;
            for collection in &discovery.collections {
                println!("{}", collection.bright_cyan().bold());
                for doc in discovery
                    .documents
                    .iter()
                    .filter(|doc| doc.relative_path.starts_with(collection))
                {
                    println!(
                        "  {} {} {} {}",
                        "▸".bright_cyan(),
                        doc.id().bright_white(),
                        "⇒".bright_black(),
                        doc.artifact_rel_path().display()
                    );
                }
            }
            for failure in &discovery.failures {
                println!(
                    "  {} {} {}",
                    "✗".bright_red(),
                    failure.path.display(),
                    output::compact_line(&failure.error.to_string(), 80).bright_black()
                );
            }
        }

        Command::History { rel_path } => {
            let writer = AtomicWriter::new(config.vault_root.clone(), config.history_root());
            let snapshots = writer.list_snapshots(&rel_path)?;
            if snapshots.is_empty() {
                println!("No snapshots retained for {}", rel_path.display());
            } else {
                for snapshot in snapshots {
                    println!("{}  {} bytes", snapshot.name, snapshot.size);
                }
            }
        }
    }
    Ok(())
}

fn print_batch_text(report: &pipeline::BatchReport) {
    for item in &report.items {
        match &item.outcome {
            DocOutcome::Compiled { record, .. } => {
                println!(
                    "{} {} {}",
                    "✓".bright_green(),
                    item.relative_path.display().to_string().bright_white(),
                    format!(
                        "({} words, {} pauses, {:.1}s)",
                        record.word_count, record.pause_count, record.duration_seconds
                    )
                    .bright_black()
                );
            }
            DocOutcome::Failed(error) => {
                println!(
                    "{} {} {}",
                    "✗".bright_red(),
                    item.relative_path.display().to_string().bright_white(),
                    output::compact_line(&error.to_string(), 100).bright_red()
                );
            }
            DocOutcome::Cancelled => {
                println!(
                    "{} {} {}",
                    "⊘".bright_yellow(),
                    item.relative_path.display().to_string().bright_white(),
                    "cancelled".bright_yellow()
                );
            }
        }
    }
    for failure in &report.decode_failures {
        println!(
            "{} {} {}",
            "✗".bright_red(),
            failure.path.display().to_string().bright_white(),
            output::compact_line(&failure.error.to_string(), 100).bright_red()
        );
    }
    println!();
    println!(
        "{} compiled, {} failed, {} cancelled across {} collections",
        report.compiled_count().to_string().bright_green(),
        report.failed_count().to_string().bright_red(),
        report.cancelled_count().to_string().bright_yellow(),
        report.collections.len()
    );
}

fn print_batch_json(report: &pipeline::BatchReport) -> Result<(), ScriptoriumError> {
    let items: Vec<serde_json::Value> = report
        .items
        .iter()
        .map(|item| match &item.outcome {
            DocOutcome::Compiled {
                record,
                artifact_path,
            } => serde_json::json!({
                "source": item.relative_path,
                "status": "compiled",
                "artifact": artifact_path,
                "word_count": record.word_count,
                "pause_count": record.pause_count,
                "duration_seconds": record.duration_seconds,
            }),
            DocOutcome::Failed(error) => serde_json::json!({
                "source": item.relative_path,
                "status": "failed",
                "error": error.to_string(),
            }),
            DocOutcome::Cancelled => serde_json::json!({
                "source": item.relative_path,
                "status": "cancelled",
            }),
        })
        .collect();
    let envelope = serde_json::json!({
        "collections": report.collections,
        "items": items,
        "decode_failures": report
            .decode_failures
            .iter()
            .map(|f| serde_json::json!({ "path": f.path, "error": f.error.to_string() }))
            .collect::<Vec<_>>(),
        "cancelled_at": report.cancelled_at,
    });
    println!(
        "{}",
        serde_json::to_string_pretty(&envelope)
            .map_err(|e| ScriptoriumError::Storage(format!("cannot serialize report: {}", e)))?
    );
    Ok(())
}
