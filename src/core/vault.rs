//! Vault layout and document discovery.
//!
//! The vault is a directory tree of numbered collections, each holding
//! sovereign pairs: a markdown source and its compiled JSON artifact sharing
//! a file stem. Collections are discovered by predicate, never enumerated by
//! name, so a new numbered directory is picked up on the next run with no
//! code change.

use crate::core::error::ScriptoriumError;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};

/// Extension of human-authored source documents.
pub const SOURCE_EXT: &str = "md";
/// Extension of compiled canonical artifacts.
pub const ARTIFACT_EXT: &str = "json";

/// Explicit collection-recognition predicate.
///
/// The default matches the numeric-prefix convention (`01_foundations`,
/// `02_medicine`, ...). Callers with a different convention supply their own
/// pattern instead of patching the core.
#[derive(Debug, Clone)]
pub struct CollectionMatcher {
    pattern: Regex,
}

impl CollectionMatcher {
    /// Directories named like `NN_name`.
    pub fn numeric_prefix() -> Self {
        CollectionMatcher {
            pattern: Regex::new(r"^\d{2}_").expect("numeric prefix regex"),
        }
    }

    pub fn custom(pattern: Regex) -> Self {
        CollectionMatcher { pattern }
    }

    pub fn matches(&self, directory_name: &str) -> bool {
        self.pattern.is_match(directory_name)
    }
}

impl Default for CollectionMatcher {
    fn default() -> Self {
        CollectionMatcher::numeric_prefix()
    }
}

/// One loaded source document. Immutable once loaded; re-read on every
/// compile invocation so there is no cached staleness.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    /// Absolute path on disk.
    pub path: PathBuf,
    /// Path relative to the vault root, used for artifact pairing.
    pub relative_path: PathBuf,
    pub raw_text: String,
}

impl SourceDocument {
    /// Document id: the shared stem of the sovereign pair.
    pub fn id(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Vault-relative path of the paired canonical artifact.
    pub fn artifact_rel_path(&self) -> PathBuf {
        self.relative_path.with_extension(ARTIFACT_EXT)
    }
}

/// A source file that could not be loaded. Reported per document so one bad
/// file never aborts discovery of its siblings.
#[derive(Debug)]
pub struct DecodeFailure {
    pub path: PathBuf,
    pub error: ScriptoriumError,
}

/// Result of walking the vault.
#[derive(Debug, Default)]
pub struct Discovery {
    /// Collection directory names that matched the predicate, sorted.
    pub collections: Vec<String>,
    pub documents: Vec<SourceDocument>,
    pub failures: Vec<DecodeFailure>,
}

/// Handle on a vault root.
#[derive(Debug, Clone)]
pub struct Vault {
    pub root: PathBuf,
}

impl Vault {
    pub fn new(root: PathBuf) -> Self {
        Vault { root }
    }

    /// Walk matching collections and load every source document.
    pub fn discover(&self, matcher: &CollectionMatcher) -> Result<Discovery, ScriptoriumError> {
        if !self.root.is_dir() {
            return Err(ScriptoriumError::Discovery(format!(
                "vault root {} does not exist or is not a directory",
                self.root.display()
            )));
        }

        let mut discovery = Discovery::default();
        let mut collection_dirs = Vec::new();
        let entries = fs::read_dir(&self.root).map_err(|e| {
            ScriptoriumError::Discovery(format!("cannot read {}: {}", self.root.display(), e))
        })?;
        for entry in entries {
            let entry = entry.map_err(|e| {
                ScriptoriumError::Discovery(format!("cannot read {}: {}", self.root.display(), e))
            })?;
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if matcher.matches(&name) {
                collection_dirs.push((name, path));
            }
        }
        collection_dirs.sort_by(|a, b| a.0.cmp(&b.0));

        for (name, dir) in collection_dirs {
            self.load_collection(&name, &dir, &mut discovery)?;
            discovery.collections.push(name);
        }
        Ok(discovery)
    }

    fn load_collection(
        &self,
        name: &str,
        dir: &Path,
        discovery: &mut Discovery,
    ) -> Result<(), ScriptoriumError> {
        let entries = fs::read_dir(dir).map_err(|e| {
            ScriptoriumError::Discovery(format!("cannot read {}: {}", dir.display(), e))
        })?;
        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.is_file() && path.extension().is_some_and(|ext| ext == SOURCE_EXT)
            })
            .collect();
        files.sort();

        for path in files {
            let relative_path = Path::new(name).join(path.file_name().unwrap_or_default());
            match fs::read_to_string(&path) {
                Ok(raw_text) => discovery.documents.push(SourceDocument {
                    path: path.clone(),
                    relative_path,
                    raw_text,
                }),
                Err(e) => discovery.failures.push(DecodeFailure {
                    path: path.clone(),
                    error: ScriptoriumError::Decode {
                        path,
                        detail: e.to_string(),
                    },
                }),
            }
        }
        Ok(())
    }

    /// Load a single document by path, inside or outside a collection.
    pub fn load_document(&self, path: &Path) -> Result<SourceDocument, ScriptoriumError> {
        let raw_text = fs::read_to_string(path).map_err(|e| ScriptoriumError::Decode {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?;
        let relative_path = path
            .strip_prefix(&self.root)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| PathBuf::from(path.file_name().unwrap_or_default()));
        Ok(SourceDocument {
            path: path.to_path_buf(),
            relative_path,
            raw_text,
        })
    }
}
