//! Atomic versioned writes to the vault.
//!
//! Every write is snapshot-first: if the destination already exists, its
//! current bytes are copied verbatim into the history store before the
//! destination is touched. The primary write then goes through a temp file
//! and `fs::rename`, so a crash leaves the destination fully old or fully
//! new, never mixed.
//!
//! Mutual exclusion is scoped per destination path, never global. The lock
//! registry follows the leaked-entry pattern: entries live for the process
//! lifetime, writers to different paths proceed unimpeded, and writers to
//! the same path serialize through that path's mutex.

use crate::core::error::ScriptoriumError;
use crate::core::time;
use rustc_hash::FxHashMap;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::{Mutex, OnceLock, TryLockError};
use std::thread;
use std::time::{Duration, Instant};

/// Base delay for lock-acquisition backoff (milliseconds).
const BASE_DELAY_MS: u64 = 2;
/// Backoff delay cap (milliseconds).
const MAX_DELAY_MS: u64 = 50;
/// Default bound on how long a blocking write may wait for its path lock.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(10);

/// Per-destination entry holding the write mutex for that path.
struct PathEntry {
    lock: Mutex<()>,
}

/// Registry of per-path write locks.
pub struct WriterPool {
    entries: Mutex<FxHashMap<PathBuf, &'static PathEntry>>,
}

impl WriterPool {
    fn new() -> Self {
        WriterPool {
            entries: Mutex::new(FxHashMap::default()),
        }
    }

    fn entry(&self, path: &Path) -> Result<&'static PathEntry, ScriptoriumError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| ScriptoriumError::LockContention("writer pool lock poisoned".into()))?;
        if let Some(entry) = entries.get(path) {
            return Ok(*entry);
        }
        let entry = Box::leak(Box::new(PathEntry {
            lock: Mutex::new(()),
        }));
        entries.insert(path.to_path_buf(), entry);
        Ok(entry)
    }
}

/// Global pool instance (same lifetime as the process).
pub fn global_pool() -> &'static WriterPool {
    static POOL: OnceLock<WriterPool> = OnceLock::new();
    POOL.get_or_init(WriterPool::new)
}

/// Acknowledgement of a committed write.
#[derive(Debug)]
pub struct WriteAck {
    /// Absolute destination path.
    pub path: PathBuf,
    /// History snapshot taken before this write, when the destination
    /// already existed.
    pub snapshot: Option<PathBuf>,
    pub bytes_written: u64,
    /// SHA-256 of the committed bytes.
    pub content_hash: String,
}

/// One retained snapshot in the history store.
#[derive(Debug)]
pub struct SnapshotInfo {
    pub name: String,
    pub size: u64,
}

/// Writer bound to one vault root and its history store.
#[derive(Debug, Clone)]
pub struct AtomicWriter {
    vault_root: PathBuf,
    history_root: PathBuf,
    lock_timeout: Duration,
}

impl AtomicWriter {
    pub fn new(vault_root: PathBuf, history_root: PathBuf) -> Self {
        AtomicWriter {
            vault_root,
            history_root,
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }

    pub fn with_lock_timeout(mut self, lock_timeout: Duration) -> Self {
        self.lock_timeout = lock_timeout;
        self
    }

    /// Write `bytes` to `rel_path` under the vault root, waiting up to the
    /// configured lock timeout for same-path writers to finish.
    pub fn write(&self, rel_path: &Path, bytes: &[u8]) -> Result<WriteAck, ScriptoriumError> {
        self.write_inner(rel_path, bytes, true)
    }

    /// Non-blocking variant: fails immediately with `LockContention` when
    /// another writer holds this destination's lock.
    pub fn try_write(&self, rel_path: &Path, bytes: &[u8]) -> Result<WriteAck, ScriptoriumError> {
        self.write_inner(rel_path, bytes, false)
    }

    fn write_inner(
        &self,
        rel_path: &Path,
        bytes: &[u8],
        block: bool,
    ) -> Result<WriteAck, ScriptoriumError> {
        let dest = self.resolve_destination(rel_path)?;
        let entry = global_pool().entry(&dest)?;

        let _guard = if block {
            acquire_with_timeout(&entry.lock, &dest, self.lock_timeout)?
        } else {
            match entry.lock.try_lock() {
                Ok(guard) => guard,
                Err(TryLockError::WouldBlock) => {
                    return Err(ScriptoriumError::LockContention(format!(
                        "destination {} is locked by another writer",
                        dest.display()
                    )));
                }
                Err(TryLockError::Poisoned(_)) => {
                    return Err(ScriptoriumError::LockContention(format!(
                        "lock for {} is poisoned",
                        dest.display()
                    )));
                }
            }
        };

        // Snapshot-first ordering is mandatory: the destination is never
        // touched when its prior bytes could not be committed to history.
        let snapshot = self.snapshot_existing(&dest, rel_path)?;

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                ScriptoriumError::Storage(format!("cannot create {}: {}", parent.display(), e))
            })?;
        }

        let file_name = dest
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "artifact".to_string());
        let tmp = dest
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(format!(".{}.tmp.{}", file_name, ulid::Ulid::new()));

        if let Err(e) = fs::write(&tmp, bytes) {
            let _ = fs::remove_file(&tmp);
            return Err(ScriptoriumError::Storage(format!(
                "cannot write temp file {}: {}",
                tmp.display(),
                e
            )));
        }
        if let Err(e) = fs::rename(&tmp, &dest) {
            let _ = fs::remove_file(&tmp);
            return Err(ScriptoriumError::Storage(format!(
                "cannot replace {}: {}",
                dest.display(),
                e
            )));
        }

        let mut hasher = Sha256::new();
        hasher.update(bytes);
        Ok(WriteAck {
            path: dest,
            snapshot,
            bytes_written: bytes.len() as u64,
            content_hash: format!("{:x}", hasher.finalize()),
        })
    }

    /// Copy the destination's current bytes into the history store.
    ///
    /// A snapshot is taken on every overwrite, including byte-identical
    /// rewrites: history records write events, not content deltas.
    fn snapshot_existing(
        &self,
        dest: &Path,
        rel_path: &Path,
    ) -> Result<Option<PathBuf>, ScriptoriumError> {
        if !dest.exists() {
            return Ok(None);
        }
        let current = fs::read(dest).map_err(|e| {
            ScriptoriumError::Storage(format!(
                "cannot read {} for snapshot: {}",
                dest.display(),
                e
            ))
        })?;

        let snapshot_dir = self.history_root.join(rel_path);
        fs::create_dir_all(&snapshot_dir).map_err(|e| {
            ScriptoriumError::Storage(format!(
                "cannot create history dir {}: {}",
                snapshot_dir.display(),
                e
            ))
        })?;
        let snapshot_id = time::new_snapshot_id();
        let snapshot_path = snapshot_dir.join(&snapshot_id);
        let tmp = snapshot_dir.join(format!(".{}.tmp", snapshot_id));

        if let Err(e) = fs::write(&tmp, &current) {
            let _ = fs::remove_file(&tmp);
            return Err(ScriptoriumError::Storage(format!(
                "cannot write snapshot {}: {}",
                snapshot_path.display(),
                e
            )));
        }
        if let Err(e) = fs::rename(&tmp, &snapshot_path) {
            let _ = fs::remove_file(&tmp);
            return Err(ScriptoriumError::Storage(format!(
                "cannot commit snapshot {}: {}",
                snapshot_path.display(),
                e
            )));
        }
        Ok(Some(snapshot_path))
    }

    /// List retained snapshots for a destination, oldest first. The core
    /// never prunes this directory.
    pub fn list_snapshots(&self, rel_path: &Path) -> Result<Vec<SnapshotInfo>, ScriptoriumError> {
        check_vault_relative(rel_path)?;
        let dir = self.history_root.join(rel_path);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let entries = fs::read_dir(&dir).map_err(|e| {
            ScriptoriumError::Storage(format!("cannot read {}: {}", dir.display(), e))
        })?;
        let mut snapshots = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| {
                ScriptoriumError::Storage(format!("cannot read {}: {}", dir.display(), e))
            })?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') {
                continue;
            }
            let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
            snapshots.push(SnapshotInfo { name, size });
        }
        snapshots.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(snapshots)
    }

    /// Join `rel_path` under the vault root, rejecting traversal outside it.
    fn resolve_destination(&self, rel_path: &Path) -> Result<PathBuf, ScriptoriumError> {
        check_vault_relative(rel_path)?;
        Ok(self.vault_root.join(rel_path))
    }
}

/// Reject absolute paths and `..` components. Applies to every user-supplied
/// vault-relative path, whether it ends up under the vault root or the
/// history root.
fn check_vault_relative(rel_path: &Path) -> Result<(), ScriptoriumError> {
    if rel_path.is_absolute() {
        return Err(ScriptoriumError::Storage(format!(
            "destination must be vault-relative, got {}",
            rel_path.display()
        )));
    }
    for component in rel_path.components() {
        if matches!(component, Component::ParentDir) {
            return Err(ScriptoriumError::Storage(format!(
                "path traversal detected in {}",
                rel_path.display()
            )));
        }
    }
    Ok(())
}

/// Poll a path lock with backoff until acquired or the deadline passes.
fn acquire_with_timeout<'a>(
    lock: &'a Mutex<()>,
    dest: &Path,
    timeout: Duration,
) -> Result<std::sync::MutexGuard<'a, ()>, ScriptoriumError> {
    let deadline = Instant::now() + timeout;
    let mut delay_ms = BASE_DELAY_MS;
    loop {
        match lock.try_lock() {
            Ok(guard) => return Ok(guard),
            Err(TryLockError::WouldBlock) => {
                if Instant::now() >= deadline {
                    return Err(ScriptoriumError::Timeout(format!(
                        "timed out after {:?} waiting for lock on {}",
                        timeout,
                        dest.display()
                    )));
                }
                thread::sleep(Duration::from_millis(delay_ms));
                delay_ms = (delay_ms * 2).min(MAX_DELAY_MS);
            }
            Err(TryLockError::Poisoned(_)) => {
                return Err(ScriptoriumError::LockContention(format!(
                    "lock for {} is poisoned",
                    dest.display()
                )));
            }
        }
    }
}
