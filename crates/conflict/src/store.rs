//! Persistent per-file sync-state storage.
//!
//! One JSON document per store directory, written atomically (tempfile in
//! the same directory, then rename). Loading tolerates a missing or corrupt
//! document — conflict detection simply starts from an empty map.

use chrono::{DateTime, Utc};
use mdsync_core::constants::SYNC_STATE_FILE_NAME;
use mdsync_core::{Error, FileRecord, Result, ResultExt};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Last-known sync state for one local file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// State the CLI reported when this file was last synced
    pub state: String,
    pub full_name: String,
    pub type_name: String,
    /// SHA-256 of the local file content at sync time, when it was readable
    pub content_hash: Option<String>,
    pub synced_at: DateTime<Utc>,
}

/// On-disk document shape.
#[derive(Debug, Default, Serialize, Deserialize)]
struct SyncStateDocument {
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    entries: HashMap<String, CacheEntry>,
}

/// Path→`CacheEntry` map persisted under a store directory.
///
/// Entries are only ever upserted by push/pull results or explicitly
/// cleared; a file absent from one result keeps its previous entry. All IO
/// failures degrade to a `tracing::warn!` — the surrounding operation must
/// never abort because conflict bookkeeping hiccupped.
pub struct PersistentStorage {
    workspace_root: PathBuf,
    store_path: PathBuf,
    entries: HashMap<String, CacheEntry>,
}

impl PersistentStorage {
    /// Open (or initialize) the store under `store_dir`, resolving relative
    /// file paths against `workspace_root` when hashing local content.
    pub fn open(store_dir: impl Into<PathBuf>, workspace_root: impl Into<PathBuf>) -> Self {
        let store_path = store_dir.into().join(SYNC_STATE_FILE_NAME);
        let entries = match load_document(&store_path) {
            Ok(document) => document.entries,
            Err(e) => {
                warn!(
                    path = %store_path.display(),
                    error = %e,
                    "could not load sync-state document, starting empty"
                );
                HashMap::new()
            }
        };
        Self {
            workspace_root: workspace_root.into(),
            store_path,
            entries,
        }
    }

    /// The conventional per-user store directory
    pub fn default_store_dir() -> Option<PathBuf> {
        dirs::cache_dir().map(|dir| dir.join("mdsync"))
    }

    /// Last known entry for `path`, or `None` for files never synced
    pub fn get(&self, path: &str) -> Option<&CacheEntry> {
        self.entries.get(path)
    }

    /// Root against which relative file paths are resolved
    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Idempotently upsert one entry per file record after a push or pull,
    /// then persist. Entries for files absent from `files` are untouched.
    /// Returns the number of entries written; failures are logged, never
    /// raised.
    pub fn set_properties_for_files_push_pull(&mut self, files: &[FileRecord]) -> usize {
        let now = Utc::now();
        let mut written = 0;
        for record in files {
            let Some(path) = record.file_path.as_deref() else {
                debug!(
                    full_name = %record.full_name,
                    "skipping record without a file path"
                );
                continue;
            };
            let content_hash = hash_local_file(&self.workspace_root.join(path));
            self.entries.insert(
                path.to_string(),
                CacheEntry {
                    state: record.state.clone(),
                    full_name: record.full_name.clone(),
                    type_name: record.type_name.clone(),
                    content_hash,
                    synced_at: now,
                },
            );
            written += 1;
        }

        if written > 0 {
            if let Err(e) = self.persist() {
                warn!(
                    path = %self.store_path.display(),
                    error = %e,
                    "failed to persist sync state; conflict detection may be stale"
                );
            }
        }
        written
    }

    /// Explicitly drop every entry and persist the empty document
    pub fn clear(&mut self) {
        self.entries.clear();
        if let Err(e) = self.persist() {
            warn!(error = %e, "failed to persist cleared sync state");
        }
    }

    fn persist(&self) -> Result<()> {
        let parent = self
            .store_path
            .parent()
            .ok_or_else(|| Error::configuration("sync-state path has no parent directory"))?;
        std::fs::create_dir_all(parent)
            .map_err(|e| Error::file_system(parent, "create_dir_all", e))?;

        let document = SyncStateDocument {
            updated_at: Some(Utc::now()),
            entries: self.entries.clone(),
        };
        let json = serde_json::to_string_pretty(&document)?;

        // Atomic replace: write next to the target, then rename over it.
        let mut tmp = tempfile::NamedTempFile::new_in(parent)
            .map_err(|e| Error::file_system(parent, "tempfile", e))?;
        tmp.write_all(json.as_bytes())
            .map_err(|e| Error::file_system(&self.store_path, "write", e))?;
        tmp.persist(&self.store_path)
            .map_err(|e| Error::file_system(&self.store_path, "rename", e.error))?;
        Ok(())
    }
}

fn load_document(path: &Path) -> Result<SyncStateDocument> {
    if !path.exists() {
        return Ok(SyncStateDocument::default());
    }
    let contents =
        std::fs::read_to_string(path).map_err(|e| Error::file_system(path, "read", e))?;
    serde_json::from_str(&contents).context("parsing sync-state document")
}

/// SHA-256 hex digest of a local file, or `None` when it cannot be read
pub(crate) fn hash_local_file(path: &Path) -> Option<String> {
    match std::fs::read(path) {
        Ok(bytes) => {
            let mut hasher = Sha256::new();
            hasher.update(&bytes);
            Some(hex::encode(hasher.finalize()))
        }
        Err(e) => {
            debug!(path = %path.display(), error = %e, "could not hash local file");
            None
        }
    }
}
