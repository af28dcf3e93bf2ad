//! Pre-operation conflict detection against the persistent sync state.

use crate::store::{hash_local_file, PersistentStorage};
use tracing::debug;

/// Outcome of a conflict scan over a set of workspace-relative paths.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConflictCheck {
    /// Files whose local content no longer matches the last-synced hash
    pub conflicts: Vec<String>,
    /// Files the detector could not judge: never synced, synced without a
    /// hash, or currently unreadable
    pub unknown: Vec<String>,
}

impl ConflictCheck {
    pub fn has_conflicts(&self) -> bool {
        !self.conflicts.is_empty()
    }
}

/// Flags files whose local edits since the last sync would be overwritten
/// by a deploy or clobbered by a retrieve.
///
/// The detector is advisory: paths it cannot judge land in
/// [`ConflictCheck::unknown`] and the caller decides whether to proceed.
pub struct TimestampConflictDetector<'a> {
    storage: &'a PersistentStorage,
}

impl<'a> TimestampConflictDetector<'a> {
    pub fn new(storage: &'a PersistentStorage) -> Self {
        Self { storage }
    }

    /// Compare each path's current content hash with its cached one.
    pub fn check<I, S>(&self, paths: I) -> ConflictCheck
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut result = ConflictCheck::default();
        for path in paths {
            let path = path.as_ref();
            let Some(cached) = self
                .storage
                .get(path)
                .and_then(|entry| entry.content_hash.as_deref())
            else {
                debug!(path, "no cached hash, cannot judge conflict");
                result.unknown.push(path.to_string());
                continue;
            };
            match hash_local_file(&self.storage.workspace_root().join(path)) {
                Some(current) if current == cached => {}
                Some(_) => result.conflicts.push(path.to_string()),
                None => result.unknown.push(path.to_string()),
            }
        }
        result
    }
}
