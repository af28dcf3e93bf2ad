//! Persistent sync-state cache and pre-operation conflict detection.
//!
//! After a successful (or partially successful) push or pull, the engine
//! records each affected file's last-synced content signature in a
//! [`PersistentStorage`]. Before a later deploy or retrieve, a
//! [`TimestampConflictDetector`] compares the on-disk state against those
//! records and flags files whose local edits would be overwritten.
//!
//! Cache IO failures are never fatal: they degrade to "conflict detection
//! unavailable for this file", logged through `tracing`, and the
//! surrounding operation continues.

pub mod detector;
pub mod store;

pub use detector::{ConflictCheck, TimestampConflictDetector};
pub use store::{CacheEntry, PersistentStorage};
