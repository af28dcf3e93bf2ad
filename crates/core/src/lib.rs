//! Core domain types, errors, and constants for the `mdsync` engine.
//!
//! This crate establishes the foundational building blocks shared by every
//! other crate in the workspace:
//!
//! - **`errors`**: the primary `Error` enum and `Result` type alias,
//!   centralizing all failure modes for predictable error handling.
//! - **`types`**: domain data structures such as `FileRecord`, the normalized
//!   shape of per-file results flowing between the parsers, the sync-state
//!   cache, and the orchestration layer.
//! - **`constants`**: shared static constants — conflict sentinel names,
//!   environment variable names, and telemetry log names.
//! - **`events`**: the operation-level event emitter used to fan out command
//!   lifecycle notifications to independently registered subscribers.

pub mod constants;
pub mod diagnostics;
pub mod errors;
pub mod events;
pub mod types;

pub use self::{
    constants::*,
    errors::{Error, Result, ResultExt},
    events::{EventEmitter, EventSubscriber, OperationEvent},
    types::{FileFailure, FileRecord},
};
