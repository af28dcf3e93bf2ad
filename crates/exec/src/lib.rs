//! Command construction and cancellable process execution.
//!
//! The flow through this crate: a [`CommandBuilder`] produces an immutable
//! [`Command`]; a [`CliCommandExecutor`] spawns it and hands back an
//! [`Execution`] — a read-only, multi-subscriber handle over the process's
//! stdout/stderr chunks and its single terminal outcome. Cancellation is
//! cooperative via [`CancellationToken`].

pub mod cancellation;
pub mod command;
pub mod execution;
pub mod executor;

pub use cancellation::CancellationToken;
pub use command::{Command, CommandBuilder};
pub use execution::{Execution, ExecutionOutcome};
pub use executor::{CliCommandExecutor, ExecutorOptions};
