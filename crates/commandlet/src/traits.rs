//! The four seams of a commandlet.
//!
//! Hosts supply implementations of these traits; the state machine in
//! [`crate::commandlet`] only ever talks to the seams, never to a concrete
//! UI, prompt, or process API.

use crate::executor::OperationReport;
use async_trait::async_trait;
use mdsync_core::Result;
use mdsync_exec::{CancellationToken, Command};

/// Gate that runs before anything else. A `false` halts the operation
/// without gathering parameters or spawning a process.
#[async_trait]
pub trait PreconditionChecker: Send + Sync {
    async fn check(&self) -> bool;
}

/// What a parameter gatherer resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParameterResponse<T> {
    /// Proceed with the gathered parameters
    Continue(T),
    /// The user backed out; `message` is surfaced when present
    Cancel { message: Option<String> },
}

/// Collects the operation's parameters, typically by prompting. May suspend
/// for as long as the user takes; the state machine waits.
#[async_trait]
pub trait ParametersGatherer<T>: Send + Sync {
    async fn gather(&self) -> ParameterResponse<T>;
}

/// Verifies the executed operation's result before it counts as done.
#[async_trait]
pub trait PostconditionChecker<T>: Send + Sync {
    async fn check(&self, data: &T, report: &OperationReport) -> bool;
}

/// Builds and runs the CLI invocation for gathered parameters.
#[async_trait]
pub trait CommandletExecutor<T>: Send + Sync {
    /// The invocation this executor would run for `data`
    fn build(&self, data: &T) -> Command;

    /// Run the invocation to its terminal event and report the parsed
    /// outcome. `Err` is reserved for spawn and parse failures.
    async fn execute(&self, data: &T, cancellation: &CancellationToken) -> Result<OperationReport>;
}

/// Precondition that always passes.
pub struct EmptyPreChecker;

#[async_trait]
impl PreconditionChecker for EmptyPreChecker {
    async fn check(&self) -> bool {
        true
    }
}

/// Postcondition that accepts every report.
pub struct EmptyPostChecker;

#[async_trait]
impl<T: Send + Sync> PostconditionChecker<T> for EmptyPostChecker {
    async fn check(&self, _data: &T, _report: &OperationReport) -> bool {
        true
    }
}
