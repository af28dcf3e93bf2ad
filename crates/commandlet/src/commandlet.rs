//! The per-operation state machine.

use crate::executor::{OperationReport, OperationStatus};
use crate::traits::{
    CommandletExecutor, EmptyPostChecker, ParameterResponse, ParametersGatherer,
    PostconditionChecker, PreconditionChecker,
};
use mdsync_core::Result;
use mdsync_exec::CancellationToken;
use tracing::debug;

/// Where a commandlet currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandletState {
    Idle,
    PreconditionCheck,
    GatheringParameters,
    Executing,
    PostconditionCheck,
    Done,
    /// Absorbing: reachable from gathering or executing, never left
    Cancelled,
}

/// How a commandlet run ended.
#[derive(Debug)]
pub enum CommandletOutcome {
    /// The precondition refused; nothing was gathered or spawned
    PreconditionFailed,
    Cancelled { message: Option<String> },
    /// The operation ran but its result failed verification
    PostconditionFailed(OperationReport),
    Completed(OperationReport),
}

/// One user-invoked operation: precondition, parameter gathering, execution,
/// postcondition, strictly in that order.
///
/// Every transition is awaited to completion before the next begins; in
/// particular, execution never starts while parameter gathering is still
/// suspended on the user.
pub struct Commandlet<T> {
    prechecker: Box<dyn PreconditionChecker>,
    gatherer: Box<dyn ParametersGatherer<T>>,
    executor: Box<dyn CommandletExecutor<T>>,
    postchecker: Box<dyn PostconditionChecker<T>>,
    state: CommandletState,
}

impl<T: Send + Sync> Commandlet<T> {
    pub fn new(
        prechecker: Box<dyn PreconditionChecker>,
        gatherer: Box<dyn ParametersGatherer<T>>,
        executor: Box<dyn CommandletExecutor<T>>,
    ) -> Self {
        Self {
            prechecker,
            gatherer,
            executor,
            postchecker: Box::new(EmptyPostChecker),
            state: CommandletState::Idle,
        }
    }

    pub fn with_postchecker(mut self, postchecker: Box<dyn PostconditionChecker<T>>) -> Self {
        self.postchecker = postchecker;
        self
    }

    pub fn state(&self) -> CommandletState {
        self.state
    }

    /// Drive the operation to a terminal outcome. `Err` surfaces only spawn
    /// and parse failures from the executor.
    pub async fn run(&mut self, cancellation: &CancellationToken) -> Result<CommandletOutcome> {
        self.transition(CommandletState::PreconditionCheck);
        if !self.prechecker.check().await {
            // Halt before anything observable happens.
            self.transition(CommandletState::Idle);
            return Ok(CommandletOutcome::PreconditionFailed);
        }

        self.transition(CommandletState::GatheringParameters);
        let data = match self.gatherer.gather().await {
            ParameterResponse::Continue(data) => data,
            ParameterResponse::Cancel { message } => {
                self.transition(CommandletState::Cancelled);
                return Ok(CommandletOutcome::Cancelled { message });
            }
        };

        self.transition(CommandletState::Executing);
        let report = self.executor.execute(&data, cancellation).await?;
        if report.status == OperationStatus::Cancelled {
            self.transition(CommandletState::Cancelled);
            return Ok(CommandletOutcome::Cancelled { message: None });
        }

        self.transition(CommandletState::PostconditionCheck);
        if !self.postchecker.check(&data, &report).await {
            self.transition(CommandletState::Done);
            return Ok(CommandletOutcome::PostconditionFailed(report));
        }

        self.transition(CommandletState::Done);
        Ok(CommandletOutcome::Completed(report))
    }

    fn transition(&mut self, next: CommandletState) {
        debug!(from = ?self.state, to = ?next, "commandlet transition");
        self.state = next;
    }
}
