//! Read-only execution handle: the per-process event bus.
//!
//! An [`Execution`] exposes four independent channels over one spawned
//! process: stdout chunks, stderr chunks, and a single terminal outcome that
//! is either an exit code or a spawn error, never both. Chunk channels are
//! broadcast streams (a late subscriber may miss earlier chunks); the
//! terminal outcome is latched in a watch channel, so every subscriber
//! observes it regardless of when it subscribed.

use crate::command::Command;
use mdsync_core::constants::OUTPUT_CHANNEL_CAPACITY;
use mdsync_core::{Error, Result};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::sync::{broadcast, watch};

/// The single terminal event of an execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionOutcome {
    /// The process ran and exited. `None` means it died to a signal.
    Exited(Option<i32>),
    /// The process never started, or the OS could not wait on it cleanly.
    SpawnFailed(String),
}

struct Shared {
    command: Command,
    id: String,
    start_time: Instant,
    stdout: broadcast::Sender<String>,
    stderr: broadcast::Sender<String>,
    stdout_buf: Mutex<String>,
    stderr_buf: Mutex<String>,
    terminal: watch::Receiver<Option<ExecutionOutcome>>,
}

/// Multi-subscriber handle over one running or completed invocation.
///
/// Cheap to clone; all clones observe the same channels. Consumers can only
/// subscribe and wait — emission and terminal resolution belong exclusively
/// to the executor through [`ExecutionController`].
#[derive(Clone)]
pub struct Execution {
    shared: Arc<Shared>,
}

impl Execution {
    /// Create an execution plus the controller half the executor keeps.
    pub(crate) fn new(command: Command) -> (Self, ExecutionController) {
        let (stdout, _) = broadcast::channel(OUTPUT_CHANNEL_CAPACITY);
        let (stderr, _) = broadcast::channel(OUTPUT_CHANNEL_CAPACITY);
        let (terminal_tx, terminal_rx) = watch::channel(None);

        let execution = Self {
            shared: Arc::new(Shared {
                command,
                id: uuid::Uuid::new_v4().to_string(),
                start_time: Instant::now(),
                stdout,
                stderr,
                stdout_buf: Mutex::new(String::new()),
                stderr_buf: Mutex::new(String::new()),
                terminal: terminal_rx,
            }),
        };
        let controller = ExecutionController {
            shared: execution.shared.clone(),
            terminal: Arc::new(terminal_tx),
        };
        (execution, controller)
    }

    pub fn command(&self) -> &Command {
        &self.shared.command
    }

    /// Correlation id for log lines and telemetry
    pub fn id(&self) -> &str {
        &self.shared.id
    }

    pub fn start_time(&self) -> Instant {
        self.shared.start_time
    }

    /// Subscribe to stdout chunks emitted from now on
    pub fn subscribe_stdout(&self) -> broadcast::Receiver<String> {
        self.shared.stdout.subscribe()
    }

    /// Subscribe to stderr chunks emitted from now on
    pub fn subscribe_stderr(&self) -> broadcast::Receiver<String> {
        self.shared.stderr.subscribe()
    }

    /// Everything emitted on stdout so far. Complete once [`Self::wait`]
    /// has returned, since the executor drains both pipes before resolving.
    pub fn stdout_snapshot(&self) -> String {
        self.shared
            .stdout_buf
            .lock()
            .map(|buf| buf.clone())
            .unwrap_or_default()
    }

    /// Everything emitted on stderr so far
    pub fn stderr_snapshot(&self) -> String {
        self.shared
            .stderr_buf
            .lock()
            .map(|buf| buf.clone())
            .unwrap_or_default()
    }

    /// The terminal outcome if the execution has already resolved
    pub fn outcome(&self) -> Option<ExecutionOutcome> {
        self.shared.terminal.borrow().clone()
    }

    /// Wait for the terminal outcome. Resolves immediately when the
    /// execution has already terminated.
    pub async fn wait(&self) -> ExecutionOutcome {
        let mut receiver = self.shared.terminal.clone();
        loop {
            if let Some(outcome) = receiver.borrow_and_update().clone() {
                return outcome;
            }
            if receiver.changed().await.is_err() {
                // The controller resolves before dropping the sender; a
                // closed channel therefore always carries the outcome.
                if let Some(outcome) = receiver.borrow().clone() {
                    return outcome;
                }
                return ExecutionOutcome::SpawnFailed(
                    "execution dropped before reaching a terminal state".to_string(),
                );
            }
        }
    }

    /// Wait for an exit code, mapping a spawn failure to [`Error::Spawn`].
    pub async fn wait_for_exit_code(&self) -> Result<Option<i32>> {
        match self.wait().await {
            ExecutionOutcome::Exited(code) => Ok(code),
            ExecutionOutcome::SpawnFailed(message) => {
                Err(Error::spawn(self.shared.command.program(), message))
            }
        }
    }
}

/// The write half of an execution, owned by the process executor.
#[derive(Clone)]
pub(crate) struct ExecutionController {
    shared: Arc<Shared>,
    terminal: Arc<watch::Sender<Option<ExecutionOutcome>>>,
}

impl ExecutionController {
    pub(crate) fn emit_stdout(&self, chunk: String) {
        if let Ok(mut buf) = self.shared.stdout_buf.lock() {
            buf.push_str(&chunk);
        }
        // A send error only means no subscriber is currently listening.
        let _ = self.shared.stdout.send(chunk);
    }

    pub(crate) fn emit_stderr(&self, chunk: String) {
        if let Ok(mut buf) = self.shared.stderr_buf.lock() {
            buf.push_str(&chunk);
        }
        let _ = self.shared.stderr.send(chunk);
    }

    /// Latch the terminal outcome. The first resolution wins; later calls
    /// are ignored so the terminal event is produced exactly once.
    pub(crate) fn resolve(&self, outcome: ExecutionOutcome) {
        self.terminal.send_if_modified(|current| {
            if current.is_some() {
                return false;
            }
            *current = Some(outcome.clone());
            true
        });
    }
}
