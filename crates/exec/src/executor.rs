//! Spawns a [`Command`] as an OS process and wires it to an [`Execution`].

use crate::cancellation::CancellationToken;
use crate::command::Command;
use crate::execution::{Execution, ExecutionOutcome};
use indexmap::IndexMap;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, info, warn};

const READ_BUFFER_SIZE: usize = 8192;

/// Spawn options: working directory and extra/override environment variables.
#[derive(Debug, Clone, Default)]
pub struct ExecutorOptions {
    pub cwd: Option<PathBuf>,
    pub env: IndexMap<String, String>,
}

impl ExecutorOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn env(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(name.into(), value.into());
        self
    }
}

/// Executes one [`Command`] as a child process.
///
/// `execute` spawns exactly one OS process per call and returns immediately
/// with the [`Execution`] handle; a spawn failure is reported through the
/// handle's terminal channel, not as an `Err`. A non-zero exit code is a
/// normal terminal value at this layer — result parsers upstream decide what
/// it means.
pub struct CliCommandExecutor {
    command: Command,
    options: ExecutorOptions,
}

impl CliCommandExecutor {
    pub fn new(command: Command, options: ExecutorOptions) -> Self {
        Self { command, options }
    }

    /// Spawn the process. Must be called within a tokio runtime.
    pub fn execute(&self, cancellation: &CancellationToken) -> Execution {
        let (execution, controller) = Execution::new(self.command.clone());

        let mut cmd = tokio::process::Command::new(self.command.program());
        cmd.args(self.command.argv())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(cwd) = &self.options.cwd {
            cmd.current_dir(cwd);
        }
        for (name, value) in &self.options.env {
            cmd.env(name, value);
        }

        debug!(
            execution_id = execution.id(),
            command = %self.command.to_command_line(),
            "spawning command"
        );

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                warn!(
                    execution_id = execution.id(),
                    program = self.command.program(),
                    error = %e,
                    "failed to spawn command"
                );
                controller.resolve(ExecutionOutcome::SpawnFailed(format!(
                    "failed to spawn '{}': {e}",
                    self.command.program()
                )));
                return execution;
            }
        };

        let stdout_task = child.stdout.take().map(|stdout| {
            let controller = controller.clone();
            tokio::spawn(pump(stdout, move |chunk| controller.emit_stdout(chunk)))
        });
        let stderr_task = child.stderr.take().map(|stderr| {
            let controller = controller.clone();
            tokio::spawn(pump(stderr, move |chunk| controller.emit_stderr(chunk)))
        });

        let token = cancellation.clone();
        let execution_id = execution.id().to_string();
        tokio::spawn(async move {
            let status = tokio::select! {
                status = child.wait() => status,
                () = token.cancelled() => {
                    info!(execution_id = %execution_id, "cancellation requested, killing process");
                    let _ = child.start_kill();
                    child.wait().await
                }
            };

            // Drain the output readers before resolving so subscribers that
            // were active throughout see every chunk before the terminal
            // event.
            if let Some(task) = stdout_task {
                let _ = task.await;
            }
            if let Some(task) = stderr_task {
                let _ = task.await;
            }

            match status {
                Ok(status) => {
                    debug!(
                        execution_id = %execution_id,
                        exit_code = ?status.code(),
                        "process exited"
                    );
                    controller.resolve(ExecutionOutcome::Exited(status.code()));
                }
                Err(e) => {
                    warn!(execution_id = %execution_id, error = %e, "failed to wait on process");
                    controller.resolve(ExecutionOutcome::SpawnFailed(format!(
                        "failed to wait on process: {e}"
                    )));
                }
            }
        });

        execution
    }
}

/// Forward raw chunks from a child pipe as they arrive. Chunked, not
/// line-buffered. A multi-byte UTF-8 character split across a read boundary
/// is held back until the rest of it arrives, so chunk boundaries never
/// manufacture replacement characters; genuinely invalid bytes still decode
/// lossily.
async fn pump<R>(mut reader: R, emit: impl Fn(String))
where
    R: AsyncRead + Unpin,
{
    let mut buf = [0u8; READ_BUFFER_SIZE];
    let mut pending = Vec::new();
    loop {
        match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                pending.extend_from_slice(&buf[..n]);
                let chunk = drain_complete_utf8(&mut pending);
                if !chunk.is_empty() {
                    emit(chunk);
                }
            }
            Err(e) => {
                warn!(error = %e, "error reading process output");
                break;
            }
        }
    }
    // A sequence still open at EOF was truncated by the process itself.
    if !pending.is_empty() {
        emit(String::from_utf8_lossy(&pending).into_owned());
    }
}

/// Decode `pending` up to the last complete UTF-8 sequence, leaving a
/// trailing incomplete sequence (at most three bytes) in place for the next
/// read.
fn drain_complete_utf8(pending: &mut Vec<u8>) -> String {
    let carry = match std::str::from_utf8(pending) {
        Ok(_) => 0,
        Err(e) if e.error_len().is_none() => pending.len() - e.valid_up_to(),
        Err(_) => 0,
    };
    let tail = pending.split_off(pending.len() - carry);
    let chunk = String::from_utf8_lossy(pending).into_owned();
    *pending = tail;
    chunk
}
