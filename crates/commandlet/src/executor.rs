//! The glue between a built [`Command`] and the host-facing sinks.
//!
//! [`OperationServices`] owns everything an operation touches besides the
//! process itself: the output channel, notifications, telemetry, the event
//! emitter, and the persistent sync-state cache. [`OperationServices::run`]
//! drives one invocation from spawn to parsed report; [`OperationExecutor`]
//! wraps that in the [`CommandletExecutor`] seam for the state machine.

use crate::settings::Settings;
use crate::sinks::{ChannelSink, NotificationSink, TelemetrySink};
use crate::traits::CommandletExecutor;
use async_trait::async_trait;
use mdsync_conflict::{ConflictCheck, PersistentStorage, TimestampConflictDetector};
use mdsync_core::constants::{
    DEPLOY_LOG_NAME, DIFF_LOG_NAME, JSON_TO_STDOUT_ENV_VAR, ORG_CREATE_LOG_NAME, PULL_LOG_NAME,
    PUSH_LOG_NAME, RETRIEVE_LOG_NAME,
};
use mdsync_core::{Error, EventEmitter, FileFailure, FileRecord, OperationEvent, Result};
use mdsync_exec::{
    CancellationToken, CliCommandExecutor, Command, ExecutionOutcome, ExecutorOptions,
};
use mdsync_results::{
    DeployResultParser, DiffResultParser, OrgCreateResultParser, PullResultParser,
    PushResultParser, RetrieveResultParser,
};
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};
use tracing::debug;

/// Which result-parser family interprets an invocation's stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultFamily {
    Push,
    Pull,
    Deploy,
    Retrieve,
    Diff,
    OrgCreate,
}

impl ResultFamily {
    /// Default telemetry log name when the command carries none
    pub fn log_name(self) -> &'static str {
        match self {
            ResultFamily::Push => PUSH_LOG_NAME,
            ResultFamily::Pull => PULL_LOG_NAME,
            ResultFamily::Deploy => DEPLOY_LOG_NAME,
            ResultFamily::Retrieve => RETRIEVE_LOG_NAME,
            ResultFamily::Diff => DIFF_LOG_NAME,
            ResultFamily::OrgCreate => ORG_CREATE_LOG_NAME,
        }
    }

    /// Families whose successful file records feed the sync-state cache
    fn updates_sync_state(self) -> bool {
        matches!(
            self,
            ResultFamily::Push | ResultFamily::Pull | ResultFamily::Deploy
        )
    }
}

/// How an operation ended, once its terminal event and parse completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationStatus {
    Succeeded,
    /// Some files landed, some failed
    PartiallySucceeded,
    Failed,
    /// The backend refused the operation over source conflicts
    Conflicts,
    Cancelled,
}

/// Parsed outcome of one invocation.
#[derive(Debug, Clone)]
pub struct OperationReport {
    pub status: OperationStatus,
    pub exit_code: Option<i32>,
    /// Files the operation affected successfully
    pub changed: Vec<FileRecord>,
    /// Per-file error rows
    pub failures: Vec<FileFailure>,
    /// Paths the backend flagged as conflicting
    pub conflict_files: Vec<String>,
    /// Complete raw stdout, for hosts that want the untouched output
    pub stdout: String,
}

impl OperationReport {
    pub fn is_successful(&self) -> bool {
        self.status == OperationStatus::Succeeded
    }

    fn terminal(status: OperationStatus, exit_code: Option<i32>, stdout: String) -> Self {
        Self {
            status,
            exit_code,
            changed: Vec::new(),
            failures: Vec::new(),
            conflict_files: Vec::new(),
            stdout,
        }
    }
}

/// Everything one operation needs besides the process: sinks, events, the
/// sync-state cache, and spawn options.
pub struct OperationServices {
    channel: Arc<dyn ChannelSink>,
    notifier: Arc<dyn NotificationSink>,
    telemetry: Arc<dyn TelemetrySink>,
    events: EventEmitter,
    storage: Option<Arc<Mutex<PersistentStorage>>>,
    settings: Settings,
    exec_options: ExecutorOptions,
}

impl OperationServices {
    pub fn new(
        channel: Arc<dyn ChannelSink>,
        notifier: Arc<dyn NotificationSink>,
        telemetry: Arc<dyn TelemetrySink>,
    ) -> Self {
        Self {
            channel,
            notifier,
            telemetry,
            events: EventEmitter::default(),
            storage: None,
            settings: Settings::default(),
            exec_options: ExecutorOptions::new(),
        }
    }

    pub fn with_events(mut self, events: EventEmitter) -> Self {
        self.events = events;
        self
    }

    pub fn with_storage(mut self, storage: Arc<Mutex<PersistentStorage>>) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_exec_options(mut self, exec_options: ExecutorOptions) -> Self {
        self.exec_options = exec_options;
        self
    }

    pub fn events(&self) -> &EventEmitter {
        &self.events
    }

    /// Pre-flight scan of `paths` against the sync-state cache, for hosts
    /// that want to refuse a deploy or retrieve that would overwrite local
    /// edits. Returns `None` when detection is disabled or no cache is
    /// attached; detected conflicts are notified and published before the
    /// check is handed back.
    pub async fn detect_local_conflicts(
        &self,
        log_name: &str,
        paths: &[String],
    ) -> Option<ConflictCheck> {
        if !self.settings.detect_conflicts_at_sync {
            return None;
        }
        let storage = self.storage.as_ref()?.lock().await;
        let check = TimestampConflictDetector::new(&storage).check(paths);
        if check.has_conflicts() {
            self.events
                .publish(OperationEvent::ConflictsDetected {
                    log_name: log_name.to_string(),
                    files: check.conflicts.len(),
                })
                .await;
            self.notifier.notify_conflicts(
                &format!("{log_name} would overwrite locally changed files"),
                &check.conflicts,
            );
        }
        Some(check)
    }

    /// Run one invocation to its terminal event, parse its stdout with the
    /// family's parser, and report exactly one notification and one
    /// telemetry event for the outcome.
    pub async fn run(
        &self,
        command: Command,
        family: ResultFamily,
        cancellation: &CancellationToken,
    ) -> Result<OperationReport> {
        if self.settings.clear_output_before_each_command {
            self.channel.clear();
        }
        let log_name = command
            .log_name()
            .unwrap_or_else(|| family.log_name())
            .to_string();
        if cancellation.is_cancelled() {
            // Already-cancelled operations never spawn.
            return Err(Error::cancelled(log_name));
        }
        let program = command.program().to_string();
        self.channel
            .append_line(&format!("$ {}", command.to_command_line()));

        let options = self
            .exec_options
            .clone()
            .env(JSON_TO_STDOUT_ENV_VAR, "true");
        let execution = CliCommandExecutor::new(command, options).execute(cancellation);
        let execution_id = execution.id().to_string();
        self.events
            .publish(OperationEvent::CommandStarted {
                log_name: log_name.clone(),
                execution_id: execution_id.clone(),
            })
            .await;

        let outcome = self.stream_until_terminal(&execution).await;
        let duration_ms = execution.start_time().elapsed().as_millis() as u64;

        let exit_code = match outcome {
            ExecutionOutcome::SpawnFailed(message) => {
                self.events
                    .publish(OperationEvent::CommandSpawnFailed {
                        log_name: log_name.clone(),
                        execution_id,
                        error: message.clone(),
                    })
                    .await;
                self.telemetry.send_command_event(
                    &log_name,
                    duration_ms,
                    &[("outcome".to_string(), "spawn_failed".to_string())],
                    &[],
                );
                self.notifier
                    .notify_failure(&format!("{log_name} could not start: {message}"));
                return Err(Error::spawn(program, message));
            }
            ExecutionOutcome::Exited(code) => code,
        };

        if cancellation.is_cancelled() {
            self.events
                .publish(OperationEvent::CommandCancelled {
                    log_name: log_name.clone(),
                    execution_id,
                })
                .await;
            self.telemetry.send_command_event(
                &log_name,
                duration_ms,
                &[("outcome".to_string(), "cancelled".to_string())],
                &[],
            );
            self.notifier
                .notify_cancellation(&format!("{log_name} was cancelled"));
            return Ok(OperationReport::terminal(
                OperationStatus::Cancelled,
                exit_code,
                execution.stdout_snapshot(),
            ));
        }

        self.events
            .publish(OperationEvent::CommandFinished {
                log_name: log_name.clone(),
                execution_id,
                exit_code,
                duration_ms,
            })
            .await;
        self.telemetry.send_command_event(
            &log_name,
            duration_ms,
            &[("outcome".to_string(), "finished".to_string())],
            &[("exit_code".to_string(), exit_code.unwrap_or(-1) as f64)],
        );

        let stdout = execution.stdout_snapshot();
        let parsed = match parse_family(family, &stdout) {
            Ok(parsed) => parsed,
            Err(e) => {
                self.notifier
                    .notify_failure(&format!("{log_name} produced unreadable output"));
                return Err(e);
            }
        };

        // Result lines are rendered once, after the parse completed.
        for line in &parsed.summary {
            self.channel.append_line(line);
        }

        if parsed.has_conflicts {
            self.events
                .publish(OperationEvent::ConflictsDetected {
                    log_name: log_name.clone(),
                    files: parsed.conflict_files.len(),
                })
                .await;
            self.notifier.notify_conflicts(
                &format!("{log_name} detected source conflicts"),
                &parsed.conflict_files,
            );
            return Ok(OperationReport {
                status: OperationStatus::Conflicts,
                exit_code,
                changed: parsed.changed,
                failures: parsed.failures,
                conflict_files: parsed.conflict_files,
                stdout,
            });
        }

        if family.updates_sync_state() && !parsed.changed.is_empty() {
            if let Some(storage) = &self.storage {
                let entries = storage
                    .lock()
                    .await
                    .set_properties_for_files_push_pull(&parsed.changed);
                self.events
                    .publish(OperationEvent::CacheUpdated {
                        log_name: log_name.clone(),
                        entries,
                    })
                    .await;
            }
        }

        let status = if parsed.successful {
            self.notifier
                .notify_success(&format!("{log_name} ran successfully"));
            OperationStatus::Succeeded
        } else if !parsed.changed.is_empty() {
            self.notifier
                .notify_failure(&format!("{log_name} completed with errors"));
            OperationStatus::PartiallySucceeded
        } else {
            let detail = parsed
                .error_message
                .clone()
                .unwrap_or_else(|| "unknown failure".to_string());
            self.notifier
                .notify_failure(&format!("{log_name} failed: {detail}"));
            OperationStatus::Failed
        };

        Ok(OperationReport {
            status,
            exit_code,
            changed: parsed.changed,
            failures: parsed.failures,
            conflict_files: parsed.conflict_files,
            stdout,
        })
    }

    /// Forward stdout to the channel sink, line-buffered, until the terminal
    /// event. The snapshot remains authoritative for parsing.
    async fn stream_until_terminal(&self, execution: &mdsync_exec::Execution) -> ExecutionOutcome {
        let mut rx = execution.subscribe_stdout();
        let wait = execution.wait();
        tokio::pin!(wait);

        let mut line_buf = String::new();
        let mut open = true;
        let outcome = loop {
            if !open {
                break (&mut wait).await;
            }
            tokio::select! {
                outcome = &mut wait => break outcome,
                chunk = rx.recv() => match chunk {
                    Ok(chunk) => self.append_chunk(&mut line_buf, &chunk),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        debug!(skipped, "output stream lagged behind the channel sink");
                    }
                    Err(broadcast::error::RecvError::Closed) => open = false,
                },
            }
        };

        while let Ok(chunk) = rx.try_recv() {
            self.append_chunk(&mut line_buf, &chunk);
        }
        if !line_buf.is_empty() {
            self.channel.append_line(&line_buf);
        }
        outcome
    }

    fn append_chunk(&self, line_buf: &mut String, chunk: &str) {
        line_buf.push_str(chunk);
        while let Some(newline) = line_buf.find('\n') {
            let line: String = line_buf.drain(..=newline).collect();
            self.channel.append_line(line.trim_end_matches('\n'));
        }
    }
}

struct ParsedResult {
    successful: bool,
    has_conflicts: bool,
    changed: Vec<FileRecord>,
    failures: Vec<FileFailure>,
    conflict_files: Vec<String>,
    error_message: Option<String>,
    summary: Vec<String>,
}

fn parse_family(family: ResultFamily, stdout: &str) -> Result<ParsedResult> {
    match family {
        ResultFamily::Push => {
            let parser = PushResultParser::new(stdout)?;
            Ok(file_result(
                parser.is_successful(),
                parser.has_conflicts(),
                parser.successes().map(|s| s.files.clone()),
                parser.errors().map(|e| (e.message.clone(), e.files.clone())),
            ))
        }
        ResultFamily::Pull => {
            let parser = PullResultParser::new(stdout)?;
            Ok(file_result(
                parser.is_successful(),
                parser.has_conflicts(),
                parser.successes().map(|s| s.files.clone()),
                parser.errors().map(|e| (e.message.clone(), e.files.clone())),
            ))
        }
        ResultFamily::Deploy => {
            let parser = DeployResultParser::new(stdout)?;
            Ok(file_result(
                parser.is_successful(),
                parser.has_conflicts(),
                parser.successes().map(|s| s.files.clone()),
                parser.errors().map(|e| (e.message.clone(), e.files.clone())),
            ))
        }
        ResultFamily::Retrieve => {
            let parser = RetrieveResultParser::new(stdout)?;
            Ok(file_result(
                parser.is_successful(),
                parser.has_conflicts(),
                parser.successes().map(|s| s.files.clone()),
                parser.errors().map(|e| (e.message.clone(), e.files.clone())),
            ))
        }
        ResultFamily::Diff => {
            let parser = DiffResultParser::new(stdout)?;
            let summary = parser
                .successes()
                .map(|diff| {
                    vec![
                        format!("{}:", diff.file_name),
                        format!("  remote: {}", diff.remote),
                        format!("  local:  {}", diff.local),
                    ]
                })
                .unwrap_or_default();
            Ok(ParsedResult {
                successful: parser.is_successful(),
                has_conflicts: false,
                changed: Vec::new(),
                failures: Vec::new(),
                conflict_files: Vec::new(),
                error_message: parser.errors().map(|e| e.message.clone()),
                summary,
            })
        }
        ResultFamily::OrgCreate => {
            let parser = OrgCreateResultParser::new(stdout)?;
            let summary = parser
                .successes()
                .map(|org| vec![format!("created org {} ({})", org.username, org.org_id)])
                .unwrap_or_default();
            Ok(ParsedResult {
                successful: parser.is_successful(),
                has_conflicts: false,
                changed: Vec::new(),
                failures: Vec::new(),
                conflict_files: Vec::new(),
                error_message: parser.errors().map(|e| e.message.clone()),
                summary,
            })
        }
    }
}

fn file_result(
    successful: bool,
    has_conflicts: bool,
    successes: Option<Vec<FileRecord>>,
    errors: Option<(String, Vec<FileFailure>)>,
) -> ParsedResult {
    let changed = successes.unwrap_or_default();
    let (error_message, failures) = match errors {
        Some((message, failures)) => (Some(message), failures),
        None => (None, Vec::new()),
    };
    let conflict_files = if has_conflicts {
        failures
            .iter()
            .filter_map(|f| f.file_path.clone())
            .collect()
    } else {
        Vec::new()
    };

    let mut summary = Vec::new();
    for record in &changed {
        summary.push(format!(
            "{:<10} {:<12} {} {}",
            record.state,
            record.type_name,
            record.full_name,
            record.file_path.as_deref().unwrap_or("")
        ));
    }
    for failure in &failures {
        summary.push(format!(
            "{:<10} {} {}",
            failure.state.as_deref().unwrap_or("Failed"),
            failure.file_path.as_deref().unwrap_or("<unknown>"),
            failure.error.as_deref().unwrap_or("")
        ));
    }

    ParsedResult {
        successful,
        has_conflicts,
        changed,
        failures,
        conflict_files,
        error_message,
        summary,
    }
}

/// [`CommandletExecutor`] over [`OperationServices`]: a command builder
/// closure plus the family that parses its output.
pub struct OperationExecutor<T> {
    services: Arc<OperationServices>,
    family: ResultFamily,
    build: Box<dyn Fn(&T) -> Command + Send + Sync>,
}

impl<T> OperationExecutor<T> {
    pub fn new(
        services: Arc<OperationServices>,
        family: ResultFamily,
        build: impl Fn(&T) -> Command + Send + Sync + 'static,
    ) -> Self {
        Self {
            services,
            family,
            build: Box::new(build),
        }
    }
}

#[async_trait]
impl<T: Send + Sync> CommandletExecutor<T> for OperationExecutor<T> {
    fn build(&self, data: &T) -> Command {
        (self.build)(data)
    }

    async fn execute(&self, data: &T, cancellation: &CancellationToken) -> Result<OperationReport> {
        let command = (self.build)(data);
        self.services.run(command, self.family, cancellation).await
    }
}
