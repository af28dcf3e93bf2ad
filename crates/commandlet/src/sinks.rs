//! Host-facing output seams.
//!
//! The orchestrator never renders UI itself. It writes raw output lines to a
//! [`ChannelSink`], reports terminal status through a [`NotificationSink`],
//! and emits one usage event per operation through a [`TelemetrySink`].
//! Default implementations route everything into `tracing`, which is enough
//! for headless hosts and tests.

use tracing::{error, info, warn};

/// Append-only output channel for raw command output and rendered results.
pub trait ChannelSink: Send + Sync {
    /// Drop everything rendered so far
    fn clear(&self);

    fn append_line(&self, line: &str);
}

/// One terminal notification per operation.
pub trait NotificationSink: Send + Sync {
    fn notify_success(&self, message: &str);

    fn notify_failure(&self, message: &str);

    /// Conflicts are their own outcome, not a generic failure
    fn notify_conflicts(&self, message: &str, files: &[String]);

    fn notify_cancellation(&self, message: &str);
}

/// One usage event per completed operation.
pub trait TelemetrySink: Send + Sync {
    fn send_command_event(
        &self,
        log_name: &str,
        duration_ms: u64,
        properties: &[(String, String)],
        measurements: &[(String, f64)],
    );
}

/// Logs output lines at `info`.
#[derive(Default)]
pub struct TracingChannelSink;

impl ChannelSink for TracingChannelSink {
    fn clear(&self) {}

    fn append_line(&self, line: &str) {
        info!(target: "mdsync::channel", "{line}");
    }
}

/// Logs notifications at a severity matching the outcome.
#[derive(Default)]
pub struct TracingNotificationSink;

impl NotificationSink for TracingNotificationSink {
    fn notify_success(&self, message: &str) {
        info!("{message}");
    }

    fn notify_failure(&self, message: &str) {
        error!("{message}");
    }

    fn notify_conflicts(&self, message: &str, files: &[String]) {
        warn!(files = files.len(), "{message}");
        for file in files {
            warn!(target: "mdsync::conflicts", "{file}");
        }
    }

    fn notify_cancellation(&self, message: &str) {
        info!("{message}");
    }
}

/// Logs usage events at `debug`; hosts with a real telemetry backend
/// substitute their own sink.
#[derive(Default)]
pub struct TracingTelemetrySink;

impl TelemetrySink for TracingTelemetrySink {
    fn send_command_event(
        &self,
        log_name: &str,
        duration_ms: u64,
        properties: &[(String, String)],
        measurements: &[(String, f64)],
    ) {
        tracing::debug!(
            log_name,
            duration_ms,
            ?properties,
            ?measurements,
            "command event"
        );
    }
}
