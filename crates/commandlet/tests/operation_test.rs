//! End-to-end operation runs against real child processes, with in-memory
//! sinks standing in for the host UI.

#![cfg(unix)]

use async_trait::async_trait;
use mdsync_commandlet::{
    ChannelSink, Commandlet, CommandletOutcome, CommandletState, EmptyPreChecker,
    NotificationSink, OperationExecutor, OperationServices, OperationStatus, ParameterResponse,
    ParametersGatherer, ResultFamily, Settings, TelemetrySink,
};
use mdsync_conflict::PersistentStorage;
use mdsync_core::{Error, OperationEvent};
use mdsync_exec::{CancellationToken, CommandBuilder};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

#[derive(Default)]
struct MemoryChannel {
    lines: Mutex<Vec<String>>,
    clears: AtomicUsize,
}

impl ChannelSink for MemoryChannel {
    fn clear(&self) {
        self.clears.fetch_add(1, Ordering::SeqCst);
        self.lines.lock().unwrap().clear();
    }

    fn append_line(&self, line: &str) {
        self.lines.lock().unwrap().push(line.to_string());
    }
}

#[derive(Default)]
struct MemoryNotifier {
    notes: Mutex<Vec<String>>,
}

impl MemoryNotifier {
    fn notes(&self) -> Vec<String> {
        self.notes.lock().unwrap().clone()
    }
}

impl NotificationSink for MemoryNotifier {
    fn notify_success(&self, message: &str) {
        self.notes.lock().unwrap().push(format!("success: {message}"));
    }

    fn notify_failure(&self, message: &str) {
        self.notes.lock().unwrap().push(format!("failure: {message}"));
    }

    fn notify_conflicts(&self, message: &str, files: &[String]) {
        self.notes
            .lock()
            .unwrap()
            .push(format!("conflicts({}): {message}", files.len()));
    }

    fn notify_cancellation(&self, message: &str) {
        self.notes
            .lock()
            .unwrap()
            .push(format!("cancelled: {message}"));
    }
}

#[derive(Default)]
struct MemoryTelemetry {
    events: Mutex<Vec<String>>,
}

impl TelemetrySink for MemoryTelemetry {
    fn send_command_event(
        &self,
        log_name: &str,
        _duration_ms: u64,
        _properties: &[(String, String)],
        _measurements: &[(String, f64)],
    ) {
        self.events.lock().unwrap().push(log_name.to_string());
    }
}

struct Sinks {
    channel: Arc<MemoryChannel>,
    notifier: Arc<MemoryNotifier>,
    telemetry: Arc<MemoryTelemetry>,
}

fn sinks() -> Sinks {
    Sinks {
        channel: Arc::new(MemoryChannel::default()),
        notifier: Arc::new(MemoryNotifier::default()),
        telemetry: Arc::new(MemoryTelemetry::default()),
    }
}

fn services(s: &Sinks) -> OperationServices {
    OperationServices::new(s.channel.clone(), s.notifier.clone(), s.telemetry.clone())
}

/// A command that prints `json` on stdout and exits 0.
fn echo_json(json: &str) -> mdsync_exec::Command {
    assert!(!json.contains('\''));
    CommandBuilder::new("sh")
        .with_arg("-c")
        .with_arg(format!("printf '%s' '{json}'"))
        .with_log_name("project_deploy_start")
        .build()
}

fn drain(rx: &mut tokio::sync::broadcast::Receiver<OperationEvent>) -> Vec<OperationEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

#[tokio::test]
async fn successful_push_updates_cache_and_notifies_once() {
    mdsync_core::diagnostics::init_diagnostics();
    let workspace = TempDir::new().unwrap();
    let store = TempDir::new().unwrap();
    std::fs::write(workspace.path().join("Fine.cls"), "body").unwrap();

    let s = sinks();
    let storage = Arc::new(tokio::sync::Mutex::new(PersistentStorage::open(
        store.path(),
        workspace.path(),
    )));
    let services = services(&s).with_storage(storage.clone());
    let mut events = services.events().subscribe();

    let json = r#"{"status":0,"result":{"pushedSource":[{"state":"Add","fullName":"Fine","type":"ApexClass","filePath":"Fine.cls"}]}}"#;
    let report = services
        .run(echo_json(json), ResultFamily::Push, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.status, OperationStatus::Succeeded);
    assert_eq!(report.exit_code, Some(0));
    assert_eq!(report.changed.len(), 1);

    // Exactly one notification, and it reports success.
    let notes = s.notifier.notes();
    assert_eq!(notes.len(), 1);
    assert!(notes[0].starts_with("success:"));

    // One telemetry event, after the terminal event.
    assert_eq!(s.telemetry.events.lock().unwrap().len(), 1);

    // The cache picked up the pushed file.
    assert!(storage.lock().await.get("Fine.cls").is_some());

    let events = drain(&mut events);
    assert!(events
        .iter()
        .any(|e| matches!(e, OperationEvent::CommandStarted { .. })));
    assert!(events
        .iter()
        .any(|e| matches!(e, OperationEvent::CommandFinished { .. })));
    assert!(events
        .iter()
        .any(|e| matches!(e, OperationEvent::CacheUpdated { entries: 1, .. })));
}

#[tokio::test]
async fn failed_push_reports_failure_rows() {
    let s = sinks();
    let services = services(&s);

    let json = r#"{"status":1,"name":"PushFailed","message":"Push failed.","data":[{"filePath":"Broken.cls","error":"Invalid dependency"}]}"#;
    let report = services
        .run(echo_json(json), ResultFamily::Push, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.status, OperationStatus::Failed);
    assert_eq!(report.failures.len(), 1);

    let notes = s.notifier.notes();
    assert_eq!(notes.len(), 1);
    assert!(notes[0].starts_with("failure:"));
}

#[tokio::test]
async fn partial_success_surfaces_both_sides() {
    let s = sinks();
    let services = services(&s);

    let json = r#"{"status":1,"name":"PushFailed","message":"Push failed.","data":[{"filePath":"Broken.cls","error":"bad"}],"partialSuccess":[{"state":"Add","fullName":"Fine","type":"ApexClass","filePath":"Fine.cls"}]}"#;
    let report = services
        .run(echo_json(json), ResultFamily::Push, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.status, OperationStatus::PartiallySucceeded);
    assert_eq!(report.changed.len(), 1);
    assert_eq!(report.failures.len(), 1);
}

#[tokio::test]
async fn conflicts_are_routed_away_from_the_error_path() {
    let workspace = TempDir::new().unwrap();
    let store = TempDir::new().unwrap();
    let s = sinks();
    let storage = Arc::new(tokio::sync::Mutex::new(PersistentStorage::open(
        store.path(),
        workspace.path(),
    )));
    let services = services(&s).with_storage(storage.clone());
    let mut events = services.events().subscribe();

    let json = r#"{"status":1,"name":"sourceConflictDetected","message":"Conflicts detected","data":[{"filePath":"Account.object","state":"Conflict"}]}"#;
    let report = services
        .run(echo_json(json), ResultFamily::Push, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.status, OperationStatus::Conflicts);
    assert_eq!(report.conflict_files, vec!["Account.object".to_string()]);

    let notes = s.notifier.notes();
    assert_eq!(notes.len(), 1);
    assert!(notes[0].starts_with("conflicts(1):"));

    // Conflicting runs never touch the cache.
    assert!(storage.lock().await.is_empty());
    assert!(drain(&mut events)
        .iter()
        .any(|e| matches!(e, OperationEvent::ConflictsDetected { files: 1, .. })));
}

#[tokio::test]
async fn spawn_failure_is_an_error_with_one_notification() {
    let s = sinks();
    let services = services(&s);
    let mut events = services.events().subscribe();

    let command = CommandBuilder::new("mdsync-no-such-binary-d4e5f6").build();
    let err = services
        .run(command, ResultFamily::Push, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Spawn { .. }));
    let notes = s.notifier.notes();
    assert_eq!(notes.len(), 1);
    assert!(notes[0].starts_with("failure:"));
    assert!(drain(&mut events)
        .iter()
        .any(|e| matches!(e, OperationEvent::CommandSpawnFailed { .. })));
}

#[tokio::test]
async fn unparseable_output_is_a_parse_error() {
    let s = sinks();
    let services = services(&s);

    let command = CommandBuilder::new("sh")
        .with_arg("-c")
        .with_arg("printf 'no json here'")
        .build();
    let err = services
        .run(command, ResultFamily::Deploy, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Parse { .. }));
    assert_eq!(s.notifier.notes().len(), 1);
}

#[tokio::test]
async fn an_already_cancelled_token_prevents_the_spawn() {
    let s = sinks();
    let services = services(&s);
    let token = CancellationToken::new();
    token.cancel();

    let err = services
        .run(
            echo_json(r#"{"status":0}"#),
            ResultFamily::Push,
            &token,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Cancelled { .. }));
    // Nothing ran, so nothing was notified.
    assert!(s.notifier.notes().is_empty());
}

#[tokio::test]
async fn cancellation_short_circuits_before_parsing() {
    let s = sinks();
    let services = services(&s);
    let mut events = services.events().subscribe();
    let token = CancellationToken::new();

    let command = CommandBuilder::new("sh")
        .with_arg("-c")
        .with_arg("sleep 30")
        .build();
    let run = services.run(command, ResultFamily::Push, &token);
    tokio::pin!(run);

    tokio::select! {
        _ = &mut run => panic!("run resolved before cancellation"),
        () = tokio::time::sleep(std::time::Duration::from_millis(100)) => token.cancel(),
    }
    let report = run.await.unwrap();

    assert_eq!(report.status, OperationStatus::Cancelled);
    let notes = s.notifier.notes();
    assert_eq!(notes.len(), 1);
    assert!(notes[0].starts_with("cancelled:"));
    assert!(drain(&mut events)
        .iter()
        .any(|e| matches!(e, OperationEvent::CommandCancelled { .. })));
}

#[tokio::test]
async fn clear_setting_empties_the_channel_before_a_run() {
    let s = sinks();
    s.channel.append_line("stale line from an earlier run");
    let services = services(&s).with_settings(Settings {
        clear_output_before_each_command: true,
        ..Settings::default()
    });

    let json = r#"{"status":0,"result":{"pushedSource":[]}}"#;
    services
        .run(echo_json(json), ResultFamily::Push, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(s.channel.clears.load(Ordering::SeqCst), 1);
    let lines = s.channel.lines.lock().unwrap();
    assert!(!lines.iter().any(|l| l.contains("stale line")));
    // The command line itself is always rendered.
    assert!(lines.iter().any(|l| l.starts_with("$ sh")));
}

#[tokio::test]
async fn preflight_conflict_scan_honors_the_setting() {
    let workspace = TempDir::new().unwrap();
    let store = TempDir::new().unwrap();
    std::fs::write(workspace.path().join("A.cls"), "v1").unwrap();

    let mut storage = PersistentStorage::open(store.path(), workspace.path());
    let synced: mdsync_core::FileRecord = serde_json::from_value(serde_json::json!({
        "state": "Add", "fullName": "A", "type": "ApexClass", "filePath": "A.cls"
    }))
    .unwrap();
    storage.set_properties_for_files_push_pull(&[synced]);
    std::fs::write(workspace.path().join("A.cls"), "v2 edited locally").unwrap();
    let storage = Arc::new(tokio::sync::Mutex::new(storage));

    let paths = vec!["A.cls".to_string()];

    // Disabled: no scan happens at all.
    let s = sinks();
    let disabled = services(&s).with_storage(storage.clone());
    assert!(disabled
        .detect_local_conflicts("project_deploy_start", &paths)
        .await
        .is_none());
    assert!(s.notifier.notes().is_empty());

    // Enabled: the edited file is flagged and notified.
    let s = sinks();
    let enabled = services(&s)
        .with_storage(storage)
        .with_settings(Settings {
            detect_conflicts_at_sync: true,
            ..Settings::default()
        });
    let check = enabled
        .detect_local_conflicts("project_deploy_start", &paths)
        .await
        .expect("scan should run when enabled");
    assert_eq!(check.conflicts, vec!["A.cls".to_string()]);
    let notes = s.notifier.notes();
    assert_eq!(notes.len(), 1);
    assert!(notes[0].starts_with("conflicts(1):"));
}

struct DirGatherer(String);

#[async_trait]
impl ParametersGatherer<String> for DirGatherer {
    async fn gather(&self) -> ParameterResponse<String> {
        ParameterResponse::Continue(self.0.clone())
    }
}

#[tokio::test]
async fn commandlet_drives_a_real_operation_to_done() {
    let s = sinks();
    let services = Arc::new(services(&s));

    let executor = OperationExecutor::new(services, ResultFamily::Deploy, |json: &String| {
        echo_json(json)
    });
    let mut commandlet = Commandlet::new(
        Box::new(EmptyPreChecker),
        Box::new(DirGatherer(
            r#"{"status":0,"result":{"files":[{"state":"Changed","fullName":"A","type":"ApexClass","filePath":"A.cls"}]}}"#
                .to_string(),
        )),
        Box::new(executor),
    );

    let outcome = commandlet.run(&CancellationToken::new()).await.unwrap();
    match outcome {
        CommandletOutcome::Completed(report) => {
            assert_eq!(report.status, OperationStatus::Succeeded);
            assert_eq!(report.changed.len(), 1);
        }
        other => panic!("expected completion, got {other:?}"),
    }
    assert_eq!(commandlet.state(), CommandletState::Done);
}
