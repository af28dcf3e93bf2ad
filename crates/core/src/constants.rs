//! Constants used throughout the mdsync workspace.

// Conflict sentinel error names. The wrapped CLI reports source conflicts
// under two different names depending on the command generation; both are
// kept as distinct per-family constants rather than unified.
pub const CONFLICT_ERROR_NAME: &str = "sourceConflictDetected";
pub const RETRIEVE_CONFLICT_ERROR_NAME: &str = "SourceConflictError";

// Environment variable names
pub const JSON_TO_STDOUT_ENV_VAR: &str = "SF_JSON_TO_STDOUT";
pub const LOG_FILTER_ENV_VAR: &str = "MDSYNC_LOG";
pub const CLEAR_OUTPUT_ENV_VAR: &str = "MDSYNC_CLEAR_OUTPUT";
pub const DETECT_CONFLICTS_ENV_VAR: &str = "MDSYNC_DETECT_CONFLICTS";

// Telemetry log names, one per command family
pub const PUSH_LOG_NAME: &str = "project_deploy_start_default_scratch_org";
pub const PULL_LOG_NAME: &str = "project_retrieve_start_default_scratch_org";
pub const DEPLOY_LOG_NAME: &str = "project_deploy_start";
pub const RETRIEVE_LOG_NAME: &str = "project_retrieve_start";
pub const DIFF_LOG_NAME: &str = "project_source_diff";
pub const ORG_CREATE_LOG_NAME: &str = "org_create_default_scratch_org";

// File record states reported by the CLI
pub const STATE_FAILED: &str = "Failed";
pub const STATE_CONFLICT: &str = "Conflict";

// Event channel capacities
pub const OUTPUT_CHANNEL_CAPACITY: usize = 1024;
pub const OPERATION_EVENT_CAPACITY: usize = 256;

// Persisted sync-state document name
pub const SYNC_STATE_FILE_NAME: &str = "sync-state.json";
