//! Domain data structures shared across the workspace.
//!
//! The wire format of the wrapped CLI uses camelCase keys; serde rename
//! attributes keep the Rust field names idiomatic while matching the JSON
//! the tool actually emits.

use serde::{Deserialize, Serialize};

/// One affected file/component record, the normalized success-side row shape
/// every parser family unwraps its payload into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// State reported by the CLI, e.g. `Created`, `Changed`, `Conflict`
    #[serde(default)]
    pub state: String,
    #[serde(rename = "fullName", default)]
    pub full_name: String,
    #[serde(rename = "type", default)]
    pub type_name: String,
    #[serde(rename = "filePath", default)]
    pub file_path: Option<String>,
}

impl FileRecord {
    /// Whether this record denotes a failed or conflicting file
    pub fn is_failure_state(&self) -> bool {
        self.state == crate::constants::STATE_FAILED
            || self.state == crate::constants::STATE_CONFLICT
    }
}

/// One per-file error row from a failed or partially failed invocation.
///
/// The CLI frequently omits fields here (older versions leave out line and
/// column information entirely), so everything except the path is optional
/// or defaulted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileFailure {
    #[serde(rename = "filePath", default)]
    pub file_path: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(rename = "lineNumber", default)]
    pub line_number: Option<String>,
    #[serde(rename = "columnNumber", default)]
    pub column_number: Option<String>,
    #[serde(rename = "type", default)]
    pub type_name: Option<String>,
    #[serde(rename = "fullName", default)]
    pub full_name: Option<String>,
}
