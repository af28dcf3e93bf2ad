//! Parser for the diff family: a single remote/local file pair rather than
//! a list of affected files.

use crate::extract::extract_json_object;
use crate::response::ErrorResponse;
use mdsync_core::Result;
use serde_json::Value;

/// Success payload of a diff invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffSuccessResponse {
    pub status: i64,
    pub remote: String,
    pub local: String,
    pub file_name: String,
}

pub struct DiffResultParser {
    status: i64,
    successes: Option<DiffSuccessResponse>,
    errors: Option<ErrorResponse>,
}

impl DiffResultParser {
    /// Parse raw diff stdout. Fails only when no valid JSON can be located.
    pub fn new(stdout: &str) -> Result<Self> {
        let value = extract_json_object(stdout)?;
        let status = value.get("status").and_then(Value::as_i64).unwrap_or(0);

        let successes = if status == 0 {
            value.get("result").map(|result| DiffSuccessResponse {
                status,
                remote: field(result, "remote"),
                local: field(result, "local"),
                file_name: field(result, "fileName"),
            })
        } else {
            None
        };
        let errors = if status != 0 {
            Some(ErrorResponse {
                status,
                name: field(&value, "name"),
                message: field(&value, "message"),
                warnings: Vec::new(),
                files: Vec::new(),
            })
        } else {
            None
        };

        Ok(Self {
            status,
            successes,
            errors,
        })
    }

    pub fn status(&self) -> i64 {
        self.status
    }

    pub fn is_successful(&self) -> bool {
        self.status == 0
    }

    pub fn successes(&self) -> Option<&DiffSuccessResponse> {
        self.successes.as_ref()
    }

    pub fn errors(&self) -> Option<&ErrorResponse> {
        self.errors.as_ref()
    }

    /// The diff family has no conflict sentinel
    pub fn has_conflicts(&self) -> bool {
        false
    }
}

fn field(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}
