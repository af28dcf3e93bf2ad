//! Parser for org-create results.

use crate::extract::extract_json_object;
use crate::response::ErrorResponse;
use mdsync_core::Result;
use serde_json::Value;

/// Success payload of an org-create invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrgCreateSuccessResponse {
    pub status: i64,
    pub org_id: String,
    pub username: String,
}

pub struct OrgCreateResultParser {
    status: i64,
    successes: Option<OrgCreateSuccessResponse>,
    errors: Option<ErrorResponse>,
}

impl OrgCreateResultParser {
    /// Parse raw org-create stdout. Fails only when no valid JSON can be
    /// located.
    pub fn new(stdout: &str) -> Result<Self> {
        let value = extract_json_object(stdout)?;
        let status = value.get("status").and_then(Value::as_i64).unwrap_or(0);

        let successes = if status == 0 {
            value.get("result").map(|result| OrgCreateSuccessResponse {
                status,
                org_id: field(result, "orgId"),
                username: field(result, "username"),
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

    pub fn successes(&self) -> Option<&OrgCreateSuccessResponse> {
        self.successes.as_ref()
    }

    pub fn errors(&self) -> Option<&ErrorResponse> {
        self.errors.as_ref()
    }

    /// Org creation has no conflict sentinel
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
