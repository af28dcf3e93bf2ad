//! Canonical normalized result shapes and the shared normalization step.

use crate::extract::extract_json_object;
use mdsync_core::{FileFailure, FileRecord, Result};
use serde_json::Value;
use tracing::warn;

/// Normalized success payload: the family-specific key names
/// (`pushedSource`, `pulledSource`, a bare `files` list, `partialSuccess`)
/// are unwrapped into one list of affected file records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuccessResponse {
    pub status: i64,
    pub files: Vec<FileRecord>,
}

/// Normalized error payload. Fields the CLI omitted degrade to empty values
/// rather than failing the parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorResponse {
    pub status: i64,
    pub name: String,
    pub message: String,
    pub warnings: Vec<String>,
    pub files: Vec<FileFailure>,
}

/// Where a family reports its per-file error rows.
#[derive(Debug, Clone, Copy)]
pub(crate) enum ErrorRows {
    /// Legacy shape: a top-level `data` array next to `name`/`message`
    TopLevelData,
    /// Newer shape: `result.files` rows, filtered to failure states
    FilteredResultFiles,
}

/// Per-family configuration for the shared normalization step.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FamilySpec {
    pub success_keys: &'static [&'static str],
    pub error_rows: ErrorRows,
    pub conflict_sentinel: &'static str,
}

/// The family-agnostic core every file-list parser wraps.
#[derive(Debug, Clone)]
pub(crate) struct ParsedResult {
    status: i64,
    successes: Option<SuccessResponse>,
    errors: Option<ErrorResponse>,
    conflict_sentinel: &'static str,
}

impl ParsedResult {
    pub(crate) fn parse(stdout: &str, spec: FamilySpec) -> Result<Self> {
        let value = extract_json_object(stdout)?;
        let status = value.get("status").and_then(Value::as_i64).unwrap_or(0);

        let successes = normalize_successes(&value, status, spec);
        let errors = if status != 0 {
            Some(normalize_errors(&value, status, spec))
        } else {
            None
        };

        Ok(Self {
            status,
            successes,
            errors,
            conflict_sentinel: spec.conflict_sentinel,
        })
    }

    pub(crate) fn status(&self) -> i64 {
        self.status
    }

    pub(crate) fn is_successful(&self) -> bool {
        self.status == 0
    }

    pub(crate) fn successes(&self) -> Option<&SuccessResponse> {
        self.successes.as_ref()
    }

    pub(crate) fn errors(&self) -> Option<&ErrorResponse> {
        self.errors.as_ref()
    }

    /// True iff the invocation failed *and* the error name is this family's
    /// conflict sentinel. Never true on a successful status, whatever the
    /// payload claims.
    pub(crate) fn has_conflicts(&self) -> bool {
        self.status == 1
            && self
                .errors
                .as_ref()
                .is_some_and(|e| e.name == self.conflict_sentinel)
    }
}

/// Unwrap the family success payload, if any, into the canonical shape.
///
/// On a failing status the CLI can still report what *did* land: a
/// `partialSuccess` list (legacy) or non-failed rows in `result.files`
/// (newer). Both surface as a `SuccessResponse` alongside the errors, so
/// callers that only check one accessor cannot silently drop data.
fn normalize_successes(value: &Value, status: i64, spec: FamilySpec) -> Option<SuccessResponse> {
    let result_rows = value.get("result").and_then(|result| {
        spec.success_keys
            .iter()
            .find_map(|key| result.get(*key))
            .map(file_records)
    });

    if status == 0 {
        return Some(SuccessResponse {
            status,
            files: result_rows.unwrap_or_default(),
        });
    }

    // Failing status: look for a partial-success payload.
    if let Some(partial) = value.get("partialSuccess") {
        return Some(SuccessResponse {
            status,
            files: file_records(partial),
        });
    }
    if matches!(spec.error_rows, ErrorRows::FilteredResultFiles) {
        let survivors: Vec<FileRecord> = result_rows
            .unwrap_or_default()
            .into_iter()
            .filter(|record| !record.is_failure_state())
            .collect();
        if !survivors.is_empty() {
            return Some(SuccessResponse {
                status,
                files: survivors,
            });
        }
    }
    None
}

/// Build the best-effort error payload for a failing status.
fn normalize_errors(value: &Value, status: i64, spec: FamilySpec) -> ErrorResponse {
    let files = match spec.error_rows {
        ErrorRows::TopLevelData => value.get("data").map(failure_rows).unwrap_or_default(),
        ErrorRows::FilteredResultFiles => value
            .get("result")
            .and_then(|result| result.get("files"))
            .map(|rows| {
                file_records(rows)
                    .into_iter()
                    .filter(FileRecord::is_failure_state)
                    .map(failure_from_record)
                    .collect()
            })
            .unwrap_or_default(),
    };

    ErrorResponse {
        status,
        name: string_field(value, "name"),
        message: string_field(value, "message"),
        warnings: string_array(value, "warnings"),
        files,
    }
}

fn string_field(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn string_array(value: &Value, key: &str) -> Vec<String> {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .map(|item| match item.as_str() {
                    Some(s) => s.to_string(),
                    None => item.to_string(),
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Deserialize an array (or a single object) of affected-file rows,
/// skipping rows that do not resemble records at all.
fn file_records(rows: &Value) -> Vec<FileRecord> {
    json_rows(rows)
        .filter_map(|row| match serde_json::from_value(row.clone()) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(error = %e, "skipping malformed file record in CLI output");
                None
            }
        })
        .collect()
}

fn failure_rows(rows: &Value) -> Vec<FileFailure> {
    json_rows(rows)
        .filter_map(|row| match serde_json::from_value(row.clone()) {
            Ok(failure) => Some(failure),
            Err(e) => {
                warn!(error = %e, "skipping malformed error row in CLI output");
                None
            }
        })
        .collect()
}

fn json_rows(rows: &Value) -> Box<dyn Iterator<Item = &Value> + '_> {
    match rows {
        Value::Array(items) => Box::new(items.iter()),
        Value::Object(_) => Box::new(std::iter::once(rows)),
        _ => Box::new(std::iter::empty()),
    }
}

fn failure_from_record(record: FileRecord) -> FileFailure {
    FileFailure {
        file_path: record.file_path,
        state: Some(record.state),
        error: None,
        line_number: None,
        column_number: None,
        type_name: Some(record.type_name),
        full_name: Some(record.full_name),
    }
}
