//! Parser for the legacy push family (`result.pushedSource` payloads).

use crate::response::{ErrorResponse, ErrorRows, FamilySpec, ParsedResult, SuccessResponse};
use mdsync_core::constants::CONFLICT_ERROR_NAME;
use mdsync_core::Result;

const PUSH_SPEC: FamilySpec = FamilySpec {
    success_keys: &["pushedSource"],
    error_rows: ErrorRows::TopLevelData,
    conflict_sentinel: CONFLICT_ERROR_NAME,
};

pub struct PushResultParser {
    inner: ParsedResult,
}

impl PushResultParser {
    /// Parse raw push stdout. Fails only when no valid JSON can be located.
    pub fn new(stdout: &str) -> Result<Self> {
        Ok(Self {
            inner: ParsedResult::parse(stdout, PUSH_SPEC)?,
        })
    }

    pub fn status(&self) -> i64 {
        self.inner.status()
    }

    pub fn is_successful(&self) -> bool {
        self.inner.is_successful()
    }

    pub fn successes(&self) -> Option<&SuccessResponse> {
        self.inner.successes()
    }

    pub fn errors(&self) -> Option<&ErrorResponse> {
        self.inner.errors()
    }

    pub fn has_conflicts(&self) -> bool {
        self.inner.has_conflicts()
    }
}
