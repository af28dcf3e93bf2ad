//! Parser for the legacy pull family (`result.pulledSource` payloads).

use crate::response::{ErrorResponse, ErrorRows, FamilySpec, ParsedResult, SuccessResponse};
use mdsync_core::constants::CONFLICT_ERROR_NAME;
use mdsync_core::Result;

const PULL_SPEC: FamilySpec = FamilySpec {
    success_keys: &["pulledSource"],
    error_rows: ErrorRows::TopLevelData,
    conflict_sentinel: CONFLICT_ERROR_NAME,
};

pub struct PullResultParser {
    inner: ParsedResult,
}

impl PullResultParser {
    /// Parse raw pull stdout. Fails only when no valid JSON can be located.
    pub fn new(stdout: &str) -> Result<Self> {
        Ok(Self {
            inner: ParsedResult::parse(stdout, PULL_SPEC)?,
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
