//! Parser for the newer retrieve family (`result.files` payloads,
//! `SourceConflictError` sentinel).

use crate::response::{ErrorResponse, ErrorRows, FamilySpec, ParsedResult, SuccessResponse};
use mdsync_core::constants::RETRIEVE_CONFLICT_ERROR_NAME;
use mdsync_core::Result;

const RETRIEVE_SPEC: FamilySpec = FamilySpec {
    success_keys: &["files"],
    error_rows: ErrorRows::FilteredResultFiles,
    conflict_sentinel: RETRIEVE_CONFLICT_ERROR_NAME,
};

pub struct RetrieveResultParser {
    inner: ParsedResult,
}

impl RetrieveResultParser {
    /// Parse raw retrieve stdout. Fails only when no valid JSON can be
    /// located.
    pub fn new(stdout: &str) -> Result<Self> {
        Ok(Self {
            inner: ParsedResult::parse(stdout, RETRIEVE_SPEC)?,
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

#[cfg(test)]
mod tests {
    use super::*;
    use mdsync_core::constants::CONFLICT_ERROR_NAME;

    #[test]
    fn retrieve_conflicts_use_the_newer_sentinel() {
        let stdout = format!(
            r#"{{"status":1,"name":"{RETRIEVE_CONFLICT_ERROR_NAME}","message":"conflicts","result":{{"files":[{{"state":"Conflict","fullName":"X","type":"ApexClass","filePath":"classes/X.cls"}}]}}}}"#
        );
        let parser = RetrieveResultParser::new(&stdout).unwrap();
        assert!(parser.has_conflicts());
    }

    #[test]
    fn legacy_sentinel_is_not_a_retrieve_conflict() {
        // The two sentinels are distinct per family and never unified
        let stdout = format!(
            r#"{{"status":1,"name":"{CONFLICT_ERROR_NAME}","message":"conflicts","result":{{"files":[]}}}}"#
        );
        let parser = RetrieveResultParser::new(&stdout).unwrap();
        assert!(!parser.has_conflicts());
        assert!(parser.errors().is_some());
    }

    #[test]
    fn successful_retrieve_unwraps_files() {
        let stdout = r#"{"status":0,"result":{"files":[{"state":"Created","fullName":"Widget","type":"LightningComponentBundle","filePath":"force-app/main/default/lwc/widget/widget.js"}]}}"#;
        let parser = RetrieveResultParser::new(stdout).unwrap();
        assert!(parser.is_successful());
        assert_eq!(parser.successes().unwrap().files[0].full_name, "Widget");
    }
}
