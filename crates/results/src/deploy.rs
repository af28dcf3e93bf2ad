//! Parser for the newer deploy family (`result.files` payloads).

use crate::response::{ErrorResponse, ErrorRows, FamilySpec, ParsedResult, SuccessResponse};
use mdsync_core::constants::CONFLICT_ERROR_NAME;
use mdsync_core::Result;

const DEPLOY_SPEC: FamilySpec = FamilySpec {
    success_keys: &["files"],
    error_rows: ErrorRows::FilteredResultFiles,
    conflict_sentinel: CONFLICT_ERROR_NAME,
};

pub struct DeployResultParser {
    inner: ParsedResult,
}

impl DeployResultParser {
    /// Parse raw deploy stdout. Fails only when no valid JSON can be located.
    pub fn new(stdout: &str) -> Result<Self> {
        Ok(Self {
            inner: ParsedResult::parse(stdout, DEPLOY_SPEC)?,
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

    /// Error rows are the `result.files` entries whose state is `Failed` or
    /// `Conflict`; rows that landed are reported through `successes()`.
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

    #[test]
    fn unwraps_files_payload_on_success() {
        let stdout = r#"{"status":0,"result":{"files":[{"state":"Changed","fullName":"MyClass","type":"ApexClass","filePath":"force-app/main/default/classes/MyClass.cls"}]}}"#;
        let parser = DeployResultParser::new(stdout).unwrap();
        assert!(parser.is_successful());
        assert_eq!(parser.successes().unwrap().files.len(), 1);
        assert!(parser.errors().is_none());
    }

    #[test]
    fn mixed_states_surface_through_both_accessors() {
        let stdout = r#"{"status":1,"name":"DeployFailed","message":"Deploy failed.","result":{"files":[
            {"state":"Changed","fullName":"Good","type":"ApexClass","filePath":"classes/Good.cls"},
            {"state":"Failed","fullName":"Bad","type":"ApexClass","filePath":"classes/Bad.cls"},
            {"state":"Conflict","fullName":"Worse","type":"ApexClass","filePath":"classes/Worse.cls"}
        ]}}"#;
        let parser = DeployResultParser::new(stdout).unwrap();
        assert!(!parser.is_successful());

        let successes = parser.successes().expect("partial successes expected");
        assert_eq!(successes.files.len(), 1);
        assert_eq!(successes.files[0].full_name, "Good");

        let errors = parser.errors().expect("errors expected");
        assert_eq!(errors.files.len(), 2);
        assert!(errors
            .files
            .iter()
            .all(|f| matches!(f.state.as_deref(), Some("Failed" | "Conflict"))));
    }

    #[test]
    fn all_failed_rows_mean_no_success_payload() {
        let stdout = r#"{"status":1,"name":"DeployFailed","message":"Deploy failed.","result":{"files":[{"state":"Failed","fullName":"Bad","type":"ApexClass","filePath":"classes/Bad.cls"}]}}"#;
        let parser = DeployResultParser::new(stdout).unwrap();
        assert!(parser.successes().is_none());
        assert_eq!(parser.errors().unwrap().files.len(), 1);
    }

    #[test]
    fn deploy_conflicts_use_the_legacy_sentinel() {
        let stdout = format!(
            r#"{{"status":1,"name":"{CONFLICT_ERROR_NAME}","message":"conflicts","result":{{"files":[{{"state":"Conflict","fullName":"X","type":"ApexClass","filePath":"classes/X.cls"}}]}}}}"#
        );
        let parser = DeployResultParser::new(&stdout).unwrap();
        assert!(parser.has_conflicts());
        assert_eq!(parser.errors().unwrap().files.len(), 1);
    }
}
