//! Locating the JSON object inside raw CLI stdout.

use mdsync_core::{Error, Result};
use serde_json::Value;

/// Extract and parse the JSON object embedded in `stdout`.
///
/// The CLI echoes the invoked command line before the JSON and an exit
/// banner after it, so the object is taken as the substring between the
/// first `{` and the last `}`. No delimiters, or a delimited substring that
/// is not valid JSON, is a hard parse failure carrying the raw text.
pub fn extract_json_object(stdout: &str) -> Result<Value> {
    let start = stdout
        .find('{')
        .ok_or_else(|| Error::parse("no JSON object found in command output", stdout))?;
    let end = stdout
        .rfind('}')
        .filter(|&end| end >= start)
        .ok_or_else(|| Error::parse("unterminated JSON object in command output", stdout))?;

    serde_json::from_str(&stdout[start..=end])
        .map_err(|e| Error::parse(format!("invalid JSON in command output: {e}"), stdout))
}
