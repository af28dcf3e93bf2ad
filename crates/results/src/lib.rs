//! Parsers for the heterogeneous JSON result shapes the metadata CLI prints.
//!
//! Each command family gets one parser type. All of them follow the same
//! two-step approach: locate and parse the raw JSON into a
//! [`serde_json::Value`] tree, then explicitly normalize the family-specific
//! payload key names into one canonical shape ([`SuccessResponse`] /
//! [`ErrorResponse`]), so callers never branch on command family.
//!
//! Construction is the only hard failure point: output without a locatable,
//! valid JSON object raises [`mdsync_core::Error::Parse`] with the raw text
//! preserved. Missing fields inside otherwise valid JSON degrade to empty
//! values — downstream UI must always have *something* to render.

pub mod deploy;
pub mod diff;
pub mod extract;
pub mod org_create;
pub mod pull;
pub mod push;
pub mod response;
pub mod retrieve;

pub use deploy::DeployResultParser;
pub use diff::{DiffResultParser, DiffSuccessResponse};
pub use org_create::{OrgCreateResultParser, OrgCreateSuccessResponse};
pub use pull::PullResultParser;
pub use push::PushResultParser;
pub use response::{ErrorResponse, SuccessResponse};
pub use retrieve::RetrieveResultParser;
