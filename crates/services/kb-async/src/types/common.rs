//! Envelope pieces shared by every endpoint

use serde::{Deserialize, Serialize};

/// `meta` block of a response envelope
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMeta {
    /// Correlation id assigned by the service
    #[serde(default)]
    pub request_id: Option<String>,
    /// Server-side processing time in milliseconds
    #[serde(default)]
    pub processing_time_ms: Option<u64>,
}

/// Access to the `{success, message, meta}` envelope fields
///
/// Resources use it to reject a 2xx body that reports `success: false`.
pub trait Envelope {
    /// Envelope success flag
    fn success(&self) -> bool;
    /// Envelope message, if any
    fn message(&self) -> Option<&str>;
    /// Envelope metadata, if any
    fn meta(&self) -> Option<&ResponseMeta>;
}
