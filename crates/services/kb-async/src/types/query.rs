//! Types for `POST /api/v1/knowledge-base/{id}/query`

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::common::{Envelope, ResponseMeta};

/// Maximum query length, in characters, after trimming
pub const MAX_QUERY_CHARS: usize = 1000;
/// Smallest accepted `top_k`
pub const MIN_TOP_K: u32 = 1;
/// Largest accepted `top_k`
pub const MAX_TOP_K: u32 = 100;

/// Request body for a knowledge-base query
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    /// Natural-language query text
    pub query: String,
    /// Number of results to return (1 to 100)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
    /// Return document metadata with each result
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_metadata: Option<bool>,
    /// Ask the service to generate an answer from the results
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_generation: Option<bool>,
    /// Maps service field names onto caller field names
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_mapping: Option<BTreeMap<String, String>>,
}

impl QueryRequest {
    /// Create a new query request with the given text
    #[must_use]
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }

    /// Set the number of results
    #[must_use]
    pub const fn with_top_k(mut self, top_k: u32) -> Self {
        self.top_k = Some(top_k);
        self
    }

    /// Include metadata with each result
    #[must_use]
    pub const fn with_include_metadata(mut self, include: bool) -> Self {
        self.include_metadata = Some(include);
        self
    }

    /// Enable or disable answer generation
    #[must_use]
    pub const fn with_use_generation(mut self, generate: bool) -> Self {
        self.use_generation = Some(generate);
        self
    }

    /// Add one field mapping entry
    #[must_use]
    pub fn with_field_mapping(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.field_mapping
            .get_or_insert_with(BTreeMap::new)
            .insert(from.into(), to.into());
        self
    }
}

/// A single retrieved chunk
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    /// Retrieved text
    #[serde(default)]
    pub content: String,
    /// Relevance score
    #[serde(default)]
    pub score: Option<f64>,
    /// Source document id
    #[serde(default)]
    pub document_id: Option<String>,
    /// Source document title
    #[serde(default)]
    pub title: Option<String>,
    /// Document metadata, when requested
    #[serde(default)]
    pub metadata: Option<Value>,
}

/// Payload of a query response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryData {
    /// Retrieved chunks, best first
    #[serde(default)]
    pub results: Vec<QueryResult>,
    /// Generated answer, when generation was requested
    #[serde(default)]
    pub answer: Option<String>,
    /// The query as the service understood it
    #[serde(default)]
    pub query: Option<String>,
    /// Total number of matches
    #[serde(default)]
    pub total_results: Option<u64>,
}

/// Response from a knowledge-base query
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResponse {
    /// Envelope success flag
    pub success: bool,
    /// Query payload
    #[serde(default)]
    pub data: QueryData,
    /// Envelope message
    #[serde(default)]
    pub message: Option<String>,
    /// Response metadata
    #[serde(default)]
    pub meta: Option<ResponseMeta>,
}

impl Envelope for QueryResponse {
    fn success(&self) -> bool {
        self.success
    }

    fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    fn meta(&self) -> Option<&ResponseMeta> {
        self.meta.as_ref()
    }
}
