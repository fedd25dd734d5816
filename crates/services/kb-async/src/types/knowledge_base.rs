//! Types for the `/api/v1/knowledge-base` listing and lookup endpoints

use serde::{Deserialize, Serialize};

use super::common::{Envelope, ResponseMeta};

/// Query parameters for `GET /api/v1/knowledge-base`
///
/// Unset fields are omitted from the query string entirely.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    /// 1-based page number
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    /// Page size (1 to 100)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    /// Include archived knowledge bases
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_archived: Option<bool>,
}

impl ListParams {
    /// Creates empty parameters
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the page number
    #[must_use]
    pub const fn with_page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    /// Set the page size
    #[must_use]
    pub const fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Include or exclude archived knowledge bases
    #[must_use]
    pub const fn with_include_archived(mut self, include: bool) -> Self {
        self.include_archived = Some(include);
        self
    }
}

/// A knowledge base as returned by the API
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeBase {
    /// Unique identifier
    pub id: String,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Free-form description
    #[serde(default)]
    pub description: Option<String>,
    /// Lifecycle status (e.g. `active`, `archived`)
    #[serde(default)]
    pub status: Option<String>,
    /// Number of indexed documents
    #[serde(default)]
    pub document_count: Option<u64>,
    /// Creation timestamp
    #[serde(default)]
    pub created_at: Option<String>,
    /// Last update timestamp
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// Pagination block of a list response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    /// Current page
    #[serde(default)]
    pub page: Option<u32>,
    /// Page size
    #[serde(default)]
    pub limit: Option<u32>,
    /// Total number of items
    #[serde(default)]
    pub total: Option<u64>,
    /// Total number of pages
    #[serde(default)]
    pub total_pages: Option<u32>,
}

/// Response from `GET /api/v1/knowledge-base`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListKnowledgeBasesResponse {
    /// Envelope success flag
    pub success: bool,
    /// Knowledge bases on this page
    #[serde(default)]
    pub data: Vec<KnowledgeBase>,
    /// Pagination info, when the server sends it
    #[serde(default)]
    pub pagination: Option<Pagination>,
    /// Envelope message, usually set when `success` is false
    #[serde(default)]
    pub message: Option<String>,
    /// Response metadata
    #[serde(default)]
    pub meta: Option<ResponseMeta>,
}

impl Envelope for ListKnowledgeBasesResponse {
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

/// Response from `GET /api/v1/knowledge-base/{id}`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetKnowledgeBaseResponse {
    /// Envelope success flag
    pub success: bool,
    /// The knowledge base
    #[serde(default)]
    pub data: Option<KnowledgeBase>,
    /// Envelope message
    #[serde(default)]
    pub message: Option<String>,
    /// Response metadata
    #[serde(default)]
    pub meta: Option<ResponseMeta>,
}

impl Envelope for GetKnowledgeBaseResponse {
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
