//! Request and response types for the knowledge-base API

/// Envelope types shared across endpoints
pub mod common;
/// Knowledge-base listing and lookup types
pub mod knowledge_base;
/// Query endpoint types
pub mod query;

pub use common::*;
pub use knowledge_base::{
    GetKnowledgeBaseResponse, KnowledgeBase, ListKnowledgeBasesResponse, ListParams, Pagination,
};
pub use query::{QueryData, QueryRequest, QueryResponse, QueryResult};
