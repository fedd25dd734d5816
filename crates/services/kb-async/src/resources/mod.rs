//! API resource implementations for the knowledge-base client

/// Knowledge-base API resource
pub mod knowledge_bases;

pub use knowledge_bases::KnowledgeBases;
