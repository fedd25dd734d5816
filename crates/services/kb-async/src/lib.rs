#![deny(clippy::all)]
#![deny(missing_docs)]

//! Async knowledge-base retrieval client with credential checks, a typed
//! error taxonomy, bounded retries, and an agent-tool adapter.

/// API key validation and redaction
pub mod auth;
/// Failure classification
pub mod classify;
/// HTTP client implementation
pub mod client;
/// Configuration types for the client
pub mod config;
/// Error types
pub mod error;
/// API resource implementations
pub mod resources;
/// Retry policy
pub mod retry;
/// Test support utilities (for use in tests)
#[doc(hidden)]
pub mod test_support;
/// Agent-tool adapter
#[cfg(feature = "tools")]
pub mod tools;
/// Request and response types
pub mod types;

pub use crate::auth::{ApiKey, Environment};
pub use crate::client::Client;
pub use crate::config::{Config, KbConfig};
pub use crate::error::{ErrorDetail, ErrorKind, ErrorRecord, KbError};
pub use crate::retry::RetryPolicy;
#[cfg(feature = "tools")]
pub use crate::tools::{KnowledgeBaseTool, KnowledgeBaseToolInput};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::types::*;
    pub use crate::{Client, ErrorKind, KbConfig, KbError};
}
