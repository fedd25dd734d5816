use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Closed set of error kinds surfaced by the client
///
/// Every kind carries a stable wire code, a default message and a default
/// HTTP status. Callers should branch on the kind, never on message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    // Authentication
    /// The API key is malformed or was rejected
    InvalidApiKey,
    /// The API key has expired
    ExpiredApiKey,
    /// The API key lacks the scope for this operation
    InsufficientPermissions,
    /// Too many requests in the current window
    RateLimitExceeded,

    // Knowledge bases
    /// The knowledge base does not exist
    KnowledgeBaseNotFound,
    /// The caller may not access the knowledge base
    KnowledgeBaseAccessDenied,
    /// The knowledge base could not be created
    KnowledgeBaseCreationFailed,
    /// Importing into the knowledge base failed
    KnowledgeBaseImportFailed,

    // Queries
    /// The query is malformed
    InvalidQuery,
    /// The query text exceeds the length limit
    QueryTooLong,
    /// The query matched nothing
    NoResultsFound,
    /// The query took too long on the server
    QueryTimeout,

    // Documents
    /// The document does not exist
    DocumentNotFound,
    /// The document upload failed
    DocumentUploadFailed,
    /// The document type is not supported
    UnsupportedFileType,
    /// The document exceeds the size limit
    FileTooLarge,
    /// Processing the document failed
    DocumentProcessingFailed,

    // Sessions
    /// The chat session does not exist
    SessionNotFound,
    /// The chat session has expired
    SessionExpired,
    /// The chat message is malformed
    InvalidMessage,

    // Transport
    /// The request failed before a usable response arrived
    NetworkError,
    /// The request timed out
    RequestTimeout,
    /// The service reported itself unavailable
    ServiceUnavailable,

    // Validation
    /// Generic input validation failure
    ValidationError,
    /// A required field is missing
    MissingRequiredField,
    /// A field holds an invalid value
    InvalidFieldValue,

    // Server
    /// Unclassified server-side failure
    InternalServerError,
    /// The server is temporarily unable to handle the request
    TemporarilyUnavailable,

    // Library
    /// The client could not be initialized
    InitializationError,
    /// The operation is not supported by this client
    UnsupportedOperation,
    /// The client configuration is invalid
    ConfigurationError,
}

impl ErrorKind {
    /// Every kind, in declaration order
    pub const ALL: [Self; 31] = [
        Self::InvalidApiKey,
        Self::ExpiredApiKey,
        Self::InsufficientPermissions,
        Self::RateLimitExceeded,
        Self::KnowledgeBaseNotFound,
        Self::KnowledgeBaseAccessDenied,
        Self::KnowledgeBaseCreationFailed,
        Self::KnowledgeBaseImportFailed,
        Self::InvalidQuery,
        Self::QueryTooLong,
        Self::NoResultsFound,
        Self::QueryTimeout,
        Self::DocumentNotFound,
        Self::DocumentUploadFailed,
        Self::UnsupportedFileType,
        Self::FileTooLarge,
        Self::DocumentProcessingFailed,
        Self::SessionNotFound,
        Self::SessionExpired,
        Self::InvalidMessage,
        Self::NetworkError,
        Self::RequestTimeout,
        Self::ServiceUnavailable,
        Self::ValidationError,
        Self::MissingRequiredField,
        Self::InvalidFieldValue,
        Self::InternalServerError,
        Self::TemporarilyUnavailable,
        Self::InitializationError,
        Self::UnsupportedOperation,
        Self::ConfigurationError,
    ];

    /// Stable wire code, e.g. `INVALID_API_KEY`
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::InvalidApiKey => "INVALID_API_KEY",
            Self::ExpiredApiKey => "EXPIRED_API_KEY",
            Self::InsufficientPermissions => "INSUFFICIENT_PERMISSIONS",
            Self::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
            Self::KnowledgeBaseNotFound => "KNOWLEDGE_BASE_NOT_FOUND",
            Self::KnowledgeBaseAccessDenied => "KNOWLEDGE_BASE_ACCESS_DENIED",
            Self::KnowledgeBaseCreationFailed => "KNOWLEDGE_BASE_CREATION_FAILED",
            Self::KnowledgeBaseImportFailed => "KNOWLEDGE_BASE_IMPORT_FAILED",
            Self::InvalidQuery => "INVALID_QUERY",
            Self::QueryTooLong => "QUERY_TOO_LONG",
            Self::NoResultsFound => "NO_RESULTS_FOUND",
            Self::QueryTimeout => "QUERY_TIMEOUT",
            Self::DocumentNotFound => "DOCUMENT_NOT_FOUND",
            Self::DocumentUploadFailed => "DOCUMENT_UPLOAD_FAILED",
            Self::UnsupportedFileType => "UNSUPPORTED_FILE_TYPE",
            Self::FileTooLarge => "FILE_TOO_LARGE",
            Self::DocumentProcessingFailed => "DOCUMENT_PROCESSING_FAILED",
            Self::SessionNotFound => "SESSION_NOT_FOUND",
            Self::SessionExpired => "SESSION_EXPIRED",
            Self::InvalidMessage => "INVALID_MESSAGE",
            Self::NetworkError => "NETWORK_ERROR",
            Self::RequestTimeout => "REQUEST_TIMEOUT",
            Self::ServiceUnavailable => "SERVICE_UNAVAILABLE",
            Self::ValidationError => "VALIDATION_ERROR",
            Self::MissingRequiredField => "MISSING_REQUIRED_FIELD",
            Self::InvalidFieldValue => "INVALID_FIELD_VALUE",
            Self::InternalServerError => "INTERNAL_SERVER_ERROR",
            Self::TemporarilyUnavailable => "TEMPORARILY_UNAVAILABLE",
            Self::InitializationError => "INITIALIZATION_ERROR",
            Self::UnsupportedOperation => "UNSUPPORTED_OPERATION",
            Self::ConfigurationError => "CONFIGURATION_ERROR",
        }
    }

    /// Looks a kind up by its wire code
    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.code() == code)
    }

    /// Message used when an error is built without one
    #[must_use]
    pub const fn default_message(self) -> &'static str {
        match self {
            Self::InvalidApiKey => "Invalid API key provided",
            Self::ExpiredApiKey => "API key has expired",
            Self::InsufficientPermissions => "Insufficient permissions for this operation",
            Self::RateLimitExceeded => "Rate limit exceeded, please retry later",
            Self::KnowledgeBaseNotFound => "Knowledge base not found",
            Self::KnowledgeBaseAccessDenied => "Access to knowledge base denied",
            Self::KnowledgeBaseCreationFailed => "Failed to create knowledge base",
            Self::KnowledgeBaseImportFailed => "Failed to import into knowledge base",
            Self::InvalidQuery => "Invalid query",
            Self::QueryTooLong => "Query exceeds the maximum allowed length",
            Self::NoResultsFound => "No results found for query",
            Self::QueryTimeout => "Query timed out",
            Self::DocumentNotFound => "Document not found",
            Self::DocumentUploadFailed => "Failed to upload document",
            Self::UnsupportedFileType => "Unsupported file type",
            Self::FileTooLarge => "File exceeds the maximum allowed size",
            Self::DocumentProcessingFailed => "Failed to process document",
            Self::SessionNotFound => "Session not found",
            Self::SessionExpired => "Session has expired",
            Self::InvalidMessage => "Invalid message",
            Self::NetworkError => "Network error occurred",
            Self::RequestTimeout => "Request timed out",
            Self::ServiceUnavailable => "Service is currently unavailable",
            Self::ValidationError => "Validation failed",
            Self::MissingRequiredField => "A required field is missing",
            Self::InvalidFieldValue => "A field has an invalid value",
            Self::InternalServerError => "Internal server error",
            Self::TemporarilyUnavailable => "Service temporarily unavailable",
            Self::InitializationError => "Failed to initialize client",
            Self::UnsupportedOperation => "Operation not supported",
            Self::ConfigurationError => "Invalid client configuration",
        }
    }

    /// HTTP status used when an error is built without one
    #[must_use]
    pub const fn default_status(self) -> u16 {
        match self {
            Self::InvalidApiKey | Self::ExpiredApiKey => 401,
            Self::InsufficientPermissions | Self::KnowledgeBaseAccessDenied => 403,
            Self::KnowledgeBaseNotFound
            | Self::NoResultsFound
            | Self::DocumentNotFound
            | Self::SessionNotFound => 404,
            Self::RequestTimeout | Self::QueryTimeout => 408,
            Self::SessionExpired => 410,
            Self::FileTooLarge => 413,
            Self::UnsupportedFileType => 415,
            Self::RateLimitExceeded => 429,
            Self::InvalidQuery
            | Self::QueryTooLong
            | Self::InvalidMessage
            | Self::ValidationError
            | Self::MissingRequiredField
            | Self::InvalidFieldValue => 400,
            Self::UnsupportedOperation => 501,
            Self::NetworkError | Self::ServiceUnavailable | Self::TemporarilyUnavailable => 503,
            Self::KnowledgeBaseCreationFailed
            | Self::KnowledgeBaseImportFailed
            | Self::DocumentUploadFailed
            | Self::DocumentProcessingFailed
            | Self::InternalServerError
            | Self::InitializationError
            | Self::ConfigurationError => 500,
        }
    }

    /// Whether a failure of this kind may succeed on a later attempt
    ///
    /// Caller-fixable kinds (bad credentials, missing scope, invalid input,
    /// unknown knowledge base) are never retried.
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        !matches!(
            self,
            Self::InvalidApiKey
                | Self::InsufficientPermissions
                | Self::ValidationError
                | Self::KnowledgeBaseNotFound
        )
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// One structured detail entry attached to an error
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ErrorDetail(Map<String, Value>);

impl ErrorDetail {
    /// Creates an empty detail record
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a field to the record
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Returns a field of the record
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Returns the underlying key/value map
    #[must_use]
    pub const fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Normalizes an arbitrary JSON payload into a list of detail records
    ///
    /// An object becomes a single record, an array becomes one record per
    /// element, and `null` yields no records. Non-object values are wrapped
    /// as `{"value": ...}`.
    #[must_use]
    pub fn normalize(value: Value) -> Vec<Self> {
        match value {
            Value::Null => Vec::new(),
            Value::Array(items) => items.into_iter().map(Self::from_value).collect(),
            other => vec![Self::from_value(other)],
        }
    }

    fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => Self(map),
            other => Self::new().with("value", other),
        }
    }
}

impl From<Map<String, Value>> for ErrorDetail {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// The single error type returned by every fallible operation
#[derive(Debug, Clone, Error)]
#[error("{kind} ({status}): {message}")]
pub struct KbError {
    kind: ErrorKind,
    message: String,
    status: u16,
    details: Vec<ErrorDetail>,
    request_id: Option<String>,
    timestamp: DateTime<Utc>,
}

impl KbError {
    /// Creates an error with the kind's default message and status
    #[must_use]
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: kind.default_message().to_string(),
            status: kind.default_status(),
            details: Vec::new(),
            request_id: None,
            timestamp: Utc::now(),
        }
    }

    /// Builds an error from optional parts, falling back to the kind defaults
    ///
    /// Never fails. `details` is normalized with [`ErrorDetail::normalize`].
    #[must_use]
    pub fn make(
        kind: ErrorKind,
        message: Option<String>,
        status: Option<u16>,
        details: Option<Value>,
        request_id: Option<String>,
    ) -> Self {
        let mut err = Self::new(kind);
        if let Some(message) = message {
            err.message = message;
        }
        if let Some(status) = status {
            err.status = status;
        }
        if let Some(details) = details {
            err.details = ErrorDetail::normalize(details);
        }
        err.request_id = request_id;
        err
    }

    /// Builds an error from a wire code; unknown codes become `INTERNAL_SERVER_ERROR`
    #[must_use]
    pub fn from_code(code: &str, message: Option<String>) -> Self {
        let kind = ErrorKind::from_code(code).unwrap_or(ErrorKind::InternalServerError);
        Self::make(kind, message, None, None, None)
    }

    /// Shorthand for a validation failure on a single field
    #[must_use]
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(ErrorKind::ValidationError)
            .with_details(vec![
                ErrorDetail::new()
                    .with("field", field)
                    .with("reason", message.clone()),
            ])
            .with_message(message)
    }

    /// Shorthand for a configuration failure
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ConfigurationError).with_message(message)
    }

    /// Replaces the message
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Replaces the status code
    #[must_use]
    pub const fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    /// Replaces the detail records
    #[must_use]
    pub fn with_details(mut self, details: Vec<ErrorDetail>) -> Self {
        self.details = details;
        self
    }

    /// Sets the correlation id
    #[must_use]
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    /// Error kind
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Human-readable message
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// HTTP status code
    #[must_use]
    pub const fn status(&self) -> u16 {
        self.status
    }

    /// Structured detail records, in order
    #[must_use]
    pub fn details(&self) -> &[ErrorDetail] {
        &self.details
    }

    /// Correlation id returned by the service, if any
    #[must_use]
    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    /// When the error was constructed
    #[must_use]
    pub const fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Whether a retry could succeed
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }

    /// Converts the error into a plain record for logging or transport
    #[must_use]
    pub fn to_record(&self) -> ErrorRecord {
        let timestamp = self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true);
        let mut trace = format!("{self} at {timestamp}");
        if let Some(id) = &self.request_id {
            trace.push_str(&format!(" [request {id}]"));
        }
        ErrorRecord {
            kind: self.kind,
            message: self.message.clone(),
            status: self.status,
            details: self.details.clone(),
            request_id: self.request_id.clone(),
            timestamp,
            trace,
        }
    }
}

impl From<ErrorKind> for KbError {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

/// Serializable snapshot of a [`KbError`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorRecord {
    /// Error kind, serialized as its wire code
    pub kind: ErrorKind,
    /// Human-readable message
    pub message: String,
    /// HTTP status code
    pub status: u16,
    /// Structured detail records
    pub details: Vec<ErrorDetail>,
    /// Correlation id, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    /// RFC 3339 timestamp of construction
    pub timestamp: String,
    /// One-line trace marker
    pub trace: String,
}

/// Maps a serde deserialization error to a `KbError` with a body snippet
#[must_use]
pub fn map_deser(e: &serde_json::Error, body: &[u8]) -> KbError {
    let snippet = String::from_utf8_lossy(&body[..body.len().min(400)]).to_string();
    KbError::new(ErrorKind::InternalServerError)
        .with_message(format!("Failed to decode response: {e}: {snippet}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults_match_table_for_every_kind() {
        for kind in ErrorKind::ALL {
            let err = KbError::new(kind);
            let record = err.to_record();
            assert_eq!(record.kind, kind);
            assert_eq!(record.message, kind.default_message());
            assert_eq!(record.status, kind.default_status());
            assert!(record.details.is_empty());
            assert!(record.request_id.is_none());
        }
    }

    #[test]
    fn codes_are_unique_and_round_trip() {
        let mut seen = std::collections::HashSet::new();
        for kind in ErrorKind::ALL {
            assert!(seen.insert(kind.code()), "duplicate code {}", kind.code());
            assert_eq!(ErrorKind::from_code(kind.code()), Some(kind));
        }
        assert_eq!(ErrorKind::from_code("NOPE"), None);
    }

    #[test]
    fn kind_serializes_as_code() {
        for kind in ErrorKind::ALL {
            assert_eq!(serde_json::to_value(kind).unwrap(), json!(kind.code()));
        }
    }

    #[test]
    fn unknown_code_falls_back_to_500() {
        let err = KbError::from_code("SOMETHING_NEW", None);
        assert_eq!(err.kind(), ErrorKind::InternalServerError);
        assert_eq!(err.status(), 500);
    }

    #[test]
    fn make_overrides_defaults() {
        let err = KbError::make(
            ErrorKind::RateLimitExceeded,
            Some("slow down".into()),
            Some(420),
            Some(json!({"retryAfter": 3})),
            Some("req_1".into()),
        );
        assert_eq!(err.message(), "slow down");
        assert_eq!(err.status(), 420);
        assert_eq!(err.details().len(), 1);
        assert_eq!(err.details()[0].get("retryAfter"), Some(&json!(3)));
        assert_eq!(err.request_id(), Some("req_1"));
    }

    #[test]
    fn details_normalization() {
        assert!(ErrorDetail::normalize(Value::Null).is_empty());

        let one = ErrorDetail::normalize(json!({"field": "query"}));
        assert_eq!(one.len(), 1);
        assert_eq!(one[0].get("field"), Some(&json!("query")));

        let many = ErrorDetail::normalize(json!([{"a": 1}, {"b": 2}, "loose"]));
        assert_eq!(many.len(), 3);
        assert_eq!(many[1].get("b"), Some(&json!(2)));
        assert_eq!(many[2].get("value"), Some(&json!("loose")));
    }

    #[test]
    fn record_serializes_camel_case() {
        let err = KbError::new(ErrorKind::NetworkError).with_request_id("abc");
        let v = serde_json::to_value(err.to_record()).unwrap();
        assert_eq!(v["kind"], "NETWORK_ERROR");
        assert_eq!(v["status"], 503);
        assert_eq!(v["requestId"], "abc");
        assert!(v["trace"].as_str().unwrap().contains("NETWORK_ERROR"));
        assert!(v["trace"].as_str().unwrap().contains("request abc"));
    }

    #[test]
    fn display_includes_code_status_and_message() {
        let err = KbError::new(ErrorKind::InvalidApiKey);
        assert_eq!(err.to_string(), "INVALID_API_KEY (401): Invalid API key provided");
    }

    #[test]
    fn validation_helper_attaches_field_detail() {
        let err = KbError::validation("topK", "topK must be between 1 and 100");
        assert_eq!(err.kind(), ErrorKind::ValidationError);
        assert_eq!(err.status(), 400);
        assert_eq!(err.details()[0].get("field"), Some(&json!("topK")));
    }

    #[test]
    fn only_caller_fixable_kinds_are_not_retryable() {
        let fatal: Vec<_> = ErrorKind::ALL
            .into_iter()
            .filter(|k| !k.is_retryable())
            .collect();
        assert_eq!(
            fatal,
            vec![
                ErrorKind::InvalidApiKey,
                ErrorKind::InsufficientPermissions,
                ErrorKind::KnowledgeBaseNotFound,
                ErrorKind::ValidationError,
            ]
        );
    }
}
