use crate::{
    client::Client,
    config::Config,
    error::{ErrorKind, KbError},
    types::common::Envelope,
    types::knowledge_base::{GetKnowledgeBaseResponse, ListKnowledgeBasesResponse, ListParams},
    types::query::{MAX_QUERY_CHARS, MAX_TOP_K, MIN_TOP_K, QueryRequest, QueryResponse},
};

const BASE_PATH: &str = "/api/v1/knowledge-base";
const MAX_PAGE_SIZE: u32 = 100;

fn validate_knowledge_base_id(id: &str) -> Result<&str, KbError> {
    let id = id.trim();
    if id.is_empty() {
        return Err(KbError::validation(
            "knowledgeBaseId",
            "Knowledge base ID is required",
        ));
    }
    Ok(id)
}

/// Validate a query request
///
/// Trims the query text in place and checks length and `top_k` bounds.
fn validate_query_request(req: &mut QueryRequest) -> Result<(), KbError> {
    let trimmed = req.query.trim();
    if trimmed.is_empty() {
        return Err(KbError::validation("query", "Query text is required"));
    }

    let len = trimmed.chars().count();
    if len > MAX_QUERY_CHARS {
        return Err(KbError::validation(
            "query",
            format!("Query must be at most {MAX_QUERY_CHARS} characters, got {len}"),
        ));
    }
    if trimmed.len() != req.query.len() {
        req.query = trimmed.to_string();
    }

    if let Some(k) = req.top_k
        && !(MIN_TOP_K..=MAX_TOP_K).contains(&k)
    {
        return Err(KbError::validation(
            "topK",
            format!("topK must be between {MIN_TOP_K} and {MAX_TOP_K}, got {k}"),
        ));
    }

    Ok(())
}

fn validate_list_params(params: &ListParams) -> Result<(), KbError> {
    if let Some(page) = params.page
        && page < 1
    {
        return Err(KbError::validation("page", "page must be >= 1"));
    }
    if let Some(limit) = params.limit
        && !(1..=MAX_PAGE_SIZE).contains(&limit)
    {
        return Err(KbError::validation(
            "limit",
            format!("limit must be between 1 and {MAX_PAGE_SIZE}, got {limit}"),
        ));
    }
    Ok(())
}

/// Rejects a 2xx body whose envelope reports `success: false`
fn ensure_success<R: Envelope>(resp: R) -> Result<R, KbError> {
    if resp.success() {
        return Ok(resp);
    }
    let mut err = KbError::new(ErrorKind::ServiceUnavailable);
    if let Some(message) = resp.message().filter(|m| !m.trim().is_empty()) {
        err = err.with_message(message);
    }
    if let Some(id) = resp.meta().and_then(|m| m.request_id.as_deref()) {
        err = err.with_request_id(id);
    }
    Err(err)
}

/// API resource for the `/api/v1/knowledge-base` endpoints
///
/// Inputs are validated here, before any request is sent, so invalid input
/// never costs a network round trip or a retry.
pub struct KnowledgeBases<'c, C: Config> {
    client: &'c Client<C>,
}

impl<'c, C: Config> KnowledgeBases<'c, C> {
    /// Creates a new `KnowledgeBases` resource
    #[must_use]
    pub const fn new(client: &'c Client<C>) -> Self {
        Self { client }
    }

    /// Lists knowledge bases visible to the API key
    ///
    /// # Errors
    ///
    /// Returns a `ValidationError` for out-of-range paging parameters, or the
    /// classified error if the request fails. A body reporting
    /// `success: false` yields `ServiceUnavailable`.
    pub async fn list(&self, params: &ListParams) -> Result<ListKnowledgeBasesResponse, KbError> {
        validate_list_params(params)?;
        let resp = self.client.get_with_query(BASE_PATH, params).await?;
        ensure_success(resp)
    }

    /// Fetches a single knowledge base
    ///
    /// # Errors
    ///
    /// Same as [`KnowledgeBases::list`]; a blank id is a `ValidationError`.
    pub async fn get(&self, id: &str) -> Result<GetKnowledgeBaseResponse, KbError> {
        let id = urlencoding::encode(validate_knowledge_base_id(id)?);
        let resp = self.client.get(&format!("{BASE_PATH}/{id}")).await?;
        ensure_success(resp)
    }

    /// Runs a retrieval query against a knowledge base
    ///
    /// # Errors
    ///
    /// Returns a `ValidationError` for a blank id, blank or overlong query
    /// text, or a `top_k` outside `[1, 100]`, without contacting the service.
    /// Otherwise behaves like [`KnowledgeBases::list`].
    pub async fn query(&self, id: &str, mut req: QueryRequest) -> Result<QueryResponse, KbError> {
        let id = urlencoding::encode(validate_knowledge_base_id(id)?);
        validate_query_request(&mut req)?;
        let resp = self
            .client
            .post(&format!("{BASE_PATH}/{id}/query"), &req)
            .await?;
        ensure_success(resp)
    }
}

impl<C: Config> crate::Client<C> {
    /// Returns the knowledge-base API resource
    #[must_use]
    pub const fn knowledge_bases(&self) -> KnowledgeBases<'_, C> {
        KnowledgeBases::new(self)
    }
}
