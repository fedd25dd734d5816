//! Agent-tool adapter for knowledge-base queries.
//!
//! [`Client::knowledge_base_tool`] turns one knowledge base into a
//! schema-described callable that agent frameworks can register. Rendering
//! for OpenAI function calling and Anthropic tool use is provided.

use futures::future::BoxFuture;
use schemars::{JsonSchema, Schema};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::{
    client::Client,
    config::Config,
    error::{ErrorKind, KbError},
    types::query::{QueryRequest, QueryResponse},
};

const MAX_TOOL_NAME_LEN: usize = 64;
const TOOL_NAME_PREFIX: &str = "search_";
const DEFAULT_TOOL_SLUG: &str = "knowledge_base";

/// Arguments accepted by a knowledge-base tool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct KnowledgeBaseToolInput {
    /// What to search the knowledge base for
    pub query: String,
    /// Number of results to return (1 to 100)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
}

/// A knowledge base exposed as an agent tool
#[derive(Debug, Clone)]
pub struct KnowledgeBaseTool<C: Config> {
    client: Client<C>,
    knowledge_base_id: String,
    name: String,
    description: String,
}

/// Lowercase ASCII slug; runs of other characters collapse to one `_`
fn slugify(raw: &str) -> String {
    let mut slug = String::new();
    for c in raw.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('_') {
            slug.push('_');
        }
    }
    let trimmed = slug.trim_end_matches('_').len();
    slug.truncate(trimmed);
    slug
}

/// Derives a provider-safe tool name: `search_` + lowercase ASCII slug
///
/// Falls back to the slugged `fallback`, then to a fixed name, when
/// `display_name` has no ASCII alphanumerics.
fn tool_name(display_name: &str, fallback: &str) -> String {
    let mut slug = slugify(display_name);
    if slug.is_empty() {
        slug = slugify(fallback);
    }
    if slug.is_empty() {
        slug = DEFAULT_TOOL_SLUG.to_string();
    }

    let mut name = format!("{TOOL_NAME_PREFIX}{slug}");
    // ASCII only, so any byte index is a char boundary
    name.truncate(MAX_TOOL_NAME_LEN);
    name
}

impl<C: Config + Clone + 'static> KnowledgeBaseTool<C> {
    /// Tool name, unique per knowledge base name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Tool description shown to the model
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Id of the backing knowledge base
    #[must_use]
    pub fn knowledge_base_id(&self) -> &str {
        &self.knowledge_base_id
    }

    /// JSON schema of [`KnowledgeBaseToolInput`]
    #[must_use]
    pub fn input_schema(&self) -> Schema {
        schemars::schema_for!(KnowledgeBaseToolInput)
    }

    /// Runs the query against the backing knowledge base
    ///
    /// # Errors
    ///
    /// Propagates validation and request errors from the query operation.
    pub async fn call(&self, input: KnowledgeBaseToolInput) -> Result<QueryResponse, KbError> {
        let mut req = QueryRequest::new(input.query).with_include_metadata(true);
        req.top_k = input.top_k;
        self.client
            .knowledge_bases()
            .query(&self.knowledge_base_id, req)
            .await
    }

    /// Decodes JSON arguments, runs the query, and encodes the response
    ///
    /// Arguments that do not match the input schema are rejected with a
    /// `ValidationError`.
    pub fn call_json(&self, args: Value) -> BoxFuture<'static, Result<Value, KbError>> {
        let tool = self.clone();
        Box::pin(async move {
            let input: KnowledgeBaseToolInput = serde_json::from_value(args).map_err(|e| {
                KbError::validation("arguments", format!("Invalid tool arguments: {e}"))
            })?;
            let resp = tool.call(input).await?;
            serde_json::to_value(resp).map_err(|e| {
                KbError::new(ErrorKind::InternalServerError)
                    .with_message(format!("Failed to encode tool output: {e}"))
            })
        })
    }

    /// Renders the tool as an OpenAI function definition
    #[must_use]
    pub fn to_openai_function(&self) -> Value {
        json!({
            "type": "function",
            "function": {
                "name": self.name,
                "description": self.description,
                "parameters": self.input_schema()
            }
        })
    }

    /// Renders the tool as an Anthropic tool definition
    #[must_use]
    pub fn to_anthropic_tool(&self) -> Value {
        json!({
            "name": self.name,
            "description": self.description,
            "input_schema": self.input_schema()
        })
    }
}

impl<C: Config + Clone> Client<C> {
    /// Creates an agent tool that queries the knowledge base `id`
    ///
    /// `name` feeds the tool name; an empty `description` falls back to a
    /// generic one mentioning `name`.
    #[must_use]
    pub fn knowledge_base_tool(
        &self,
        id: impl Into<String>,
        name: &str,
        description: &str,
    ) -> KnowledgeBaseTool<C> {
        let knowledge_base_id = id.into();
        let description = if description.trim().is_empty() {
            format!("Search the '{name}' knowledge base for relevant information.")
        } else {
            description.trim().to_string()
        };
        KnowledgeBaseTool {
            client: self.clone(),
            name: tool_name(name, &knowledge_base_id),
            knowledge_base_id,
            description,
        }
    }
}
