//! Bedrock Knowledge Bases `Retrieve` client.
//!
//! `POST /knowledgebases/{knowledgeBaseId}/retrieve` on
//! `bedrock-agent-runtime.{region}.amazonaws.com`. Vector search only; the
//! store decides the score scale.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use stratadesk_core::error::RetrievalError;
use stratadesk_core::knowledge::{KnowledgeStore, RawPassage, RetrievalQuery};
use stratadesk_providers::aws::{AwsAuth, uri_encode};
use tracing::{debug, warn};

/// Agent runtime endpoint for a region.
pub fn agent_runtime_endpoint(region: &str) -> String {
    format!("https://bedrock-agent-runtime.{region}.amazonaws.com")
}

pub struct BedrockKnowledgeBase {
    region: String,
    base_url: String,
    auth: AwsAuth,
    client: reqwest::Client,
}

impl BedrockKnowledgeBase {
    pub fn new(region: impl Into<String>, auth: AwsAuth) -> Self {
        let region = region.into();
        Self {
            base_url: agent_runtime_endpoint(&region),
            region,
            auth,
            client: reqwest::Client::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn retrieve_url(&self, store_id: &str) -> String {
        format!(
            "{}/knowledgebases/{}/retrieve",
            self.base_url,
            uri_encode(store_id)
        )
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RetrieveRequest<'a> {
    retrieval_query: QueryText<'a>,
    retrieval_configuration: RetrievalConfiguration,
}

#[derive(Debug, Serialize)]
struct QueryText<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RetrievalConfiguration {
    vector_search_configuration: VectorSearchConfiguration,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VectorSearchConfiguration {
    number_of_results: usize,
}

impl<'a> RetrieveRequest<'a> {
    fn new(text: &'a str, number_of_results: usize) -> Self {
        Self {
            retrieval_query: QueryText { text },
            retrieval_configuration: RetrievalConfiguration {
                vector_search_configuration: VectorSearchConfiguration { number_of_results },
            },
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RetrieveResponse {
    #[serde(default)]
    retrieval_results: Vec<RetrievalResult>,
}

#[derive(Debug, Deserialize)]
struct RetrievalResult {
    content: ResultContent,
    #[serde(default)]
    score: Option<f32>,
    #[serde(default)]
    location: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ResultContent {
    #[serde(default)]
    text: String,
}

/// Best-effort human-readable location: the first URI/URL found, else the type.
fn describe_location(location: &serde_json::Value) -> Option<String> {
    let object = location.as_object()?;
    for (key, value) in object {
        if key == "type" {
            continue;
        }
        if let Some(inner) = value.as_object() {
            for field in ["uri", "url"] {
                if let Some(s) = inner.get(field).and_then(|v| v.as_str()) {
                    return Some(s.to_string());
                }
            }
        }
    }
    object
        .get("type")
        .and_then(|v| v.as_str())
        .map(str::to_string)
}

impl RetrieveResponse {
    fn into_passages(self) -> Vec<RawPassage> {
        self.retrieval_results
            .into_iter()
            .map(|r| RawPassage {
                text: r.content.text,
                score: r.score,
                location: r.location.as_ref().and_then(describe_location),
            })
            .collect()
    }
}

#[async_trait]
impl KnowledgeStore for BedrockKnowledgeBase {
    fn name(&self) -> &str {
        "bedrock_kb"
    }

    async fn retrieve(&self, query: &RetrievalQuery) -> Result<Vec<RawPassage>, RetrievalError> {
        if query.store_id.is_empty() {
            return Err(RetrievalError::NotConfigured(
                "knowledge base id is empty".into(),
            ));
        }

        let url = reqwest::Url::parse(&self.retrieve_url(&query.store_id)).map_err(|e| {
            RetrievalError::NotConfigured(format!("invalid knowledge base endpoint: {e}"))
        })?;
        let payload = serde_json::to_vec(&RetrieveRequest::new(&query.text, query.result_count))
            .map_err(|e| RetrievalError::InvalidResponse(format!("failed to encode request: {e}")))?;

        debug!(
            store = %query.store_id,
            results = query.result_count,
            auth = self.auth.scheme(),
            "Sending retrieve request"
        );

        let builder = self
            .client
            .post(url.clone())
            .header("Content-Type", "application/json")
            .header("Accept", "application/json");
        let builder = self.auth.authorize(builder, &url, &payload, &self.region);

        let response = builder
            .body(payload)
            .send()
            .await
            .map_err(|e| RetrievalError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        if status != 200 {
            let body = response.text().await.unwrap_or_default();
            warn!(status, store = %query.store_id, body = %body, "Retrieve error");
            return Err(match status {
                401 | 403 => RetrievalError::AuthenticationFailed(body),
                404 => RetrievalError::StoreNotFound(query.store_id.clone()),
                _ => RetrievalError::ApiError {
                    status_code: status,
                    message: body,
                },
            });
        }

        let parsed: RetrieveResponse = response.json().await.map_err(|e| {
            RetrievalError::InvalidResponse(format!("Failed to parse retrieve response: {e}"))
        })?;

        Ok(parsed.into_passages())
    }
}
