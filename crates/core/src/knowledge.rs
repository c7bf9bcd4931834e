//! KnowledgeStore trait: the retrieval service.
//!
//! A knowledge store answers "give me the `k` passages most relevant to this
//! text" for a store identifier. Scores are whatever the backend produces and
//! are not guaranteed to be comparable between stores.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::RetrievalError;

/// A retrieval request against one store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrievalQuery {
    /// Backend identifier of the store (e.g., a Bedrock knowledge base ID)
    pub store_id: String,

    /// The query text
    pub text: String,

    /// How many passages to return at most
    pub result_count: usize,
}

impl RetrievalQuery {
    pub fn new(store_id: impl Into<String>, text: impl Into<String>, result_count: usize) -> Self {
        Self {
            store_id: store_id.into(),
            text: text.into(),
            result_count,
        }
    }
}

/// A passage as returned by the backend, before labelling and ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPassage {
    /// Passage text
    pub text: String,

    /// Relevance score, if the backend reported one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,

    /// Where the passage came from (document URI etc.), if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl RawPassage {
    pub fn new(text: impl Into<String>, score: Option<f32>) -> Self {
        Self {
            text: text.into(),
            score,
            location: None,
        }
    }
}

/// The retrieval service.
#[async_trait]
pub trait KnowledgeStore: Send + Sync {
    /// A human-readable backend name (e.g., "bedrock_kb", "in_memory").
    fn name(&self) -> &str;

    /// Return up to `query.result_count` passages, best first.
    async fn retrieve(&self, query: &RetrievalQuery) -> Result<Vec<RawPassage>, RetrievalError>;
}
