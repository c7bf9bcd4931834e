//! In-memory knowledge store for testing and offline demos.
//!
//! Passages are grouped by store id. Relevance is the fraction of distinct
//! query terms that appear in the passage, so scores are in `0.0..=1.0`.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use stratadesk_core::error::RetrievalError;
use stratadesk_core::knowledge::{KnowledgeStore, RawPassage, RetrievalQuery};
use tokio::sync::RwLock;

pub struct InMemoryStore {
    stores: Arc<RwLock<HashMap<String, Vec<String>>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::from_passages(HashMap::new())
    }

    /// Build from pre-grouped passages (store id → texts in insertion order).
    pub fn from_passages(stores: HashMap<String, Vec<String>>) -> Self {
        Self {
            stores: Arc::new(RwLock::new(stores)),
        }
    }

    /// Add a passage to a store, creating the store if needed.
    pub async fn add(&self, store_id: impl Into<String>, text: impl Into<String>) {
        self.stores
            .write()
            .await
            .entry(store_id.into())
            .or_default()
            .push(text.into());
    }

    /// Number of passages across all stores.
    pub async fn len(&self) -> usize {
        self.stores.read().await.values().map(Vec::len).sum()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Store ids, sorted.
    pub async fn store_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.stores.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn terms(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.len() > 1)
        .map(str::to_lowercase)
        .collect()
}

/// Fraction of distinct query terms present in `passage`.
fn overlap_score(query_terms: &HashSet<String>, passage: &str) -> f32 {
    if query_terms.is_empty() {
        return 0.0;
    }
    let passage_terms = terms(passage);
    let hits = query_terms
        .iter()
        .filter(|t| passage_terms.contains(*t))
        .count();
    hits as f32 / query_terms.len() as f32
}

#[async_trait]
impl KnowledgeStore for InMemoryStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn retrieve(&self, query: &RetrievalQuery) -> Result<Vec<RawPassage>, RetrievalError> {
        if query.store_id.is_empty() {
            return Err(RetrievalError::NotConfigured("store id is empty".into()));
        }

        let stores = self.stores.read().await;
        let passages = stores
            .get(&query.store_id)
            .ok_or_else(|| RetrievalError::StoreNotFound(query.store_id.clone()))?;

        let query_terms = terms(&query.text);
        let mut results: Vec<RawPassage> = passages
            .iter()
            .map(|text| RawPassage::new(text.clone(), Some(overlap_score(&query_terms, text))))
            .filter(|p| p.score.unwrap_or(0.0) > 0.0)
            .collect();

        // Stable: equal scores keep insertion order.
        results.sort_by(|a, b| {
            b.score
                .unwrap_or(0.0)
                .total_cmp(&a.score.unwrap_or(0.0))
        });
        results.truncate(query.result_count);

        Ok(results)
    }
}
