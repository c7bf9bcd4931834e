//! Shared test helpers: scripted judge/generation provider and knowledge store.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use stratadesk_core::error::{ProviderError, RetrievalError};
use stratadesk_core::knowledge::{KnowledgeStore, RawPassage, RetrievalQuery};
use stratadesk_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};

/// A provider that returns scripted results in order and records every request.
///
/// Panics if more calls are made than results provided.
pub struct ScriptedProvider {
    results: Mutex<Vec<Result<ProviderResponse, ProviderError>>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    pub fn new(mut results: Vec<Result<ProviderResponse, ProviderError>>) -> Self {
        results.reverse();
        Self {
            results: Mutex::new(results),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Successful text responses, in call order.
    pub fn texts(texts: &[&str]) -> Self {
        Self::new(texts.iter().map(|t| Ok(Self::response(t))).collect())
    }

    pub fn response(text: &str) -> ProviderResponse {
        ProviderResponse {
            text: text.into(),
            usage: Some(Usage {
                prompt_tokens: 10,
                completion_tokens: 5,
                total_tokens: 15,
            }),
            model: "mock-model".into(),
            stop_reason: Some("end_turn".into()),
        }
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let call = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(request);
            requests.len()
        };
        self.results
            .lock()
            .unwrap()
            .pop()
            .unwrap_or_else(|| panic!("ScriptedProvider: no result scripted for call #{call}"))
    }
}

/// A store that answers per store id and logs which ids were queried.
pub struct ScriptedStore {
    results: HashMap<String, Result<Vec<RawPassage>, RetrievalError>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl ScriptedStore {
    pub fn new() -> Self {
        Self {
            results: HashMap::new(),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with(mut self, store_id: &str, passages: Vec<RawPassage>) -> Self {
        self.results.insert(store_id.into(), Ok(passages));
        self
    }

    pub fn failing(mut self, store_id: &str, error: RetrievalError) -> Self {
        self.results.insert(store_id.into(), Err(error));
        self
    }

    /// Store ids queried so far.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Shared handle to the call log, usable after the store is moved.
    pub fn call_log(&self) -> Arc<Mutex<Vec<String>>> {
        self.calls.clone()
    }
}

#[async_trait::async_trait]
impl KnowledgeStore for ScriptedStore {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn retrieve(&self, query: &RetrievalQuery) -> Result<Vec<RawPassage>, RetrievalError> {
        self.calls.lock().unwrap().push(query.store_id.clone());
        match self.results.get(&query.store_id) {
            Some(Ok(passages)) => Ok(passages.iter().take(query.result_count).cloned().collect()),
            Some(Err(e)) => Err(e.clone()),
            None => Err(RetrievalError::StoreNotFound(query.store_id.clone())),
        }
    }
}
