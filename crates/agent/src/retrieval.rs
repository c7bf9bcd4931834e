//! Retrieval fan-out: query every configured knowledge source.
//!
//! Each source pairs a store id with a provenance label and a result count.
//! Sources are independent: a failing source contributes no passages and is
//! recorded in its [`SourceReport`], never aborting the others.

use std::sync::Arc;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use stratadesk_config::SourceConfig;
use stratadesk_core::error::RetrievalError;
use stratadesk_core::knowledge::{KnowledgeStore, RetrievalQuery};
use tracing::{debug, info, warn};

/// One knowledge source in the fan-out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeSource {
    /// Provenance label, e.g. `Building_A`
    pub label: String,
    /// Backend store id; empty means the source is not provisioned
    pub store_id: String,
    /// How many passages to request
    pub top_k: usize,
}

impl KnowledgeSource {
    pub fn new(label: impl Into<String>, store_id: impl Into<String>, top_k: usize) -> Self {
        Self {
            label: label.into(),
            store_id: store_id.into(),
            top_k,
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.store_id.trim().is_empty()
    }
}

impl From<&SourceConfig> for KnowledgeSource {
    fn from(config: &SourceConfig) -> Self {
        Self::new(&config.label, &config.store_id, config.top_k)
    }
}

/// A labelled passage ready for ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedPassage {
    pub text: String,
    /// Source-defined scale; missing or non-finite scores are 0.0
    pub relevance_score: f32,
    /// `<source>_Chunk_<i>`, 1-based in store order
    pub source_label: String,
    /// The source label this passage came from
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

/// What happened to one source during a fan-out.
#[derive(Debug, Clone)]
pub enum SourceStatus {
    Retrieved { passages: usize },
    NotConfigured,
    Failed(RetrievalError),
}

#[derive(Debug, Clone)]
pub struct SourceReport {
    pub label: String,
    pub status: SourceStatus,
}

impl SourceReport {
    pub fn is_failure(&self) -> bool {
        matches!(self.status, SourceStatus::Failed(_))
    }
}

/// Passages from every source, in configured source order, plus per-source reports.
#[derive(Debug, Clone, Default)]
pub struct FanoutResult {
    pub passages: Vec<RetrievedPassage>,
    pub reports: Vec<SourceReport>,
}

pub struct RetrievalFanout {
    store: Arc<dyn KnowledgeStore>,
    sources: Vec<KnowledgeSource>,
    concurrent: bool,
}

impl RetrievalFanout {
    pub fn new(store: Arc<dyn KnowledgeStore>, sources: Vec<KnowledgeSource>) -> Self {
        Self {
            store,
            sources,
            concurrent: true,
        }
    }

    /// Query sources one after another instead of concurrently.
    pub fn sequential(mut self) -> Self {
        self.concurrent = false;
        self
    }

    pub fn with_concurrency(mut self, concurrent: bool) -> Self {
        self.concurrent = concurrent;
        self
    }

    pub fn sources(&self) -> &[KnowledgeSource] {
        &self.sources
    }

    /// Retrieve from a single source and label the passages.
    pub async fn retrieve(
        &self,
        source: &KnowledgeSource,
        query: &str,
    ) -> Result<Vec<RetrievedPassage>, RetrievalError> {
        if !source.is_configured() {
            return Err(RetrievalError::NotConfigured(format!(
                "source '{}' has no store id",
                source.label
            )));
        }

        debug!(source = %source.label, top_k = source.top_k, "Retrieving");
        let raw = self
            .store
            .retrieve(&RetrievalQuery::new(&source.store_id, query, source.top_k))
            .await?;

        Ok(raw
            .into_iter()
            .enumerate()
            .map(|(i, passage)| RetrievedPassage {
                text: passage.text,
                relevance_score: passage.score.filter(|s| s.is_finite()).unwrap_or(0.0),
                source_label: format!("{}_Chunk_{}", source.label, i + 1),
                source: source.label.clone(),
                location: passage.location,
            })
            .collect())
    }

    async fn retrieve_reported(
        &self,
        source: &KnowledgeSource,
        query: &str,
    ) -> (Vec<RetrievedPassage>, SourceReport) {
        let label = source.label.clone();
        match self.retrieve(source, query).await {
            Ok(passages) => {
                let report = SourceReport {
                    label,
                    status: SourceStatus::Retrieved {
                        passages: passages.len(),
                    },
                };
                (passages, report)
            }
            Err(RetrievalError::NotConfigured(_)) if !source.is_configured() => {
                debug!(source = %source.label, "Source not configured, skipping");
                (
                    Vec::new(),
                    SourceReport {
                        label,
                        status: SourceStatus::NotConfigured,
                    },
                )
            }
            Err(e) => {
                warn!(source = %source.label, error = %e, "Retrieval failed, continuing without this source");
                (
                    Vec::new(),
                    SourceReport {
                        label,
                        status: SourceStatus::Failed(e),
                    },
                )
            }
        }
    }

    /// Query every source. Output order follows the configured source order
    /// whether or not the calls run concurrently.
    pub async fn retrieve_all(&self, query: &str) -> FanoutResult {
        let outcomes = if self.concurrent {
            join_all(
                self.sources
                    .iter()
                    .map(|source| self.retrieve_reported(source, query)),
            )
            .await
        } else {
            let mut outcomes = Vec::with_capacity(self.sources.len());
            for source in &self.sources {
                outcomes.push(self.retrieve_reported(source, query).await);
            }
            outcomes
        };

        let mut result = FanoutResult::default();
        for (passages, report) in outcomes {
            result.passages.extend(passages);
            result.reports.push(report);
        }

        info!(
            sources = self.sources.len(),
            passages = result.passages.len(),
            failed = result.reports.iter().filter(|r| r.is_failure()).count(),
            "Retrieval complete"
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::ScriptedStore;
    use stratadesk_core::knowledge::RawPassage;

    fn two_sources() -> Vec<KnowledgeSource> {
        vec![
            KnowledgeSource::new("Building_A", "kb-a", 2),
            KnowledgeSource::new("Global", "kb-g", 1),
        ]
    }

    #[tokio::test]
    async fn labels_are_one_based_per_source() {
        let store = ScriptedStore::new()
            .with("kb-a", vec![RawPassage::new("a1", Some(0.9)), RawPassage::new("a2", Some(0.4))])
            .with("kb-g", vec![RawPassage::new("g1", Some(0.6))]);
        let fanout = RetrievalFanout::new(Arc::new(store), two_sources());

        let result = fanout.retrieve_all("parking").await;
        let labels: Vec<&str> = result.passages.iter().map(|p| p.source_label.as_str()).collect();
        assert_eq!(labels, vec!["Building_A_Chunk_1", "Building_A_Chunk_2", "Global_Chunk_1"]);
        assert_eq!(result.passages[2].source, "Global");
    }

    #[tokio::test]
    async fn missing_and_nan_scores_become_zero() {
        let store = ScriptedStore::new().with(
            "kb-a",
            vec![RawPassage::new("a1", None), RawPassage::new("a2", Some(f32::NAN))],
        );
        let fanout = RetrievalFanout::new(
            Arc::new(store),
            vec![KnowledgeSource::new("Building_A", "kb-a", 2)],
        );

        let passages = fanout
            .retrieve(&fanout.sources()[0].clone(), "q")
            .await
            .unwrap();
        assert!(passages.iter().all(|p| p.relevance_score == 0.0));
    }

    #[tokio::test]
    async fn failing_source_does_not_block_others() {
        let store = ScriptedStore::new()
            .failing("kb-a", RetrievalError::Network("connection reset".into()))
            .with("kb-g", vec![RawPassage::new("g1", Some(0.6))]);
        let fanout = RetrievalFanout::new(Arc::new(store), two_sources());

        let result = fanout.retrieve_all("parking").await;
        assert_eq!(result.passages.len(), 1);
        assert_eq!(result.passages[0].text, "g1");
        assert!(result.reports[0].is_failure());
        assert!(matches!(
            result.reports[1].status,
            SourceStatus::Retrieved { passages: 1 }
        ));
    }

    #[tokio::test]
    async fn unconfigured_source_is_not_called() {
        let store = Arc::new(ScriptedStore::new().with("kb-a", vec![RawPassage::new("a1", Some(0.5))]));
        let fanout = RetrievalFanout::new(
            store.clone(),
            vec![
                KnowledgeSource::new("Building_A", "kb-a", 2),
                KnowledgeSource::new("Global", "", 1),
            ],
        );

        let result = fanout.retrieve_all("q").await;
        assert_eq!(result.passages.len(), 1);
        assert!(matches!(result.reports[1].status, SourceStatus::NotConfigured));
        assert_eq!(store.calls(), vec!["kb-a".to_string()]);
    }

    #[tokio::test]
    async fn sequential_matches_concurrent() {
        let make = || {
            ScriptedStore::new()
                .with("kb-a", vec![RawPassage::new("a1", Some(0.9)), RawPassage::new("a2", Some(0.4))])
                .with("kb-g", vec![RawPassage::new("g1", Some(0.6))])
        };
        let concurrent = RetrievalFanout::new(Arc::new(make()), two_sources())
            .retrieve_all("q")
            .await;
        let sequential = RetrievalFanout::new(Arc::new(make()), two_sources())
            .sequential()
            .retrieve_all("q")
            .await;
        assert_eq!(concurrent.passages, sequential.passages);
    }

    #[tokio::test]
    async fn top_k_is_passed_to_the_store() {
        let store = Arc::new(ScriptedStore::new().with(
            "kb-a",
            vec![
                RawPassage::new("a1", Some(0.9)),
                RawPassage::new("a2", Some(0.8)),
                RawPassage::new("a3", Some(0.7)),
            ],
        ));
        let fanout = RetrievalFanout::new(
            store,
            vec![KnowledgeSource::new("Building_A", "kb-a", 2)],
        );
        let result = fanout.retrieve_all("q").await;
        assert_eq!(result.passages.len(), 2);
    }

    #[test]
    fn from_source_config() {
        let config = SourceConfig {
            label: "Global".into(),
            store_id: String::new(),
            top_k: 1,
        };
        let source = KnowledgeSource::from(&config);
        assert!(!source.is_configured());
        assert_eq!(source.top_k, 1);
    }
}
