//! Context assembly: rank retrieved passages and fit them into a budget.
//!
//! # Algorithm
//!
//! 1. Merge passages in fan-out order
//! 2. Apply the configured [`ScoreNormalizer`]
//! 3. Stable-sort by relevance, highest first (ties keep fan-out order)
//! 4. Accept passages greedily until the next one would exceed the budget;
//!    that passage and everything after it are dropped, never truncated
//! 5. Join accepted texts with [`SEPARATOR`]
//!
//! # Determinism
//!
//! Identical inputs always produce identical outputs. No random or
//! time-dependent logic is used during assembly.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::context::normalize::ScoreNormalizer;
use crate::context::token::{TokenCounter, WhitespaceTokenCounter};
use crate::retrieval::RetrievedPassage;

/// Placed between passages in the context blob.
pub const SEPARATOR: &str = "\n\n---\n\n";

/// Default budget, in counter units.
pub const DEFAULT_CONTEXT_TOKEN_LIMIT: usize = 2000;

/// Bookkeeping for one passage considered during assembly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextEntry {
    pub source_label: String,
    pub relevance_score: f32,
    pub tokens: usize,
}

/// The bounded context handed to the prompt builder.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssembledContext {
    /// Accepted passages, in accepted order.
    pub included: Vec<ContextEntry>,
    /// Passages rejected for budget, in ranked order.
    pub dropped: Vec<ContextEntry>,
    /// Accepted texts joined with [`SEPARATOR`]; empty when nothing was accepted.
    pub blob: String,
    pub total_tokens: usize,
    pub budget: usize,
}

impl AssembledContext {
    pub fn is_empty(&self) -> bool {
        self.included.is_empty()
    }

    pub fn labels(&self) -> Vec<&str> {
        self.included.iter().map(|e| e.source_label.as_str()).collect()
    }

    /// Budget utilisation, 0.0–100.0.
    pub fn utilization_pct(&self) -> f32 {
        if self.budget == 0 {
            return 0.0;
        }
        self.total_tokens as f32 / self.budget as f32 * 100.0
    }
}

/// The context assembler. Stateless across calls; create one and reuse it.
pub struct ContextAssembler {
    budget: usize,
    counter: Box<dyn TokenCounter>,
    normalizer: ScoreNormalizer,
}

impl ContextAssembler {
    pub fn new(budget: usize, counter: impl TokenCounter + 'static) -> Self {
        Self::with_boxed_counter(budget, Box::new(counter))
    }

    pub fn with_boxed_counter(budget: usize, counter: Box<dyn TokenCounter>) -> Self {
        Self {
            budget,
            counter,
            normalizer: ScoreNormalizer::None,
        }
    }

    pub fn with_normalizer(mut self, normalizer: ScoreNormalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    pub fn budget(&self) -> usize {
        self.budget
    }

    pub fn counter_name(&self) -> &str {
        self.counter.name()
    }

    pub fn normalizer(&self) -> ScoreNormalizer {
        self.normalizer
    }

    pub fn assemble(&self, mut passages: Vec<RetrievedPassage>) -> AssembledContext {
        self.normalizer.apply(&mut passages);

        // `sort_by` is stable, so equal scores keep fan-out order. Scores are
        // finite here; `partial_cmp` keeps -0.0 and 0.0 equal.
        passages.sort_by(|a, b| {
            b.relevance_score
                .partial_cmp(&a.relevance_score)
                .unwrap_or(Ordering::Equal)
        });

        let mut context = AssembledContext {
            budget: self.budget,
            ..AssembledContext::default()
        };
        let mut texts: Vec<String> = Vec::new();
        let mut over_budget = false;

        for passage in passages {
            let tokens = self.counter.count(&passage.text);
            let entry = ContextEntry {
                source_label: passage.source_label,
                relevance_score: passage.relevance_score,
                tokens,
            };

            let total = context
                .total_tokens
                .checked_add(tokens)
                .filter(|total| *total <= self.budget);
            if let (false, Some(total)) = (over_budget, total) {
                context.total_tokens = total;
                context.included.push(entry);
                texts.push(passage.text);
            } else {
                over_budget = true;
                context.dropped.push(entry);
            }
        }

        context.blob = texts.join(SEPARATOR);
        context
    }
}

impl Default for ContextAssembler {
    fn default() -> Self {
        Self::new(DEFAULT_CONTEXT_TOKEN_LIMIT, WhitespaceTokenCounter)
    }
}
