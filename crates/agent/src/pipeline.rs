//! The per-query drafting pipeline.
//!
//! `Received → Judged → (Retrieving → Assembled | Skipped) → Prompted → Generated`
//!
//! Every collaborator failure has a local recovery value: the judge fails
//! closed, a failing source contributes nothing, and a failed generation is
//! reported as [`DraftResponse::Failed`]. `draft` itself never errors.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use stratadesk_config::{AppConfig, GenerationConfig};
use stratadesk_core::error::Error;
use stratadesk_core::knowledge::KnowledgeStore;
use stratadesk_core::message::History;
use stratadesk_core::provider::{Provider, ProviderRequest, Usage};
use tracing::{debug, info, warn};

use crate::context::{AssembledContext, ContextAssembler, ScoreNormalizer, counter_from_name};
use crate::judge::{JudgeGate, JudgeOutcome};
use crate::prompt::{PromptBuilder, PromptDocument};
use crate::retrieval::{FanoutResult, KnowledgeSource, RetrievalFanout};

/// Prefix that marks a failed draft so it cannot pass for model output.
pub const UNAVAILABLE_PREFIX: &str = "[draft unavailable]";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stage {
    Received,
    Judged,
    Retrieving,
    Assembled,
    Skipped,
    Prompted,
    Generated,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DraftResponse {
    Generated(String),
    Failed { message: String },
}

impl DraftResponse {
    pub fn is_generated(&self) -> bool {
        matches!(self, Self::Generated(_))
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Generated(text) => Some(text),
            Self::Failed { .. } => None,
        }
    }
}

impl fmt::Display for DraftResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Generated(text) => f.write_str(text),
            Self::Failed { message } => write!(f, "{UNAVAILABLE_PREFIX} {message}"),
        }
    }
}

/// Everything that happened while drafting one reply.
#[derive(Debug, Clone)]
pub struct DraftOutcome {
    pub stages: Vec<Stage>,
    pub judge: JudgeOutcome,
    /// Present only when the judge asked for retrieval.
    pub retrieval: Option<FanoutResult>,
    pub context: AssembledContext,
    pub prompt: PromptDocument,
    pub response: DraftResponse,
    pub usage: Option<Usage>,
    /// Wall time of the generation call.
    pub generation_time: Duration,
}

pub struct DraftPipeline {
    judge: JudgeGate,
    fanout: RetrievalFanout,
    assembler: ContextAssembler,
    prompts: PromptBuilder,
    generator: Arc<dyn Provider>,
    generation: GenerationConfig,
    history_turns: usize,
}

impl DraftPipeline {
    pub fn new(
        judge: JudgeGate,
        fanout: RetrievalFanout,
        assembler: ContextAssembler,
        generator: Arc<dyn Provider>,
        generation: GenerationConfig,
    ) -> Self {
        Self {
            judge,
            fanout,
            assembler,
            prompts: PromptBuilder::new(),
            generator,
            generation,
            history_turns: 6,
        }
    }

    pub fn with_prompt_builder(mut self, prompts: PromptBuilder) -> Self {
        self.prompts = prompts;
        self
    }

    /// How many recent turns the judge and the drafter see.
    pub fn with_history_turns(mut self, turns: usize) -> Self {
        self.history_turns = turns;
        self
    }

    /// Wire a pipeline from configuration. The same provider serves as judge
    /// and generator; only the models and sampling differ.
    pub fn from_config(
        config: &AppConfig,
        provider: Arc<dyn Provider>,
        store: Arc<dyn KnowledgeStore>,
    ) -> Result<Self, Error> {
        let counter = counter_from_name(&config.retrieval.token_counter)?;
        let normalizer = ScoreNormalizer::from_name(&config.retrieval.score_normalization)
            .ok_or_else(|| Error::Config {
                message: format!(
                    "unknown score normalization '{}' (expected none or min_max)",
                    config.retrieval.score_normalization
                ),
            })?;

        let judge = JudgeGate::from_config(provider.clone(), &config.judge);
        let sources = config
            .retrieval
            .sources
            .iter()
            .map(KnowledgeSource::from)
            .collect();
        let fanout =
            RetrievalFanout::new(store, sources).with_concurrency(config.retrieval.concurrent);
        let assembler =
            ContextAssembler::with_boxed_counter(config.retrieval.context_token_limit, counter)
                .with_normalizer(normalizer);
        let prompts = match &config.prompt.policy_override {
            Some(policy) => PromptBuilder::with_policy(policy),
            None => PromptBuilder::new(),
        };

        Ok(
            Self::new(judge, fanout, assembler, provider, config.generation.clone())
                .with_prompt_builder(prompts)
                .with_history_turns(config.prompt.history_turns),
        )
    }

    pub fn judge(&self) -> &JudgeGate {
        &self.judge
    }

    pub fn fanout(&self) -> &RetrievalFanout {
        &self.fanout
    }

    pub fn assembler(&self) -> &ContextAssembler {
        &self.assembler
    }

    pub fn history_turns(&self) -> usize {
        self.history_turns
    }

    /// Draft a reply to `query`. `history` holds the turns before the query.
    pub async fn draft(&self, history: &History, query: &str) -> DraftOutcome {
        let mut stages = vec![Stage::Received];
        let history_window = history.format_window(self.history_turns);
        info!(turns = history.len(), "Drafting reply");

        let judge = self.judge.judge(&history_window, query).await;
        stages.push(Stage::Judged);

        let (retrieval, context) = if judge.needs_retrieval() {
            stages.push(Stage::Retrieving);
            let fanout = self.fanout.retrieve_all(query).await;
            let context = self.assembler.assemble(fanout.passages.clone());
            stages.push(Stage::Assembled);
            info!(
                included = context.included.len(),
                dropped = context.dropped.len(),
                tokens = context.total_tokens,
                budget = context.budget,
                "Context assembled"
            );
            (Some(fanout), context)
        } else {
            stages.push(Stage::Skipped);
            info!("Retrieval skipped");
            (
                None,
                AssembledContext {
                    budget: self.assembler.budget(),
                    ..AssembledContext::default()
                },
            )
        };

        let prompt = self.prompts.build(&history_window, &context.blob, query);
        stages.push(Stage::Prompted);
        debug!(
            chars = prompt.char_count(),
            history = prompt.has_history,
            context = prompt.has_context,
            "Prompt built"
        );

        let request = ProviderRequest::new(
            &self.generation.model,
            prompt.text.clone(),
            self.generation.max_tokens,
        )
        .with_temperature(self.generation.temperature)
        .with_top_p(self.generation.top_p);

        let started = Instant::now();
        let result = self.generator.complete(request).await;
        let generation_time = started.elapsed();

        let (response, usage) = match result {
            Ok(response) => {
                stages.push(Stage::Generated);
                info!(
                    model = %response.model,
                    chars = response.text.len(),
                    ms = generation_time.as_millis() as u64,
                    "Draft generated"
                );
                (DraftResponse::Generated(response.text), response.usage)
            }
            Err(e) => {
                warn!(model = %self.generation.model, error = %e, "Draft generation failed");
                (
                    DraftResponse::Failed {
                        message: e.to_string(),
                    },
                    None,
                )
            }
        };

        DraftOutcome {
            stages,
            judge,
            retrieval,
            context,
            prompt,
            response,
            usage,
            generation_time,
        }
    }
}
