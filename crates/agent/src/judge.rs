//! Judge gate: decide whether a query needs knowledge-base retrieval.
//!
//! A small, cheap model reads the recent transcript and the latest message
//! and answers `YES` or `NO`. Anything other than an exact `YES` (after
//! trimming and upper-casing), including a failed call, means "no retrieval":
//! the drafter then answers conversationally from history alone.

use std::sync::Arc;

use stratadesk_config::JudgeConfig;
use stratadesk_core::error::ProviderError;
use stratadesk_core::provider::{Provider, ProviderRequest};
use tracing::{debug, info, warn};

/// Outcome of one judge call.
#[derive(Debug, Clone)]
pub enum JudgeOutcome {
    /// The judge answered YES (or the gate is disabled).
    Retrieve,
    /// The judge answered something other than YES.
    Skip { answer: String },
    /// The judge could not be reached; treated as a skip.
    Unavailable { error: ProviderError },
}

impl JudgeOutcome {
    pub fn needs_retrieval(&self) -> bool {
        matches!(self, Self::Retrieve)
    }

    /// Short form for logs and CLI output.
    pub fn summary(&self) -> String {
        match self {
            Self::Retrieve => "YES".into(),
            Self::Skip { answer } if answer.is_empty() => "NO (empty answer)".into(),
            Self::Skip { answer } => format!("NO ({answer})"),
            Self::Unavailable { error } => format!("NO (judge unavailable: {error})"),
        }
    }
}

/// Exactly `YES` after trimming and upper-casing.
pub fn is_affirmative(answer: &str) -> bool {
    answer.trim().to_uppercase() == "YES"
}

/// The instruction sent to the judge model.
pub fn judge_prompt(history_window: &str, query: &str) -> String {
    format!(
        "Analyze the following user message in the context of an ongoing conversation between a client and a strata manager.\n\
         Determine if answering this message likely requires retrieving specific information from the building's bylaws, rules, FAQs, or other knowledge base documents.\n\
         Respond with only 'YES' or 'NO'.\n\
         \n\
         Conversation History (Last few turns):\n\
         {history_window}\n\
         \n\
         Latest User Message:\n\
         {query}\n\
         \n\
         Requires Knowledge Base Retrieval (YES/NO):\n"
    )
}

pub struct JudgeGate {
    provider: Arc<dyn Provider>,
    model: String,
    max_tokens: u32,
    temperature: f32,
    enabled: bool,
}

impl JudgeGate {
    /// A gate with the reference sampling settings (10 tokens, temperature 0).
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            max_tokens: 10,
            temperature: 0.0,
            enabled: true,
        }
    }

    pub fn from_config(provider: Arc<dyn Provider>, config: &JudgeConfig) -> Self {
        Self {
            provider,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            enabled: config.enabled,
        }
    }

    /// Skip the model call and always retrieve.
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub async fn judge(&self, history_window: &str, query: &str) -> JudgeOutcome {
        if !self.enabled {
            debug!("Judge disabled, retrieving unconditionally");
            return JudgeOutcome::Retrieve;
        }

        let request = ProviderRequest::new(&self.model, judge_prompt(history_window, query), self.max_tokens)
            .with_temperature(self.temperature);

        let outcome = match self.provider.complete(request).await {
            Ok(response) if is_affirmative(&response.text) => JudgeOutcome::Retrieve,
            Ok(response) => JudgeOutcome::Skip {
                answer: response.text.trim().to_string(),
            },
            Err(error) => {
                warn!(model = %self.model, error = %error, "Judge call failed, skipping retrieval");
                JudgeOutcome::Unavailable { error }
            }
        };

        info!(decision = %outcome.summary(), "Judge decision");
        outcome
    }

    pub async fn needs_retrieval(&self, history_window: &str, query: &str) -> bool {
        self.judge(history_window, query).await.needs_retrieval()
    }
}
