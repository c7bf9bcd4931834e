//! The StrataDesk drafting pipeline.
//!
//! For every client message:
//!
//! 1. **Judge** whether knowledge-base retrieval is needed
//! 2. **Retrieve** passages from every configured source (fan-out)
//! 3. **Assemble** a bounded context, best passages first
//! 4. **Build** the drafting prompt (policy, history, context, query)
//! 5. **Generate** a draft reply for the manager to review
//!
//! A failure at any step degrades the reply rather than aborting it.

pub mod context;
pub mod conversation;
pub mod judge;
pub mod pipeline;
pub mod prompt;
pub mod retrieval;

#[cfg(test)]
mod test_helpers;

pub use context::{AssembledContext, ContextAssembler, ScoreNormalizer, TokenCounter};
pub use conversation::{Conversation, demo_conversation};
pub use judge::{JudgeGate, JudgeOutcome, is_affirmative};
pub use pipeline::{DraftOutcome, DraftPipeline, DraftResponse, Stage, UNAVAILABLE_PREFIX};
pub use prompt::{PromptBuilder, PromptDocument};
pub use retrieval::{
    FanoutResult, KnowledgeSource, RetrievalFanout, RetrievedPassage, SourceReport, SourceStatus,
};
