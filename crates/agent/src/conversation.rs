//! Conversation loop state: owns the history and drafts one reply per query.

use std::sync::Arc;

use stratadesk_core::message::{History, Turn};
use tracing::debug;

use crate::pipeline::{DraftOutcome, DraftPipeline};

/// A drafting session. History lives only in memory.
///
/// Each submitted query is appended as a client turn. A generated draft is
/// appended as an assistant turn; a failed draft is not, so the transcript
/// never contains error text.
pub struct Conversation {
    pipeline: Arc<DraftPipeline>,
    history: History,
}

impl Conversation {
    pub fn new(pipeline: Arc<DraftPipeline>) -> Self {
        Self::with_history(pipeline, History::new())
    }

    /// Start from an existing transcript (e.g. the demo conversation).
    pub fn with_history(pipeline: Arc<DraftPipeline>, history: History) -> Self {
        Self { pipeline, history }
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub async fn submit(&mut self, query: &str) -> DraftOutcome {
        let outcome = self.pipeline.draft(&self.history, query).await;

        self.history.push(Turn::client(query));
        if let Some(text) = outcome.response.text() {
            self.history.push(Turn::assistant(text));
        }
        debug!(turns = self.history.len(), "History updated");

        outcome
    }
}

/// The sample exchange used by `chat --demo`: two seeded turns and a follow-up.
pub fn demo_conversation() -> (History, &'static str) {
    let mut history = History::new();
    history.push(Turn::client(
        "Hi, I have a question about the upcoming AGM for Building A.",
    ));
    history.push(Turn::assistant(
        "Hello! I can help with that. The AGM for Building A is scheduled. What specific information are you looking for?",
    ));
    (
        history,
        "When is it and what's the deadline for submitting agenda items?",
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{ContextAssembler, WhitespaceTokenCounter};
    use crate::judge::JudgeGate;
    use crate::retrieval::{KnowledgeSource, RetrievalFanout};
    use crate::test_helpers::{ScriptedProvider, ScriptedStore};
    use stratadesk_config::GenerationConfig;
    use stratadesk_core::error::ProviderError;
    use stratadesk_core::message::Role;

    fn conversation(provider: Arc<ScriptedProvider>) -> Conversation {
        let pipeline = DraftPipeline::new(
            JudgeGate::new(provider.clone(), "judge"),
            RetrievalFanout::new(
                Arc::new(ScriptedStore::new()),
                vec![KnowledgeSource::new("Building_A", "kb-a", 2)],
            ),
            ContextAssembler::new(2000, WhitespaceTokenCounter),
            provider,
            GenerationConfig::default(),
        );
        Conversation::new(Arc::new(pipeline))
    }

    #[tokio::test]
    async fn successful_turn_appends_both_sides() {
        let provider = Arc::new(ScriptedProvider::texts(&["NO", "Hello there!"]));
        let mut convo = conversation(provider);

        convo.submit("Hi").await;
        let turns = convo.history().turns();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].role(), Role::Client);
        assert_eq!(turns[0].message(), "Hi");
        assert_eq!(turns[1].role(), Role::Assistant);
        assert_eq!(turns[1].message(), "Hello there!");
    }

    #[tokio::test]
    async fn failed_draft_only_records_the_query() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            Ok(ScriptedProvider::response("NO")),
            Err(ProviderError::Timeout("slow".into())),
        ]));
        let mut convo = conversation(provider);

        let outcome = convo.submit("Hi").await;
        assert!(!outcome.response.is_generated());
        assert_eq!(convo.history().len(), 1);
    }

    #[tokio::test]
    async fn history_before_the_query_is_shown_to_the_judge() {
        let provider = Arc::new(ScriptedProvider::texts(&["NO", "first", "NO", "second"]));
        let mut convo = conversation(provider.clone());

        convo.submit("one").await;
        convo.submit("two").await;

        let requests = provider.requests();
        assert!(!requests[0].prompt.contains("Client: one"));
        assert!(requests[2].prompt.contains("Client: one\nManager (AI): first"));
        assert!(!requests[2].prompt.contains("Client: two"));
        assert_eq!(convo.history().len(), 4);
    }

    #[test]
    fn demo_has_two_seeded_turns() {
        let (history, query) = demo_conversation();
        assert_eq!(history.len(), 2);
        assert_eq!(history.turns()[1].role(), Role::Assistant);
        assert!(query.contains("agenda items"));
    }
}
