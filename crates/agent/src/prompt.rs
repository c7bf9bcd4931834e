//! Prompt builder for the drafting model.
//!
//! Layout: system policy, then the optional history and context sections,
//! then the current query and the `Draft Response:` cue. Empty sections are
//! omitted entirely, headers included.

use serde::{Deserialize, Serialize};

/// Drafting policy placed at the top of every prompt.
pub const DEFAULT_POLICY: &str = "You are an AI assistant helping a strata manager communicate professionally with clients.
Your task is to generate a polite, accurate, and helpful draft response.

**Instructions:**
- Base your response strictly on the information within the \"CONTEXT DOCUMENTS\" section if provided.
- Refer to the \"CHAT HISTORY\" for conversational flow and context.
- If context documents are provided and they don't contain the answer, clearly state that you cannot provide the information based on the documents available. Do not invent answers if context is meant to be used.
- If no context documents are provided (RAG was skipped), provide a helpful conversational response based on the chat history.
- Maintain a professional, polite, and empathetic tone. Avoid dismissive or rude language.
- Address the user's latest query directly.
- Do not provide legal advice.
";

pub const HISTORY_HEADER: &str = "--- CHAT HISTORY (Recent Turns) ---";
pub const CONTEXT_HEADER: &str = "--- CONTEXT DOCUMENTS ---";
pub const QUERY_HEADER: &str = "--- CURRENT QUERY ---";
pub const RESPONSE_CUE: &str = "Draft Response:";

/// A fully rendered prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptDocument {
    pub text: String,
    pub has_history: bool,
    pub has_context: bool,
}

impl PromptDocument {
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }
}

#[derive(Debug, Clone)]
pub struct PromptBuilder {
    policy: String,
}

impl PromptBuilder {
    pub fn new() -> Self {
        Self {
            policy: DEFAULT_POLICY.to_string(),
        }
    }

    /// Replace the drafting policy.
    pub fn with_policy(policy: impl Into<String>) -> Self {
        Self {
            policy: policy.into(),
        }
    }

    pub fn policy(&self) -> &str {
        &self.policy
    }

    pub fn build(&self, history_window: &str, context_blob: &str, query: &str) -> PromptDocument {
        let has_history = !history_window.is_empty();
        let has_context = !context_blob.is_empty();

        let mut text = String::with_capacity(
            self.policy.len() + history_window.len() + context_blob.len() + query.len() + 128,
        );
        text.push_str(&self.policy);
        if has_history {
            text.push('\n');
            text.push_str(HISTORY_HEADER);
            text.push('\n');
            text.push_str(history_window);
        }
        if has_context {
            text.push_str("\n\n");
            text.push_str(CONTEXT_HEADER);
            text.push('\n');
            text.push_str(context_blob);
        }
        text.push_str("\n\n");
        text.push_str(QUERY_HEADER);
        text.push('\n');
        text.push_str(query);
        text.push_str("\n\n");
        text.push_str(RESPONSE_CUE);

        PromptDocument {
            text,
            has_history,
            has_context,
        }
    }
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_prompt() {
        let doc = PromptBuilder::new().build("", "", "Hello?");
        assert_eq!(
            doc.text,
            format!("{DEFAULT_POLICY}\n\n--- CURRENT QUERY ---\nHello?\n\nDraft Response:")
        );
        assert!(!doc.has_history);
        assert!(!doc.has_context);
        assert!(!doc.text.contains(HISTORY_HEADER));
        assert!(!doc.text.contains(CONTEXT_HEADER));
    }

    #[test]
    fn full_prompt_section_order() {
        let doc = PromptBuilder::new().build(
            "Client: Hi\nManager (AI): Hello!",
            "Visitor parking is four hours.",
            "Where can visitors park?",
        );
        let expected = format!(
            "{DEFAULT_POLICY}\n--- CHAT HISTORY (Recent Turns) ---\nClient: Hi\nManager (AI): Hello!\
             \n\n--- CONTEXT DOCUMENTS ---\nVisitor parking is four hours.\
             \n\n--- CURRENT QUERY ---\nWhere can visitors park?\n\nDraft Response:"
        );
        assert_eq!(doc.text, expected);
        assert!(doc.has_history && doc.has_context);
    }

    #[test]
    fn context_without_history() {
        let doc = PromptBuilder::new().build("", "ctx", "q");
        assert!(doc.has_context);
        assert!(!doc.has_history);
        assert!(doc.text.contains("\n\n--- CONTEXT DOCUMENTS ---\nctx\n\n--- CURRENT QUERY ---"));
    }

    #[test]
    fn custom_policy() {
        let doc = PromptBuilder::with_policy("Be brief.").build("", "", "q");
        assert!(doc.text.starts_with("Be brief.\n\n--- CURRENT QUERY ---"));
        assert_eq!(doc.char_count(), doc.text.chars().count());
    }

    #[test]
    fn policy_mentions_key_rules() {
        assert!(DEFAULT_POLICY.contains("strata manager"));
        assert!(DEFAULT_POLICY.contains("Do not provide legal advice."));
        assert!(DEFAULT_POLICY.ends_with('\n'));
    }
}
