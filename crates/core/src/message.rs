//! Turn and History domain types.
//!
//! These are the value objects the conversation loop owns:
//! client sends a message → pipeline drafts a reply → both become turns.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who authored a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The building resident or owner writing in
    Client,
    /// A draft produced for the manager
    #[serde(alias = "manager_ai_draft")]
    Assistant,
}

impl Role {
    /// Transcript label used when history is rendered into a prompt.
    pub fn label(&self) -> &'static str {
        match self {
            Role::Client => "Client",
            Role::Assistant => "Manager (AI)",
        }
    }
}

/// A single immutable turn in the conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    role: Role,
    message: String,
    timestamp: DateTime<Utc>,
}

impl Turn {
    /// A message written by the client.
    pub fn client(message: impl Into<String>) -> Self {
        Self::new(Role::Client, message)
    }

    /// A draft reply produced by the assistant.
    pub fn assistant(message: impl Into<String>) -> Self {
        Self::new(Role::Assistant, message)
    }

    pub fn new(role: Role, message: impl Into<String>) -> Self {
        Self {
            role,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// `Label: message`, the line format used in prompts.
    pub fn transcript_line(&self) -> String {
        format!("{}: {}", self.role.label(), self.message)
    }
}

/// Chronological, append-only sequence of turns for one session.
///
/// Turns cannot be removed or edited once pushed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct History {
    turns: Vec<Turn>,
}

impl History {
    /// Create an empty history for a new session.
    pub fn new() -> Self {
        Self { turns: Vec::new() }
    }

    /// Append a turn.
    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// The last `n` turns (or all of them if fewer exist).
    pub fn last_turns(&self, n: usize) -> &[Turn] {
        let start = self.turns.len().saturating_sub(n);
        &self.turns[start..]
    }

    /// Render the last `n` turns as a newline-joined `Label: message` transcript.
    ///
    /// Returns an empty string when there is nothing to show.
    pub fn format_window(&self, n: usize) -> String {
        self.last_turns(n)
            .iter()
            .map(Turn::transcript_line)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}
