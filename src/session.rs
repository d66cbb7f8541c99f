//! In-memory conversation history keyed by session id
//!
//! Sessions are created on first append and live for the lifetime of the
//! process. History is soft-bounded by message count on append and trimmed
//! against a token budget before each model call.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};

use crate::tokens::TokenEstimator;

/// Who produced a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    /// Label used when serializing history into a prompt
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::User => "User",
            Self::Assistant => "Assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A single conversation entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    /// Message from the user
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Message from the assistant
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Serialize history as `Conversation so far:` followed by one line per message
#[must_use]
pub fn serialize_history(history: &[Message]) -> String {
    let mut out = String::from("Conversation so far:");
    for message in history {
        out.push('\n');
        out.push_str(message.role.label());
        out.push_str(": ");
        out.push_str(&message.content);
    }
    out
}

/// Storage for per-session conversation history
pub trait SessionStore: Send + Sync {
    /// Messages for a session, oldest first (empty for unknown ids)
    fn history(&self, session_id: &str) -> Vec<Message>;

    /// Append a message, evicting the oldest beyond the message cap
    fn append(&self, session_id: &str, message: Message);

    /// Drop oldest messages until history plus `prompt` fits in `max_tokens`
    ///
    /// Stops when history is empty even if the prompt alone is over budget.
    fn trim_to_fit(&self, session_id: &str, prompt: &str, max_tokens: usize);

    /// Number of messages held for a session
    fn len(&self, session_id: &str) -> usize;
}

/// Process-local session store
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, Vec<Message>>>,
    max_messages: usize,
    estimator: Arc<dyn TokenEstimator>,
}

impl InMemorySessionStore {
    /// Create a store keeping at most `max_messages` per session
    #[must_use]
    pub fn new(max_messages: usize, estimator: Arc<dyn TokenEstimator>) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            max_messages,
            estimator,
        }
    }

    fn combined_tokens(&self, history: &[Message], prompt: &str) -> usize {
        let text = format!("{}\n\n{prompt}", serialize_history(history));
        self.estimator.estimate(&text)
    }
}

impl SessionStore for InMemorySessionStore {
    fn history(&self, session_id: &str) -> Vec<Message> {
        let sessions = self.sessions.read().unwrap_or_else(PoisonError::into_inner);
        sessions.get(session_id).cloned().unwrap_or_default()
    }

    fn append(&self, session_id: &str, message: Message) {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        let history = sessions.entry(session_id.to_string()).or_default();
        history.push(message);

        if history.len() > self.max_messages {
            let excess = history.len() - self.max_messages;
            history.drain(..excess);
            tracing::debug!(session_id, evicted = excess, "evicted old messages");
        }
    }

    fn trim_to_fit(&self, session_id: &str, prompt: &str, max_tokens: usize) {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        let Some(history) = sessions.get_mut(session_id) else {
            return;
        };

        let before = history.len();
        while !history.is_empty() && self.combined_tokens(history, prompt) > max_tokens {
            history.remove(0);
        }

        if history.len() < before {
            tracing::debug!(
                session_id,
                removed = before - history.len(),
                remaining = history.len(),
                "trimmed history to token budget"
            );
        }
    }

    fn len(&self, session_id: &str) -> usize {
        let sessions = self.sessions.read().unwrap_or_else(PoisonError::into_inner);
        sessions.get(session_id).map_or(0, Vec::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokens::HeuristicEstimator;

    fn store(max_messages: usize) -> InMemorySessionStore {
        InMemorySessionStore::new(max_messages, Arc::new(HeuristicEstimator))
    }

    #[test]
    fn append_creates_session_and_preserves_order() {
        let store = store(12);
        store.append("s1", Message::user("hi"));
        store.append("s1", Message::assistant("hello"));

        let history = store.history("s1");
        assert_eq!(history, vec![Message::user("hi"), Message::assistant("hello")]);
        assert_eq!(store.len("other"), 0);
    }

    #[test]
    fn append_evicts_oldest_beyond_cap() {
        let store = store(3);
        for i in 0..5 {
            store.append("s1", Message::user(format!("m{i}")));
        }

        let contents: Vec<_> = store.history("s1").into_iter().map(|m| m.content).collect();
        assert_eq!(contents, vec!["m2", "m3", "m4"]);
    }

    #[test]
    fn serialize_uses_role_labels() {
        let text = serialize_history(&[Message::user("Salah?"), Message::assistant("Yes.")]);
        assert_eq!(text, "Conversation so far:\nUser: Salah?\nAssistant: Yes.");
    }

    #[test]
    fn trim_removes_oldest_until_within_budget() {
        let store = store(12);
        for i in 0..6 {
            store.append("s1", Message::user(format!("{i}{}", "x".repeat(399))));
        }
        // Each message is ~100 tokens; the prompt ~25
        store.trim_to_fit("s1", &"p".repeat(100), 250);

        let history = store.history("s1");
        assert!(history.len() < 6);
        assert!(history[0].content.starts_with(&(6 - history.len()).to_string()));
        assert!(store.combined_tokens(&history, &"p".repeat(100)) <= 250);
    }

    #[test]
    fn trim_is_idempotent_and_monotonic() {
        let store = store(12);
        for i in 0..8 {
            store.append("s1", Message::user(format!("message number {i} {}", "y".repeat(200))));
        }

        store.trim_to_fit("s1", "prompt", 300);
        let once = store.history("s1");
        store.trim_to_fit("s1", "prompt", 300);
        assert_eq!(store.history("s1"), once);

        store.trim_to_fit("s1", "prompt", 10_000);
        assert_eq!(store.history("s1").len(), once.len());
    }

    #[test]
    fn trim_empties_history_when_prompt_alone_exceeds_budget() {
        let store = store(12);
        store.append("s1", Message::user("short"));
        store.trim_to_fit("s1", &"z".repeat(1000), 10);
        assert_eq!(store.len("s1"), 0);
    }

    #[test]
    fn trim_unknown_session_is_noop() {
        let store = store(12);
        store.trim_to_fit("missing", "prompt", 1);
        assert_eq!(store.len("missing"), 0);
    }
}
