//! # Session memory
//!
//! Short-term, per-conversation memory shared across requests.
//!
//! Each session (an opaque caller-supplied identifier) remembers the context
//! and question of its most recent retrieval turn, so a follow-up question
//! can be answered with the previous turn blended in.
//!
//! The store is a keyed map with per-key locking: requests for different
//! sessions never contend, and concurrent requests for the *same* session
//! serialize on that session's lock instead of racing. Sessions are created
//! lazily and never explicitly destroyed by callers; the store enforces a
//! bounded session count by evicting the least-recently-used session when a
//! new one would exceed the cap.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

/// The last retrieval turn of one conversation.
///
/// Owned by the [`SessionMemory`] store; the composer reads and writes it
/// through the store's per-session handle and never keeps a copy across
/// requests.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SessionContext {
    /// Retrieved context of the previous turn, already truncated to the
    /// per-turn character budget.
    pub last_context: String,
    /// Raw question text of the previous turn.
    pub last_question: String,
}

struct Entry {
    context: Arc<Mutex<SessionContext>>,
    last_used: Instant,
}

/// Process-wide session map with per-key locking and LRU eviction.
pub struct SessionMemory {
    max_sessions: usize,
    sessions: Mutex<HashMap<String, Entry>>,
}

impl SessionMemory {
    /// Create a store that remembers at most `max_sessions` sessions.
    ///
    /// A cap of zero is treated as one.
    pub fn new(max_sessions: usize) -> Self {
        Self {
            max_sessions: max_sessions.max(1),
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Return the handle for `session_id`, creating an empty context on first
    /// use. Idempotent per session id.
    ///
    /// Creating a session beyond the cap evicts the least-recently-used one.
    pub fn get_or_create(&self, session_id: &str) -> Arc<Mutex<SessionContext>> {
        let mut sessions = self
            .sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if !sessions.contains_key(session_id) && sessions.len() >= self.max_sessions {
            let stalest = sessions
                .iter()
                .min_by_key(|(_, entry)| entry.last_used)
                .map(|(id, _)| id.clone());
            if let Some(id) = stalest {
                tracing::info!(session = %id, "evicting least-recently-used session");
                sessions.remove(&id);
            }
        }

        let entry = sessions.entry(session_id.to_string()).or_insert_with(|| Entry {
            context: Arc::new(Mutex::new(SessionContext::default())),
            last_used: Instant::now(),
        });
        entry.last_used = Instant::now();
        Arc::clone(&entry.context)
    }

    /// Overwrite the stored context and question for `session_id`.
    ///
    /// Last write wins; there are no merge semantics.
    pub fn update(&self, session_id: &str, context_text: &str, question_text: &str) {
        let handle = self.get_or_create(session_id);
        let mut context = handle.lock().unwrap_or_else(PoisonError::into_inner);
        context.last_context = context_text.to_string();
        context.last_question = question_text.to_string();
    }

    /// Number of sessions currently remembered.
    pub fn len(&self) -> usize {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether no session is remembered yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    fn snapshot(memory: &SessionMemory, session_id: &str) -> SessionContext {
        memory
            .get_or_create(session_id)
            .lock()
            .unwrap()
            .clone()
    }

    #[test]
    fn test_get_or_create_is_idempotent() {
        let memory = SessionMemory::new(8);
        let first = memory.get_or_create("user_1");
        let second = memory.get_or_create("user_1");
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(memory.len(), 1);
    }

    #[test]
    fn test_new_session_starts_empty() {
        let memory = SessionMemory::new(8);
        let context = snapshot(&memory, "user_1");
        assert_eq!(context.last_context, "");
        assert_eq!(context.last_question, "");
    }

    #[test]
    fn test_update_overwrites_last_write_wins() {
        let memory = SessionMemory::new(8);
        memory.update("user_1", "first context", "first question");
        memory.update("user_1", "second context", "second question");
        let context = snapshot(&memory, "user_1");
        assert_eq!(context.last_context, "second context");
        assert_eq!(context.last_question, "second question");
    }

    #[test]
    fn test_sessions_are_isolated() {
        let memory = SessionMemory::new(8);
        memory.update("user_1", "lunar context", "lunar question");
        memory.update("user_2", "mars context", "mars question");

        let first = snapshot(&memory, "user_1");
        let second = snapshot(&memory, "user_2");
        assert_eq!(first.last_context, "lunar context");
        assert_eq!(second.last_context, "mars context");

        memory.update("user_2", "changed", "changed");
        assert_eq!(snapshot(&memory, "user_1").last_context, "lunar context");
    }

    #[test]
    fn test_cap_evicts_least_recently_used() {
        let memory = SessionMemory::new(2);
        memory.update("user_1", "a", "a");
        thread::sleep(Duration::from_millis(2));
        memory.update("user_2", "b", "b");
        thread::sleep(Duration::from_millis(2));

        // Touch user_1 so user_2 becomes the stalest.
        memory.get_or_create("user_1");
        thread::sleep(Duration::from_millis(2));

        memory.update("user_3", "c", "c");
        assert_eq!(memory.len(), 2);
        assert_eq!(snapshot(&memory, "user_1").last_context, "a");
        // user_2 was evicted; recreating it yields a fresh context.
        assert_eq!(snapshot(&memory, "user_2").last_context, "");
    }
}
