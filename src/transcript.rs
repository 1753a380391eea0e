//! Conversation transcript for a single chat session.
//!
//! History turns are immutable once appended. The assistant reply that is
//! still arriving lives in a separate draft accumulator and is only merged
//! into history when the stream completes, so streaming can never touch an
//! earlier turn and appending a delta is O(1).

use crate::types::{ChatMessage, MessageRole};

/// Ordered conversation turns plus the in-progress assistant reply.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    history: Vec<ChatMessage>,
    draft: Option<String>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether an assistant reply is currently being accumulated.
    pub fn in_flight(&self) -> bool {
        self.draft.is_some()
    }

    /// Append a user turn and open an empty draft for the reply.
    ///
    /// The empty draft is what a UI renders as the pending assistant bubble
    /// before any bytes arrive. Returns `false` and leaves the transcript
    /// unchanged for blank input or while a reply is already in flight.
    pub fn append_user_turn(&mut self, text: &str) -> bool {
        let trimmed = text.trim();
        if trimmed.is_empty() || self.draft.is_some() {
            return false;
        }
        self.history.push(ChatMessage::user(trimmed));
        self.draft = Some(String::new());
        true
    }

    /// Append streamed text to the in-progress reply.
    ///
    /// Silent no-op when no reply is in flight: losing a fragment is
    /// preferable to mutating a turn that already belongs to history.
    pub fn append_delta(&mut self, delta: &str) {
        if let Some(draft) = &mut self.draft {
            draft.push_str(delta);
        }
    }

    /// Discard the in-progress reply. Idempotent.
    pub fn rollback(&mut self) {
        self.draft = None;
    }

    /// Merge the in-progress reply into history as an assistant turn.
    pub fn commit(&mut self) {
        if let Some(draft) = self.draft.take() {
            self.history.push(ChatMessage::assistant(draft));
        }
    }

    /// Turns to display: history minus system turns, plus the in-progress
    /// reply rendered as an assistant turn. Recomputed on every call.
    pub fn visible_turns(&self) -> Vec<ChatMessage> {
        let mut turns: Vec<ChatMessage> = self
            .history
            .iter()
            .filter(|m| m.role != MessageRole::System)
            .cloned()
            .collect();
        if let Some(draft) = &self.draft {
            turns.push(ChatMessage::assistant(draft.clone()));
        }
        turns
    }

    /// Flatten the conversation for an outbound request: the system prompt
    /// followed by the full history. The draft is excluded; the reply being
    /// requested does not exist yet from the endpoint's point of view.
    pub fn request_messages(&self, system_prompt: &str) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(self.history.len() + 1);
        messages.push(ChatMessage::system(system_prompt));
        messages.extend(self.history.iter().cloned());
        messages
    }
}
