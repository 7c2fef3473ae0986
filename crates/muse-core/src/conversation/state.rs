//! Conversation session state.
//!
//! This module contains the single source of truth for one conversation:
//! the ordered turn list plus the transient session flags. All mutation
//! goes through explicit, named operations; there is no ad-hoc field
//! poking from the outside.

use super::turn::Turn;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// In-memory state of one conversation session.
///
/// Turns are append-only for the lifetime of the session; the only
/// mutation an existing turn ever sees is its `actions_visible` flag.
/// The struct itself is synchronous. The controller that owns it wraps
/// it in a lock and keeps every mutation inside one critical section, so
/// readers always observe a consistent snapshot.
#[derive(Debug, Clone)]
pub struct ConversationState {
    /// Opaque session identifier sent to the responder (UUID format).
    session_id: String,
    /// Ordered turn list. Insertion order is chronological order.
    turns: Vec<Turn>,
    /// Not-yet-submitted input buffer.
    draft: String,
    /// True while a dispatch is in flight.
    pending: bool,
    /// Failure message from the most recent dispatch, if any.
    last_error: Option<String>,
}

impl ConversationState {
    /// Creates an empty session with a fresh session id.
    pub fn new() -> Self {
        Self {
            session_id: Uuid::new_v4().to_string(),
            turns: Vec::new(),
            draft: String::new(),
            pending: false,
            last_error: None,
        }
    }

    // ============================================================================
    // Read access
    // ============================================================================

    /// Returns the opaque session id.
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Returns the ordered turn list.
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// Returns the current input buffer.
    pub fn draft(&self) -> &str {
        &self.draft
    }

    /// Returns true while a dispatch is in flight.
    pub fn pending(&self) -> bool {
        self.pending
    }

    /// Returns the failure message from the most recent dispatch, if any.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Returns the turn whose quick actions are currently visible.
    ///
    /// At most one turn is ever visible; the dispatcher hides all actions
    /// before every new dispatch.
    pub fn visible_turn(&self) -> Option<&Turn> {
        self.turns.iter().find(|t| t.actions_visible)
    }

    /// Builds a read-only snapshot for the presentation layer.
    pub fn snapshot(&self) -> ConversationSnapshot {
        ConversationSnapshot {
            session_id: self.session_id.clone(),
            turns: self.turns.clone(),
            draft: self.draft.clone(),
            pending: self.pending,
            last_error: self.last_error.clone(),
        }
    }

    // ============================================================================
    // Mutation operations
    // ============================================================================

    /// Appends a turn at the end of the conversation.
    pub fn append_turn(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    /// Sets `actions_visible = false` on every turn. Idempotent.
    pub fn hide_all_actions(&mut self) {
        for turn in &mut self.turns {
            turn.actions_visible = false;
        }
    }

    /// Sets `actions_visible = true` on the turn matching `turn_id`.
    ///
    /// Silent no-op when no such turn exists, which absorbs a stale
    /// reveal timer firing after the session was reset. Returns whether
    /// a turn was actually revealed so callers can log the outcome.
    pub fn reveal_actions(&mut self, turn_id: &str) -> bool {
        match self.turns.iter_mut().find(|t| t.id == turn_id) {
            Some(turn) => {
                turn.actions_visible = true;
                true
            }
            None => false,
        }
    }

    /// Sets the in-flight flag.
    pub fn set_pending(&mut self, pending: bool) {
        self.pending = pending;
    }

    /// Sets or clears the failure message.
    pub fn set_error(&mut self, message: Option<String>) {
        self.last_error = message;
    }

    /// Replaces the input buffer.
    pub fn set_draft(&mut self, text: impl Into<String>) {
        self.draft = text.into();
    }

    /// Discards all turns and flags and mints a new session id.
    ///
    /// Used when the operator starts a new conversation.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl Default for ConversationState {
    fn default() -> Self {
        Self::new()
    }
}

/// Read-only view of a conversation session.
///
/// This is what the presentation layer renders from; it carries no
/// behavior and can be serialized for embedding consumers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSnapshot {
    /// Opaque session identifier.
    pub session_id: String,
    /// Ordered turn list.
    pub turns: Vec<Turn>,
    /// Not-yet-submitted input buffer.
    pub draft: String,
    /// True while a dispatch is in flight.
    pub pending: bool,
    /// Failure message from the most recent dispatch, if any.
    pub last_error: Option<String>,
}

impl ConversationSnapshot {
    /// Returns the turn whose quick actions are currently visible.
    pub fn visible_turn(&self) -> Option<&Turn> {
        self.turns.iter().find(|t| t.actions_visible)
    }
}
