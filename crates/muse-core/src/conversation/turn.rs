//! Conversation turn types.
//!
//! This module contains types for representing one message in a
//! conversation, the quick actions offered under an assistant turn, and
//! the post preview payload the assistant can attach.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifies which participant produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Speaker {
    /// The human operator composing posts.
    Operator,
    /// The AI assistant.
    Assistant,
}

/// Presentation classification of a quick action.
///
/// The kind carries no behavior; it only tells the presentation layer
/// how prominently to render the button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Primary,
    Secondary,
}

/// A suggested follow-up utterance presented under an assistant turn.
///
/// When invoked, the label is dispatched verbatim as the next outgoing
/// message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickAction {
    /// Display text, also used as the dispatched message.
    pub label: String,
    /// Presentation classification.
    pub kind: ActionKind,
}

impl QuickAction {
    /// Creates a primary action.
    pub fn primary(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            kind: ActionKind::Primary,
        }
    }

    /// Creates a secondary action.
    pub fn secondary(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            kind: ActionKind::Secondary,
        }
    }
}

/// Post preview payload attached to an assistant turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostPreview {
    /// Image URL or data reference. None while the draft has no image.
    pub image: Option<String>,
    /// Proposed caption text.
    pub caption: String,
    /// Proposed hashtag line.
    pub hashtags: String,
}

/// One message in the conversation.
///
/// Turns are created by the dispatcher and mutated only to flip
/// `actions_visible`; they are never deleted within a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Turn {
    /// Unique turn identifier (UUID format), assigned locally at creation.
    pub id: String,
    /// Which participant produced this turn.
    pub speaker: Speaker,
    /// Text body. Assistant content may contain lightweight markup.
    pub content: String,
    /// Timestamp when the turn was created (ISO 8601 format).
    pub created_at: String,
    /// Whether this turn's quick actions are currently interactable.
    #[serde(default)]
    pub actions_visible: bool,
    /// Quick actions offered under this turn. Populated only on
    /// assistant turns.
    #[serde(default)]
    pub actions: Vec<QuickAction>,
    /// Post preview attached by the assistant, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attached_post: Option<PostPreview>,
}

impl Turn {
    /// Creates a turn authored by the human operator.
    pub fn operator(content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            speaker: Speaker::Operator,
            content: content.into(),
            created_at: Utc::now().to_rfc3339(),
            actions_visible: false,
            actions: Vec::new(),
            attached_post: None,
        }
    }

    /// Creates an assistant turn with its quick actions hidden.
    ///
    /// Actions stay hidden until the reveal scheduler flips them visible
    /// after the configured delay.
    pub fn assistant(
        content: impl Into<String>,
        actions: Vec<QuickAction>,
        attached_post: Option<PostPreview>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            speaker: Speaker::Assistant,
            content: content.into(),
            created_at: Utc::now().to_rfc3339(),
            actions_visible: false,
            actions,
            attached_post,
        }
    }

    /// Returns true when this turn was produced by the assistant.
    pub fn is_assistant(&self) -> bool {
        self.speaker == Speaker::Assistant
    }
}
