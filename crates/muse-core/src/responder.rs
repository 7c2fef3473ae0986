//! Responder boundary.
//!
//! The assistant's backend is an external workflow endpoint. This module
//! declares the wire shapes exchanged with it, the contract validation
//! applied to incoming replies, and the [`Responder`] trait that the
//! dispatcher talks to. Transport concerns live behind the trait; the
//! core only cares about the logical request/response shape.

use crate::conversation::{PostPreview, QuickAction};
use crate::error::{MuseError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Outgoing message to the responder endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponderRequest {
    /// The dispatched message text.
    pub message: String,
    /// Opaque conversation session identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl ResponderRequest {
    /// Creates a request without a session id.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            session_id: None,
        }
    }

    /// Attaches the session id.
    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }
}

/// Assistant reply received from the responder endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponderReply {
    /// Assistant message body. May contain lightweight markup.
    pub message: String,
    /// Quick actions to offer under the assistant turn. Absent on the
    /// wire means none.
    #[serde(default)]
    pub available_actions: Vec<QuickAction>,
    /// Post preview payload, when the assistant produced a draft.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post: Option<PostPreview>,
}

impl ResponderReply {
    /// Creates a plain text reply with no actions or post payload.
    pub fn text(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            available_actions: Vec::new(),
            post: None,
        }
    }

    /// Sets the offered quick actions.
    pub fn with_actions(mut self, actions: Vec<QuickAction>) -> Self {
        self.available_actions = actions;
        self
    }

    /// Attaches a post preview payload.
    pub fn with_post(mut self, post: PostPreview) -> Self {
        self.post = Some(post);
        self
    }

    /// Parses a reply from a raw JSON body and validates it.
    ///
    /// # Errors
    ///
    /// Returns a `Serialization` error when the body is not valid JSON
    /// for the declared shape, or a `Contract` error when the parsed
    /// reply fails [`ResponderReply::validate`].
    pub fn from_json(body: &str) -> Result<Self> {
        let reply: Self = serde_json::from_str(body)?;
        reply.validate()?;
        Ok(reply)
    }

    /// Checks the reply against the responder contract.
    ///
    /// A reply must carry a non-blank message, and every offered action
    /// must carry a non-blank label (the label is dispatched verbatim
    /// when invoked, so a blank one would synthesize an empty message).
    ///
    /// # Errors
    ///
    /// Returns a `Contract` error naming the violated rule.
    pub fn validate(&self) -> Result<()> {
        if self.message.trim().is_empty() {
            return Err(MuseError::contract("reply message is empty"));
        }
        for action in &self.available_actions {
            if action.label.trim().is_empty() {
                return Err(MuseError::contract("quick action label is empty"));
            }
        }
        Ok(())
    }
}

/// Maps an outgoing message to an assistant reply.
///
/// Implementations own transport and authentication; the dispatcher only
/// sees the logical shapes. Any failure (unreachable endpoint, non-2xx
/// status, malformed body) surfaces as an error from `respond` and the
/// dispatch is treated as failed.
#[async_trait]
pub trait Responder: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &str;

    /// Produces the assistant reply for one outgoing message.
    async fn respond(&self, request: ResponderRequest) -> Result<ResponderReply>;
}
