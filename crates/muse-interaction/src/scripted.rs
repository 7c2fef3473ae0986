//! ScriptedResponder - in-process stand-in for the workflow endpoint.
//!
//! The hosted workflow endpoint is not always reachable during
//! development, so this responder answers with canned social-post flows
//! routed on keywords in the outgoing message. The quick actions it
//! offers route back into its own flows, so a session can be driven
//! end to end without any network.

use async_trait::async_trait;
use muse_core::conversation::{PostPreview, QuickAction};
use muse_core::error::{MuseError, Result};
use muse_core::responder::{Responder, ResponderReply, ResponderRequest};
use rand::Rng;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Small-talk fallbacks cycled in order when no flow matches.
const FALLBACK_REPLIES: [&str; 3] = [
    "I can draft posts, suggest hashtags, and plan your posting schedule. Where should we start?",
    "Tell me about the moment you want to share and I'll shape it into a post.",
    "We could start from a photo, a caption idea, or just a mood - your call.",
];

/// Responder implementation with canned flows for the social-post domain.
///
/// Optionally simulates endpoint latency (with jitter) so REPL sessions
/// feel like a real round trip, and can be constructed in an
/// always-failing mode to exercise failure handling.
pub struct ScriptedResponder {
    latency: Option<Duration>,
    failure: Option<String>,
    fallback_cursor: AtomicUsize,
}

impl ScriptedResponder {
    /// Creates a responder that answers immediately.
    pub fn new() -> Self {
        Self {
            latency: None,
            failure: None,
            fallback_cursor: AtomicUsize::new(0),
        }
    }

    /// Creates a responder that fails every dispatch with the given
    /// message.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            latency: None,
            failure: Some(message.into()),
            fallback_cursor: AtomicUsize::new(0),
        }
    }

    /// Simulates endpoint latency. Each reply is delayed by `base` plus
    /// up to half of `base` in random jitter.
    pub fn with_latency(mut self, base: Duration) -> Self {
        self.latency = Some(base);
        self
    }

    fn greeting(&self) -> ResponderReply {
        ResponderReply::text(
            "Hi! I'm your posting assistant. Tell me what you'd like to share \
             and I'll draft it with you.",
        )
        .with_actions(vec![
            QuickAction::primary("Create an Instagram post"),
            QuickAction::secondary("Generate hashtags"),
        ])
    }

    fn drafting(&self) -> ResponderReply {
        ResponderReply::text(
            "Here's a first draft for your post. I kept the caption short and \
             added a hashtag line - want me to adjust anything?",
        )
        .with_actions(vec![
            QuickAction::primary("Generate hashtags"),
            QuickAction::secondary("Schedule for later"),
        ])
        .with_post(PostPreview {
            image: None,
            caption: "Golden hour at the waterfront. Some evenings just ask to be shared."
                .to_string(),
            hashtags: "#goldenhour #waterfront #eveninglight".to_string(),
        })
    }

    fn hashtags(&self) -> ResponderReply {
        ResponderReply::text(
            "Here are hashtag sets that fit your draft:\n\n\
             - Reach: #goldenhour #sunsetlovers #eveningmood\n\
             - Niche: #waterfrontwalks #harbourview #bluehourmagic\n\n\
             Pick a set or mix and match.",
        )
        .with_actions(vec![
            QuickAction::primary("Schedule for later"),
            QuickAction::secondary("Create an Instagram post"),
        ])
    }

    fn scheduling(&self) -> ResponderReply {
        ResponderReply::text(
            "Your audience is most active on weekday evenings. Thursday around \
             6 pm usually performs best - should I queue the post for then?",
        )
        .with_actions(vec![
            QuickAction::primary("Queue for Thursday 6 pm"),
            QuickAction::secondary("Create an Instagram post"),
        ])
    }

    fn queued(&self) -> ResponderReply {
        // Terminal flow step: no follow-up actions on purpose.
        ResponderReply::text(
            "Done - your post is queued for Thursday at 6 pm. I'll have a final \
             caption check ready an hour before it goes out.",
        )
    }

    fn fallback(&self) -> ResponderReply {
        let index = self.fallback_cursor.fetch_add(1, Ordering::Relaxed) % FALLBACK_REPLIES.len();
        ResponderReply::text(FALLBACK_REPLIES[index]).with_actions(vec![
            QuickAction::primary("Create an Instagram post"),
            QuickAction::secondary("Generate hashtags"),
        ])
    }

    fn route(&self, message: &str) -> ResponderReply {
        let lower = message.to_lowercase();
        let is_greeting = lower
            .split_whitespace()
            .any(|word| matches!(word, "hi" | "hello" | "hey"));

        if lower.contains("queue for") {
            self.queued()
        } else if lower.contains("hashtag") {
            self.hashtags()
        } else if lower.contains("schedule") || lower.contains("queue") {
            self.scheduling()
        } else if lower.contains("instagram") || lower.contains("post") || lower.contains("draft")
        {
            self.drafting()
        } else if is_greeting {
            self.greeting()
        } else {
            self.fallback()
        }
    }
}

impl Default for ScriptedResponder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Responder for ScriptedResponder {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn respond(&self, request: ResponderRequest) -> Result<ResponderReply> {
        if let Some(message) = &self.failure {
            return Err(MuseError::transport(message.clone()));
        }

        if let Some(base) = self.latency {
            let delay = {
                let mut rng = rand::thread_rng();
                let jitter_ms = rng.gen_range(0..=base.as_millis() as u64 / 2);
                base + Duration::from_millis(jitter_ms)
            };
            tokio::time::sleep(delay).await;
        }

        let reply = self.route(&request.message);
        tracing::debug!(target: "responder", "scripted reply ({} actions)", reply.available_actions.len());
        Ok(reply)
    }
}
