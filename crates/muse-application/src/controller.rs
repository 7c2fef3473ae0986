//! Conversation controller.
//!
//! This module provides the `ConversationController`, which orchestrates
//! one request/response cycle per submission: it validates the input,
//! appends the operator turn, invokes the responder, appends the
//! assistant turn, and hands the new turn to the reveal scheduler. It is
//! the only component that talks to the responder, and it owns the
//! session state on behalf of the presentation layer.

use crate::reveal::RevealScheduler;
use muse_core::config::ConversationConfig;
use muse_core::conversation::{ConversationSnapshot, ConversationState, QuickAction, Turn};
use muse_core::responder::{Responder, ResponderRequest};
use std::sync::Arc;
use tokio::sync::RwLock;

/// User-facing notice recorded in `last_error` when a dispatch fails.
///
/// Deliberately generic: transport failures, bad statuses, and
/// contract-violating replies all read the same to the operator, who can
/// only ever retry.
pub const DISPATCH_FAILURE_NOTICE: &str =
    "Sorry, something went wrong while reaching the assistant. Please try again.";

/// Why a submission was ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// A dispatch is already in flight. The call is rejected outright,
    /// not queued.
    Busy,
    /// The trimmed input was empty.
    EmptyInput,
    /// The session was reset while the dispatch was in flight; its
    /// outcome was discarded.
    SessionReset,
}

/// Outcome of one submission.
///
/// Failures are reported here and through `last_error`; they never
/// propagate as `Err` to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The assistant replied; carries the new assistant turn's content.
    Replied(String),
    /// The submission was rejected as a pure no-op.
    Ignored(IgnoreReason),
    /// The dispatch failed; the session keeps its prior turns and stays
    /// retryable. Carries the user-facing notice.
    Failed(String),
}

/// Owns one conversation session and dispatches its turns.
///
/// # Responsibilities
///
/// - Serializing dispatches: at most one responder call is in flight per
///   session; concurrent submissions are rejected, not queued.
/// - Keeping the action-visibility invariant: every dispatch hides all
///   quick actions up front and supersedes the outstanding reveal, so at
///   most one turn ever shows actions.
/// - Converting every responder failure into the `last_error` notice so
///   nothing escapes to the presentation layer as an error.
///
/// # Thread Safety
///
/// State lives behind `Arc<RwLock<_>>`; all mutation happens in short
/// critical sections, and the lock is never held across the responder
/// call.
pub struct ConversationController {
    /// Session state shared with the reveal scheduler
    state: Arc<RwLock<ConversationState>>,
    /// The external responder boundary
    responder: Arc<dyn Responder>,
    /// Delayed, cancelable action reveal
    reveal: RevealScheduler,
}

impl ConversationController {
    /// Creates a controller for a fresh session.
    ///
    /// # Arguments
    ///
    /// * `responder` - The responder implementation to dispatch against
    /// * `config` - Conversation behavior settings (reveal delay)
    pub fn new(responder: Arc<dyn Responder>, config: ConversationConfig) -> Self {
        let state = Arc::new(RwLock::new(ConversationState::new()));
        let reveal = RevealScheduler::new(Arc::clone(&state), config.reveal_delay());
        Self {
            state,
            responder,
            reveal,
        }
    }

    /// Submits operator-typed text, synthesizing an operator turn.
    pub async fn submit(&self, text: &str) -> DispatchOutcome {
        self.dispatch(text, true).await
    }

    /// Dispatches a quick action.
    ///
    /// The label is sent to the responder verbatim, but no operator turn
    /// is appended: the label already served as a button the operator
    /// clicked.
    pub async fn submit_quick_action(&self, action: &QuickAction) -> DispatchOutcome {
        self.dispatch(&action.label, false).await
    }

    /// Replaces the not-yet-submitted input buffer.
    pub async fn set_draft(&self, text: &str) {
        self.state.write().await.set_draft(text);
    }

    /// Returns a read-only snapshot of the session.
    pub async fn snapshot(&self) -> ConversationSnapshot {
        self.state.read().await.snapshot()
    }

    /// Discards the session and starts a fresh one with a new session id.
    ///
    /// Any pending reveal is superseded; a timer that already fired is
    /// absorbed by the store's missing-turn no-op. A dispatch still in
    /// flight is orphaned: its outcome is discarded when the responder
    /// returns.
    pub async fn reset(&self) {
        let mut state = self.state.write().await;
        self.reveal.supersede().await;
        state.reset();
        tracing::info!("[Conversation] session reset ({})", state.session_id());
    }

    /// Runs one dispatch cycle.
    ///
    /// Effects, in order: supersede the outstanding reveal, hide all
    /// actions, mark the session pending and clear the previous error,
    /// optionally append the operator turn, call the responder (lock
    /// released), then append the assistant turn and schedule its reveal,
    /// or record the failure notice. The pending flag always clears for
    /// the session that started the dispatch; an outcome that arrives
    /// after a `reset` is discarded without touching the new session.
    async fn dispatch(&self, text: &str, synthesize_user_turn: bool) -> DispatchOutcome {
        if text.trim().is_empty() && synthesize_user_turn {
            return DispatchOutcome::Ignored(IgnoreReason::EmptyInput);
        }

        // Check-and-set inside one critical section so concurrent
        // submissions cannot both pass the gate.
        let session_id = {
            let mut state = self.state.write().await;
            if state.pending() {
                tracing::debug!("[Conversation] dispatch rejected: already pending");
                return DispatchOutcome::Ignored(IgnoreReason::Busy);
            }

            self.reveal.supersede().await;
            state.hide_all_actions();
            state.set_pending(true);
            state.set_error(None);
            if synthesize_user_turn {
                state.append_turn(Turn::operator(text));
                state.set_draft("");
            }
            state.session_id().to_string()
        };

        tracing::info!(
            "[Conversation] dispatching via '{}' responder",
            self.responder.name()
        );
        let request = ResponderRequest::new(text).with_session(session_id.clone());
        let result = self.responder.respond(request).await;

        let mut state = self.state.write().await;
        if state.session_id() != session_id {
            // The session was reset while the responder call was in
            // flight; the outcome belongs to a dead session and must not
            // touch the new one (turns, pending, or last_error).
            tracing::debug!("[Conversation] discarding outcome for a reset session");
            return DispatchOutcome::Ignored(IgnoreReason::SessionReset);
        }
        match result.and_then(|reply| reply.validate().map(|_| reply)) {
            Ok(reply) => {
                let turn = Turn::assistant(
                    reply.message.clone(),
                    reply.available_actions,
                    reply.post,
                );
                let turn_id = turn.id.clone();
                let has_actions = !turn.actions.is_empty();
                state.append_turn(turn);

                // Schedule before clearing the pending flag so the next
                // dispatch always finds this reveal's token to supersede.
                if has_actions {
                    self.reveal.schedule(turn_id).await;
                }
                state.set_pending(false);

                DispatchOutcome::Replied(reply.message)
            }
            Err(err) => {
                tracing::warn!("[Conversation] dispatch failed: {}", err);
                state.set_error(Some(DISPATCH_FAILURE_NOTICE.to_string()));
                state.set_pending(false);
                DispatchOutcome::Failed(DISPATCH_FAILURE_NOTICE.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use muse_core::conversation::{PostPreview, Speaker};
    use muse_core::error::{MuseError, Result as MuseResult};
    use muse_core::responder::ResponderReply;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    const DELAY: Duration = Duration::from_millis(1000);

    // Mock responder that records requests and replays queued results.
    struct MockResponder {
        replies: Mutex<VecDeque<MuseResult<ResponderReply>>>,
        requests: Mutex<Vec<ResponderRequest>>,
        delay: Option<Duration>,
    }

    impl MockResponder {
        fn new() -> Self {
            Self {
                replies: Mutex::new(VecDeque::new()),
                requests: Mutex::new(Vec::new()),
                delay: None,
            }
        }

        fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        fn queue_ok(&self, reply: ResponderReply) {
            self.replies.lock().unwrap().push_back(Ok(reply));
        }

        fn queue_err(&self, err: MuseError) {
            self.replies.lock().unwrap().push_back(Err(err));
        }

        fn requests(&self) -> Vec<ResponderRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Responder for MockResponder {
        fn name(&self) -> &str {
            "mock"
        }

        async fn respond(&self, request: ResponderRequest) -> MuseResult<ResponderReply> {
            self.requests.lock().unwrap().push(request);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            let queued = self.replies.lock().unwrap().pop_front();
            queued.unwrap_or_else(|| {
                Ok(ResponderReply::text("Here you go.")
                    .with_actions(vec![QuickAction::primary("Keep going")]))
            })
        }
    }

    fn controller_with(mock: Arc<MockResponder>) -> ConversationController {
        ConversationController::new(
            mock,
            ConversationConfig {
                reveal_delay_ms: DELAY.as_millis() as u64,
            },
        )
    }

    async fn settle() {
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;
    }

    #[tokio::test]
    async fn test_submit_appends_operator_and_assistant_turns() {
        let mock = Arc::new(MockResponder::new());
        mock.queue_ok(
            ResponderReply::text("Nice idea! Here's a draft.")
                .with_actions(vec![QuickAction::primary("Generate hashtags")]),
        );
        let controller = controller_with(Arc::clone(&mock));

        let outcome = controller.submit("draft a beach post").await;
        assert_eq!(
            outcome,
            DispatchOutcome::Replied("Nice idea! Here's a draft.".to_string())
        );

        let snapshot = controller.snapshot().await;
        assert_eq!(snapshot.turns.len(), 2);
        assert_eq!(snapshot.turns[0].speaker, Speaker::Operator);
        assert_eq!(snapshot.turns[0].content, "draft a beach post");
        assert!(snapshot.turns[1].is_assistant());
        assert!(!snapshot.turns[1].actions_visible);
        assert!(!snapshot.pending);
        assert!(snapshot.last_error.is_none());

        let requests = mock.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(
            requests[0].session_id.as_deref(),
            Some(snapshot.session_id.as_str())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_submit_while_pending_is_rejected() {
        let mock = Arc::new(MockResponder::new().with_delay(Duration::from_secs(60)));
        mock.queue_ok(ResponderReply::text("slow reply"));
        let controller = Arc::new(controller_with(Arc::clone(&mock)));

        let first = {
            let controller = Arc::clone(&controller);
            tokio::spawn(async move { controller.submit("a").await })
        };
        settle().await;
        assert!(controller.snapshot().await.pending);

        let second = controller.submit("b").await;
        assert_eq!(second, DispatchOutcome::Ignored(IgnoreReason::Busy));

        tokio::time::advance(Duration::from_secs(61)).await;
        let first = first.await.unwrap();
        assert_eq!(first, DispatchOutcome::Replied("slow reply".to_string()));

        let snapshot = controller.snapshot().await;
        let operator_turns: Vec<_> = snapshot
            .turns
            .iter()
            .filter(|t| t.speaker == Speaker::Operator)
            .collect();
        assert_eq!(operator_turns.len(), 1);
        assert_eq!(operator_turns[0].content, "a");
        assert_eq!(mock.requests().len(), 1);
        assert!(!snapshot.pending);
    }

    #[tokio::test(start_paused = true)]
    async fn test_actions_reveal_only_after_delay() {
        let mock = Arc::new(MockResponder::new());
        let controller = controller_with(Arc::clone(&mock));

        controller.submit("hello").await;
        assert!(controller.snapshot().await.visible_turn().is_none());

        tokio::time::advance(DELAY - Duration::from_millis(1)).await;
        settle().await;
        assert!(controller.snapshot().await.visible_turn().is_none());

        tokio::time::advance(Duration::from_millis(2)).await;
        settle().await;
        let snapshot = controller.snapshot().await;
        assert!(snapshot.visible_turn().unwrap().is_assistant());
    }

    #[tokio::test(start_paused = true)]
    async fn test_only_latest_assistant_turn_ends_up_visible() {
        let mock = Arc::new(MockResponder::new());
        let controller = controller_with(Arc::clone(&mock));

        controller.submit("first").await;
        tokio::time::advance(Duration::from_millis(300)).await;
        controller.submit("second").await;

        tokio::time::advance(DELAY * 2).await;
        settle().await;

        let snapshot = controller.snapshot().await;
        let visible: Vec<_> = snapshot
            .turns
            .iter()
            .filter(|t| t.actions_visible)
            .collect();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].id, snapshot.turns.last().unwrap().id);
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_dispatch_keeps_earlier_actions_hidden_forever() {
        let mock = Arc::new(MockResponder::new());
        let controller = controller_with(Arc::clone(&mock));

        controller.submit("first").await;
        let first_assistant_id = controller.snapshot().await.turns[1].id.clone();

        // Dispatch again before the first reveal elapses.
        tokio::time::advance(Duration::from_millis(500)).await;
        controller.submit("second").await;

        tokio::time::advance(DELAY * 2).await;
        settle().await;
        let snapshot = controller.snapshot().await;
        let first_turn = snapshot
            .turns
            .iter()
            .find(|t| t.id == first_assistant_id)
            .unwrap();
        assert!(!first_turn.actions_visible);
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_hides_currently_visible_actions() {
        let mock = Arc::new(MockResponder::new());
        let controller = controller_with(Arc::clone(&mock));

        controller.submit("first").await;
        tokio::time::advance(DELAY).await;
        settle().await;
        assert!(controller.snapshot().await.visible_turn().is_some());

        controller.submit("second").await;
        // Hide-all runs at dispatch start; the new reveal has not elapsed.
        assert!(controller.snapshot().await.visible_turn().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rapid_dispatches_never_show_two_turns() {
        let mock = Arc::new(MockResponder::new());
        let controller = controller_with(Arc::clone(&mock));

        // Alternate between letting a reveal fire and superseding it.
        for (i, message) in ["one", "two", "three", "four"].iter().enumerate() {
            controller.submit(message).await;
            let wait = if i % 2 == 0 {
                DELAY + Duration::from_millis(100)
            } else {
                Duration::from_millis(300)
            };
            tokio::time::advance(wait).await;
            settle().await;

            let snapshot = controller.snapshot().await;
            let visible = snapshot.turns.iter().filter(|t| t.actions_visible).count();
            assert!(visible <= 1, "more than one turn visible after '{}'", message);
        }

        tokio::time::advance(DELAY * 2).await;
        settle().await;
        let snapshot = controller.snapshot().await;
        let visible: Vec<_> = snapshot
            .turns
            .iter()
            .filter(|t| t.actions_visible)
            .collect();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].id, snapshot.turns.last().unwrap().id);
    }

    #[tokio::test]
    async fn test_blank_submit_changes_nothing() {
        let mock = Arc::new(MockResponder::new());
        let controller = controller_with(Arc::clone(&mock));
        controller.set_draft("   ").await;

        let outcome = controller.submit("   ").await;
        assert_eq!(outcome, DispatchOutcome::Ignored(IgnoreReason::EmptyInput));

        let snapshot = controller.snapshot().await;
        assert!(snapshot.turns.is_empty());
        assert!(!snapshot.pending);
        assert!(snapshot.last_error.is_none());
        assert_eq!(snapshot.draft, "   ");
        assert!(mock.requests().is_empty());
    }

    #[tokio::test]
    async fn test_failed_dispatch_leaves_session_retryable() {
        let mock = Arc::new(MockResponder::new());
        mock.queue_err(MuseError::transport("connection refused"));
        mock.queue_ok(ResponderReply::text("recovered"));
        let controller = controller_with(Arc::clone(&mock));

        let outcome = controller.submit("try this").await;
        assert_eq!(
            outcome,
            DispatchOutcome::Failed(DISPATCH_FAILURE_NOTICE.to_string())
        );

        let snapshot = controller.snapshot().await;
        assert_eq!(snapshot.turns.len(), 1); // the operator turn only
        assert!(!snapshot.pending);
        assert_eq!(snapshot.last_error.as_deref(), Some(DISPATCH_FAILURE_NOTICE));

        // The session stays retryable and the next dispatch clears the error.
        let retry = controller.submit("try again").await;
        assert_eq!(retry, DispatchOutcome::Replied("recovered".to_string()));
        let snapshot = controller.snapshot().await;
        assert!(snapshot.last_error.is_none());
        assert_eq!(snapshot.turns.len(), 3);
    }

    #[tokio::test]
    async fn test_contract_violating_reply_is_a_failure() {
        let mock = Arc::new(MockResponder::new());
        mock.queue_ok(ResponderReply::text("   "));
        let controller = controller_with(Arc::clone(&mock));

        let outcome = controller.submit("hello").await;
        assert!(matches!(outcome, DispatchOutcome::Failed(_)));

        let snapshot = controller.snapshot().await;
        assert_eq!(snapshot.turns.len(), 1);
        assert_eq!(snapshot.last_error.as_deref(), Some(DISPATCH_FAILURE_NOTICE));
    }

    #[tokio::test]
    async fn test_quick_action_dispatches_label_verbatim() {
        let mock = Arc::new(MockResponder::new());
        mock.queue_ok(ResponderReply::text("Here's your Instagram draft."));
        let controller = controller_with(Arc::clone(&mock));
        controller.set_draft("unrelated draft").await;

        let action = QuickAction::primary("Create an Instagram post");
        let outcome = controller.submit_quick_action(&action).await;
        assert!(matches!(outcome, DispatchOutcome::Replied(_)));

        let requests = mock.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].message, "Create an Instagram post");

        let snapshot = controller.snapshot().await;
        // No operator turn is synthesized for a quick action.
        assert_eq!(snapshot.turns.len(), 1);
        assert!(snapshot.turns[0].is_assistant());
        assert_eq!(snapshot.draft, "unrelated draft");
    }

    #[tokio::test]
    async fn test_submit_clears_draft() {
        let mock = Arc::new(MockResponder::new());
        let controller = controller_with(Arc::clone(&mock));

        controller.set_draft("beach day post").await;
        controller.submit("beach day post").await;

        assert_eq!(controller.snapshot().await.draft, "");
    }

    #[tokio::test(start_paused = true)]
    async fn test_reply_without_actions_schedules_no_reveal() {
        let mock = Arc::new(MockResponder::new());
        mock.queue_ok(ResponderReply::text("Here's the post.").with_post(PostPreview {
            image: None,
            caption: "Golden hour".to_string(),
            hashtags: "#goldenhour".to_string(),
        }));
        let controller = controller_with(Arc::clone(&mock));

        controller.submit("make a post").await;

        tokio::time::advance(DELAY * 2).await;
        settle().await;
        let snapshot = controller.snapshot().await;
        assert!(snapshot.visible_turn().is_none());
        assert!(snapshot.turns[1].attached_post.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_discards_session_and_pending_reveal() {
        let mock = Arc::new(MockResponder::new());
        let controller = controller_with(Arc::clone(&mock));

        controller.submit("hello").await;
        let old_session = controller.snapshot().await.session_id;

        controller.reset().await;

        let snapshot = controller.snapshot().await;
        assert!(snapshot.turns.is_empty());
        assert_ne!(snapshot.session_id, old_session);

        // A reveal scheduled before the reset must not fire afterwards.
        tokio::time::advance(DELAY * 2).await;
        settle().await;
        assert!(controller.snapshot().await.visible_turn().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_during_flight_discards_stale_reply() {
        let mock = Arc::new(MockResponder::new().with_delay(Duration::from_secs(60)));
        let controller = Arc::new(controller_with(Arc::clone(&mock)));

        let stale = {
            let controller = Arc::clone(&controller);
            tokio::spawn(async move { controller.submit("before reset").await })
        };
        settle().await;

        controller.reset().await;

        let fresh = {
            let controller = Arc::clone(&controller);
            tokio::spawn(async move { controller.submit("after reset").await })
        };
        settle().await;

        tokio::time::advance(Duration::from_secs(61)).await;
        let stale = stale.await.unwrap();
        let fresh = fresh.await.unwrap();

        assert_eq!(stale, DispatchOutcome::Ignored(IgnoreReason::SessionReset));
        assert!(matches!(fresh, DispatchOutcome::Replied(_)));

        // Only the new session's turns survive.
        let snapshot = controller.snapshot().await;
        assert_eq!(snapshot.turns.len(), 2);
        assert_eq!(snapshot.turns[0].content, "after reset");
        assert!(snapshot.turns[1].is_assistant());
        assert!(!snapshot.pending);

        // Both calls went out (the in-flight one is never canceled),
        // each carrying its own session id.
        let requests = mock.requests();
        assert_eq!(requests.len(), 2);
        assert_ne!(requests[0].session_id, requests[1].session_id);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_during_flight_discards_stale_failure() {
        let mock = Arc::new(MockResponder::new().with_delay(Duration::from_secs(60)));
        mock.queue_err(MuseError::transport("connection reset by peer"));
        let controller = Arc::new(controller_with(Arc::clone(&mock)));

        let stale = {
            let controller = Arc::clone(&controller);
            tokio::spawn(async move { controller.submit("before reset").await })
        };
        settle().await;

        controller.reset().await;

        tokio::time::advance(Duration::from_secs(61)).await;
        let outcome = stale.await.unwrap();

        assert_eq!(outcome, DispatchOutcome::Ignored(IgnoreReason::SessionReset));

        // The stale failure must not surface in the new session.
        let snapshot = controller.snapshot().await;
        assert!(snapshot.turns.is_empty());
        assert!(snapshot.last_error.is_none());
        assert!(!snapshot.pending);
    }
}
