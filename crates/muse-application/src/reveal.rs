//! Action reveal scheduling.
//!
//! An assistant turn's quick actions become interactable only after a
//! fixed delay, and any newer dispatch suppresses a still-pending reveal.
//! The scheduler owns at most one cancelable task at a time, keyed by the
//! turn id it will reveal.

use muse_core::conversation::ConversationState;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;

/// Schedules the delayed reveal of one assistant turn's quick actions.
///
/// `schedule` replaces (and cancels) whatever task was outstanding, so at
/// most one reveal can ever be pending. `supersede` cancels without
/// scheduling anything new; the dispatcher calls it at the start of every
/// dispatch and on session reset.
pub struct RevealScheduler {
    state: Arc<RwLock<ConversationState>>,
    delay: Duration,
    current: Mutex<Option<CancellationToken>>,
}

impl RevealScheduler {
    /// Creates a scheduler revealing into the given session state.
    pub fn new(state: Arc<RwLock<ConversationState>>, delay: Duration) -> Self {
        Self {
            state,
            delay,
            current: Mutex::new(None),
        }
    }

    /// Returns the configured reveal delay.
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Cancels the outstanding reveal task, if any.
    ///
    /// Callers cancel while holding the session's write lock; a timer
    /// that already fired and is waiting on that lock re-checks its token
    /// after acquiring it, so a superseded reveal can never apply late.
    pub async fn supersede(&self) {
        if let Some(token) = self.current.lock().await.take() {
            token.cancel();
        }
    }

    /// Schedules the reveal of `turn_id` after the configured delay.
    ///
    /// The delay is measured from this call, not from when the spawned
    /// task first gets polled. Any previously outstanding task is
    /// canceled first. The spawned task is a no-op when the turn no
    /// longer exists (stale timer after a session reset).
    pub async fn schedule(&self, turn_id: String) {
        let token = CancellationToken::new();
        if let Some(previous) = self.current.lock().await.replace(token.clone()) {
            previous.cancel();
        }

        let state = Arc::clone(&self.state);
        let deadline = tokio::time::Instant::now() + self.delay;

        tokio::spawn(async move {
            tokio::select! {
                () = token.cancelled() => {
                    tracing::debug!(target: "reveal", "reveal superseded (turn {})", turn_id);
                }
                () = tokio::time::sleep_until(deadline) => {
                    let mut state = state.write().await;
                    // Re-check after taking the lock: a dispatch may have
                    // superseded this reveal while the timer was firing.
                    if token.is_cancelled() {
                        tracing::debug!(target: "reveal", "reveal superseded (turn {})", turn_id);
                    } else if state.reveal_actions(&turn_id) {
                        tracing::debug!(target: "reveal", "actions revealed (turn {})", turn_id);
                    } else {
                        tracing::debug!(target: "reveal", "reveal target gone (turn {})", turn_id);
                    }
                }
            }
        });
    }
}
