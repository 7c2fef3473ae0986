//! Conversation domain module.
//!
//! This module contains the conversation session state and the turn types
//! that make it up.
//!
//! # Module Structure
//!
//! - `turn`: Turn types (`Turn`, `Speaker`, `QuickAction`, `PostPreview`)
//! - `state`: Session state store (`ConversationState`, `ConversationSnapshot`)
//!
//! # Usage
//!
//! ```ignore
//! use muse_core::conversation::{ConversationState, Turn, QuickAction};
//! ```

mod state;
mod turn;

// Re-export public API
pub use state::{ConversationSnapshot, ConversationState};
pub use turn::{ActionKind, PostPreview, QuickAction, Speaker, Turn};
