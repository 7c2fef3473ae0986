//! Application layer for Muse.
//!
//! This crate provides the conversation controller that coordinates
//! between the domain state, the responder boundary, and the delayed
//! quick-action reveal.

pub mod controller;
pub mod reveal;

pub use controller::{
    ConversationController, DispatchOutcome, IgnoreReason, DISPATCH_FAILURE_NOTICE,
};
pub use reveal::RevealScheduler;
