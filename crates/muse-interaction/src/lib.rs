//! Responder implementations.
//!
//! Two implementations of the core's `Responder` trait:
//! - [`WebhookResponder`]: posts to the hosted workflow endpoint.
//! - [`ScriptedResponder`]: canned in-process flows for development and
//!   integration tests.

pub mod scripted;
pub mod webhook;

pub use scripted::ScriptedResponder;
pub use webhook::WebhookResponder;
