pub mod config;
pub mod conversation;
pub mod error;
pub mod responder;

// Re-export common error type
pub use error::MuseError;
