//! Conversation sessions
//!
//! Wire types for sessions and messages, the events a front end renders, and
//! the manager that keeps the local conversation in step with the server.

pub mod events;
pub mod manager;
pub mod store;

pub use events::ChatEvent;
pub use manager::{RestoreOutcome, SessionManager};
pub use store::{
    ChatMessage, CompletionRequest, ImageAttachment, Role, SessionSummary, IMAGE_PLACEHOLDER,
    UNTITLED_SESSION,
};
