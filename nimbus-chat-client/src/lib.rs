//! HTTP backend for nimbus-chat
//!
//! Implements [`nimbus_chat_core::ChatBackend`] against the chat server's
//! `/chat/...` JSON endpoints.

pub mod http;
mod response;

pub use http::HttpChatBackend;
