//! Events published by the session manager

use super::store::ChatMessage;

/// Something a front end should render
///
/// The manager never touches a UI; it publishes these and lets the
/// subscriber decide how to show them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEvent {
    /// A message was added to the conversation
    MessageAppended(ChatMessage),
    /// The conversation was replaced by a loaded session's history
    HistoryReplaced {
        session_id: String,
        messages: Vec<ChatMessage>,
    },
    /// The conversation view was emptied
    ConversationCleared,
    /// The current session changed (or was dropped)
    SessionChanged(Option<String>),
    /// The server-side session list changed and should be re-fetched
    SessionsChanged,
    /// A failure the user should see in the conversation view
    Notice(String),
}
