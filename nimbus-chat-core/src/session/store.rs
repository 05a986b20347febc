//! Session data structures

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Title shown for sessions the store has not named yet
pub const UNTITLED_SESSION: &str = "New Chat";

/// Content recorded for a message that carried only an image
pub const IMAGE_PLACEHOLDER: &str = "[image]";

/// Author of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A chat message
///
/// Only role and content are kept; any extra fields the store returns
/// (model, timestamps, metadata) are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Message role (user, assistant)
    pub role: Role,
    /// Message content
    pub content: String,
}

impl ChatMessage {
    /// Create a new chat message
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// A session as listed by the session store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    /// Opaque session identifier
    pub session_id: String,
    /// Display title, absent until the store assigns one
    #[serde(default)]
    pub title: Option<String>,
    /// Number of stored messages
    #[serde(default, deserialize_with = "null_as_zero")]
    pub message_count: u64,
    /// Creation time
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    /// Last update time
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl SessionSummary {
    /// Title with the placeholder applied
    pub fn display_title(&self) -> &str {
        match self.title.as_deref() {
            Some(title) if !title.trim().is_empty() => title,
            _ => UNTITLED_SESSION,
        }
    }
}

/// Sort sessions most recently updated first
///
/// The sort is stable, so sessions without a timestamp keep the store's order
/// after all timestamped ones.
pub fn sort_by_recency(sessions: &mut [SessionSummary]) {
    sessions.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
}

fn null_as_zero<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<u64>::deserialize(deserializer)?.unwrap_or(0))
}

/// Accept RFC 3339 as well as naive ISO-8601 (read as UTC)
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = match Option::<String>::deserialize(deserializer)? {
        Some(raw) => raw,
        None => return Ok(None),
    };
    Ok(parse_timestamp(&raw))
}

pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// An image attached to an outgoing message, base64 encoded for the wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAttachment(String);

impl ImageAttachment {
    /// Encode raw image bytes
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(STANDARD.encode(bytes))
    }

    /// Wrap data that is already base64 encoded
    pub fn from_base64(encoded: impl Into<String>) -> Self {
        Self(encoded.into())
    }

    pub fn as_base64(&self) -> &str {
        &self.0
    }
}

/// Body sent to the chat completion endpoint
#[derive(Debug, Clone, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub message: String,
    pub image: Option<String>,
    pub history: Vec<ChatMessage>,
    pub session_id: String,
}
