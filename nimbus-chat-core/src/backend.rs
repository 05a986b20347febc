//! Seam between the session manager and the remote chat services

use async_trait::async_trait;
use serde_json::Value;

use crate::error::ApiResult;
use crate::session::{ChatMessage, CompletionRequest, SessionSummary};

/// Remote model registry, session store and completion endpoint
///
/// Implementations classify every failure into [`crate::ApiError`] and never
/// panic on unexpected payloads.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Raw body of the model registry; normalized by [`crate::models::ModelListing`]
    async fn list_models(&self) -> ApiResult<Value>;

    /// Create a session and return its id
    async fn create_session(&self) -> ApiResult<String>;

    /// All sessions visible to the caller
    async fn list_sessions(&self) -> ApiResult<Vec<SessionSummary>>;

    /// Full message history of one session, oldest first
    async fn get_session(&self, session_id: &str) -> ApiResult<Vec<ChatMessage>>;

    async fn delete_session(&self, session_id: &str) -> ApiResult<()>;

    /// Send a message and return the generated reply text
    async fn send_message(&self, request: &CompletionRequest) -> ApiResult<String>;
}
