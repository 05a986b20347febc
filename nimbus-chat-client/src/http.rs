//! Chat server HTTP client

use async_trait::async_trait;
use nimbus_chat_core::config::ServerConfig;
use nimbus_chat_core::session::{ChatMessage, CompletionRequest, SessionSummary};
use nimbus_chat_core::{ApiError, ApiResult, ChatBackend};
use reqwest::{header, Client, Method, RequestBuilder};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

use crate::response::{self, RawResponse};

/// [`ChatBackend`] over the chat server's JSON endpoints
///
/// Cookies set by the server are kept for later calls, and the configured
/// session cookie and extra headers go out with every request.
pub struct HttpChatBackend {
    client: Client,
    base_url: String,
    session_cookie: Option<String>,
    extra_headers: HashMap<String, String>,
}

impl HttpChatBackend {
    /// Create a client for `base_url` with default settings
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::build(base_url.into(), None, HashMap::new(), None)
    }

    /// Create a client from the `server` config section
    pub fn from_config(config: &ServerConfig) -> Self {
        Self::build(
            config.base_url.clone(),
            config.session_cookie.clone(),
            config.extra_headers.clone(),
            config.timeout_secs.map(Duration::from_secs),
        )
    }

    fn build(
        base_url: String,
        session_cookie: Option<String>,
        extra_headers: HashMap<String, String>,
        timeout: Option<Duration>,
    ) -> Self {
        let mut builder = Client::builder().cookie_store(true);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Self {
            client: build_client(builder),
            base_url: base_url.trim_end_matches('/').to_string(),
            session_cookie: session_cookie.filter(|c| !c.trim().is_empty()),
            extra_headers,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn session_path(session_id: &str) -> String {
        format!("/chat/sessions/{}", urlencoding::encode(session_id))
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let mut req_builder = self.client.request(method, url);

        if let Some(cookie) = &self.session_cookie {
            req_builder = req_builder.header(header::COOKIE, cookie);
        }
        for (key, value) in &self.extra_headers {
            req_builder = req_builder.header(key, value);
        }

        req_builder
    }

    /// Send and collect status and body; transport failures become `Network`
    async fn execute(&self, req_builder: RequestBuilder) -> ApiResult<RawResponse> {
        let response = req_builder
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;
        debug!("HTTP {} ({} bytes)", status, body.len());
        Ok(RawResponse { status, body })
    }

    async fn call(&self, req_builder: RequestBuilder) -> ApiResult<Value> {
        self.execute(req_builder).await?.into_json()
    }
}

/// Build `builder`, falling back to a plain client if the settings are rejected
fn build_client(builder: reqwest::ClientBuilder) -> Client {
    builder.build().unwrap_or_else(|e| {
        warn!(
            "Failed to build HTTP client ({}); continuing without cookie store or timeout",
            e
        );
        Client::new()
    })
}

#[async_trait]
impl ChatBackend for HttpChatBackend {
    async fn list_models(&self) -> ApiResult<Value> {
        debug!("GET /chat/models");
        self.call(self.request(Method::GET, "/chat/models")).await
    }

    async fn create_session(&self) -> ApiResult<String> {
        debug!("POST /chat/sessions");
        let value = self
            .call(
                self.request(Method::POST, "/chat/sessions")
                    .header(header::CONTENT_TYPE, "application/json"),
            )
            .await?;
        response::session_id(&value)
    }

    async fn list_sessions(&self) -> ApiResult<Vec<SessionSummary>> {
        debug!("GET /chat/sessions");
        let value = self
            .call(self.request(Method::GET, "/chat/sessions"))
            .await?;
        response::sessions(value)
    }

    async fn get_session(&self, session_id: &str) -> ApiResult<Vec<ChatMessage>> {
        let path = Self::session_path(session_id);
        debug!("GET {}", path);
        let value = self.call(self.request(Method::GET, &path)).await?;
        response::messages(value)
    }

    async fn delete_session(&self, session_id: &str) -> ApiResult<()> {
        let path = Self::session_path(session_id);
        debug!("DELETE {}", path);
        self.call(self.request(Method::DELETE, &path)).await?;
        Ok(())
    }

    async fn send_message(&self, request: &CompletionRequest) -> ApiResult<String> {
        debug!(
            "POST /chat/message (session {}, model {})",
            request.session_id, request.model
        );
        let value = self
            .call(self.request(Method::POST, "/chat/message").json(request))
            .await?;
        response::reply_text(&value)
    }
}
