use mockito::{Matcher, Server};
use nimbus_chat_client::HttpChatBackend;
use nimbus_chat_core::config::ServerConfig;
use nimbus_chat_core::session::{ChatMessage, CompletionRequest, RestoreOutcome, SessionManager};
use nimbus_chat_core::storage::{KeyValueStore, MemoryStore, CURRENT_SESSION_KEY};
use nimbus_chat_core::{ApiError, ChatBackend};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;

fn json_body(value: serde_json::Value) -> String {
    value.to_string()
}

fn completion(session_id: &str) -> CompletionRequest {
    CompletionRequest {
        model: "llama3:latest".to_string(),
        message: "Hello".to_string(),
        image: None,
        history: vec![ChatMessage::user("Hello")],
        session_id: session_id.to_string(),
    }
}

#[tokio::test]
async fn create_session_returns_id_and_sends_credentials() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/chat/sessions")
        .match_header("cookie", "session=abc123")
        .match_header("x-requested-with", "nimbus-chat")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json_body(json!({"session_id": "6f1c"})))
        .create_async()
        .await;

    let mut extra_headers = HashMap::new();
    extra_headers.insert("X-Requested-With".to_string(), "nimbus-chat".to_string());
    let backend = HttpChatBackend::from_config(&ServerConfig {
        base_url: server.url(),
        session_cookie: Some("session=abc123".to_string()),
        extra_headers,
        timeout_secs: Some(5),
    });

    assert_eq!(backend.create_session().await.unwrap(), "6f1c");
    mock.assert_async().await;
}

#[tokio::test]
async fn create_session_error_payload_is_application_error() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/chat/sessions")
        .with_status(200)
        .with_body(json_body(json!({"error": "database unavailable"})))
        .create_async()
        .await;

    let backend = HttpChatBackend::new(server.url());
    assert_eq!(
        backend.create_session().await.unwrap_err(),
        ApiError::Application("database unavailable".to_string())
    );
}

#[tokio::test]
async fn unauthenticated_is_http_error() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/chat/sessions")
        .with_status(401)
        .with_body(json_body(json!({"error": "unauthenticated"})))
        .create_async()
        .await;

    let backend = HttpChatBackend::new(server.url());
    assert_eq!(
        backend.list_sessions().await.unwrap_err(),
        ApiError::Http {
            status: 401,
            message: Some("unauthenticated".to_string())
        }
    );
}

#[tokio::test]
async fn list_sessions_parses_store_rows() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/chat/sessions")
        .with_status(200)
        .with_body(json_body(json!({"sessions": [
            {
                "session_id": "b",
                "title": "Rust questions",
                "created_at": "2024-05-01T09:00:00",
                "updated_at": "2024-05-02T10:30:00.250000",
                "message_count": 4
            },
            {
                "session_id": "a",
                "title": null,
                "created_at": null,
                "updated_at": null,
                "message_count": null
            }
        ]})))
        .create_async()
        .await;

    let backend = HttpChatBackend::new(server.url());
    let sessions = backend.list_sessions().await.unwrap();

    assert_eq!(sessions.len(), 2);
    assert_eq!(sessions[0].display_title(), "Rust questions");
    assert_eq!(sessions[0].message_count, 4);
    assert!(sessions[0].updated_at.is_some());
    assert_eq!(sessions[1].display_title(), "New Chat");
    assert_eq!(sessions[1].message_count, 0);
}

#[tokio::test]
async fn get_session_escapes_id_and_returns_messages() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/chat/sessions/a%2Fb")
        .with_status(200)
        .with_body(json_body(json!({"messages": [
            {"role": "user", "content": "Hi", "model": "llama3", "created_at": "2024-05-01T09:00:00", "metadata": null},
            {"role": "assistant", "content": "Hello!", "model": "llama3", "created_at": "2024-05-01T09:00:01", "metadata": null}
        ]})))
        .create_async()
        .await;

    let backend = HttpChatBackend::new(server.url());
    let messages = backend.get_session("a/b").await.unwrap();

    assert_eq!(
        messages,
        vec![ChatMessage::user("Hi"), ChatMessage::assistant("Hello!")]
    );
}

#[tokio::test]
async fn delete_session_accepts_empty_body() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("DELETE", "/chat/sessions/abc")
        .with_status(204)
        .create_async()
        .await;

    let backend = HttpChatBackend::new(server.url());
    backend.delete_session("abc").await.unwrap();
    mock.assert_async().await;
}

#[tokio::test]
async fn send_message_posts_full_payload() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/chat/message")
        .match_header("content-type", "application/json")
        .match_body(Matcher::Json(json!({
            "model": "llama3:latest",
            "message": "Hello",
            "image": null,
            "history": [{"role": "user", "content": "Hello"}],
            "session_id": "s1"
        })))
        .with_status(200)
        .with_body(json_body(json!({"output": "Hi there!"})))
        .create_async()
        .await;

    let backend = HttpChatBackend::new(server.url());
    assert_eq!(
        backend.send_message(&completion("s1")).await.unwrap(),
        "Hi there!"
    );
    mock.assert_async().await;
}

#[tokio::test]
async fn send_message_reads_openai_style_reply() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/chat/message")
        .with_status(200)
        .with_body(json_body(json!({
            "choices": [{"index": 0, "message": {"role": "assistant", "content": "From choices"}}]
        })))
        .create_async()
        .await;

    let backend = HttpChatBackend::new(server.url());
    assert_eq!(
        backend.send_message(&completion("s1")).await.unwrap(),
        "From choices"
    );
}

#[tokio::test]
async fn send_message_distinguishes_failure_kinds() {
    let mut server = Server::new_async().await;
    let backend = HttpChatBackend::new(server.url());

    let bad_gateway = server
        .mock("POST", "/chat/message")
        .with_status(502)
        .with_body(json_body(json!({"error": "upstream timeout", "detail": null})))
        .create_async()
        .await;
    assert_eq!(
        backend.send_message(&completion("s1")).await.unwrap_err(),
        ApiError::Http {
            status: 502,
            message: Some("upstream timeout".to_string())
        }
    );
    bad_gateway.remove_async().await;

    let not_json = server
        .mock("POST", "/chat/message")
        .with_status(200)
        .with_body("<html>proxy login</html>")
        .create_async()
        .await;
    assert!(matches!(
        backend.send_message(&completion("s1")).await.unwrap_err(),
        ApiError::Malformed(_)
    ));
    not_json.remove_async().await;

    server
        .mock("POST", "/chat/message")
        .with_status(400)
        .with_body("")
        .create_async()
        .await;
    assert_eq!(
        backend.send_message(&completion("s1")).await.unwrap_err(),
        ApiError::Http {
            status: 400,
            message: None
        }
    );
}

#[tokio::test]
async fn unreachable_server_is_network_failure() {
    let backend = HttpChatBackend::new("http://127.0.0.1:1");
    assert!(matches!(
        backend.list_sessions().await.unwrap_err(),
        ApiError::Network(_)
    ));
}

#[tokio::test]
async fn list_models_returns_raw_body() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/chat/models")
        .with_status(200)
        .with_body(json_body(json!({
            "models": {"object": "list", "data": [{"id": "llama3:latest"}]},
            "ids": ["llama3:latest"]
        })))
        .create_async()
        .await;

    let backend = HttpChatBackend::new(server.url());
    let body = backend.list_models().await.unwrap();
    assert_eq!(body["ids"][0], "llama3:latest");
}

#[tokio::test]
async fn manager_replaces_stale_cached_session() {
    let mut server = Server::new_async().await;
    let stale = server
        .mock("GET", "/chat/sessions/stale")
        .with_status(404)
        .with_body(json_body(json!({"error": "session not found or unauthorized"})))
        .create_async()
        .await;
    let create = server
        .mock("POST", "/chat/sessions")
        .with_status(200)
        .with_body(json_body(json!({"session_id": "fresh"})))
        .expect(1)
        .create_async()
        .await;

    let store = Arc::new(MemoryStore::new());
    store.set(CURRENT_SESSION_KEY, "stale").unwrap();
    let manager = SessionManager::new(Arc::new(HttpChatBackend::new(server.url())), store.clone());

    let outcome = manager.restore_on_load().await.unwrap();

    assert_eq!(outcome, RestoreOutcome::Created("fresh".to_string()));
    assert_eq!(store.get(CURRENT_SESSION_KEY).as_deref(), Some("fresh"));
    stale.assert_async().await;
    create.assert_async().await;
}

#[tokio::test]
async fn manager_send_creates_session_then_completes() {
    let mut server = Server::new_async().await;
    let create = server
        .mock("POST", "/chat/sessions")
        .with_status(200)
        .with_body(json_body(json!({"session_id": "s42"})))
        .expect(1)
        .create_async()
        .await;
    let send = server
        .mock("POST", "/chat/message")
        .match_body(Matcher::PartialJson(json!({"session_id": "s42", "message": "Hello"})))
        .with_status(200)
        .with_body(json_body(json!({"output": "Hi!"})))
        .expect(1)
        .create_async()
        .await;

    let manager = SessionManager::new(
        Arc::new(HttpChatBackend::new(server.url())),
        Arc::new(MemoryStore::new()),
    )
    .with_model(Some("llama3:latest".to_string()));

    assert_eq!(manager.send_message("Hello", None).await.unwrap(), "Hi!");
    assert_eq!(manager.history().len(), 2);
    create.assert_async().await;
    send.assert_async().await;
}
