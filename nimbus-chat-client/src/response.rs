//! Classification of chat server responses
//!
//! Status and body are checked independently: a non-2xx status is an HTTP
//! error whatever the body says, and a 2xx body carrying `error` is an
//! application error.

use nimbus_chat_core::session::{ChatMessage, SessionSummary};
use nimbus_chat_core::{ApiError, ApiResult};
use serde_json::Value;

/// Status and raw body of a completed request
#[derive(Debug)]
pub(crate) struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    /// Decode the body and reject error responses
    ///
    /// An empty 2xx body decodes to `Value::Null`.
    pub fn into_json(self) -> ApiResult<Value> {
        let trimmed = self.body.trim();
        let parsed = if trimmed.is_empty() {
            Ok(Value::Null)
        } else {
            serde_json::from_str::<Value>(trimmed)
        };

        if !(200..300).contains(&self.status) {
            return Err(ApiError::Http {
                status: self.status,
                message: parsed.ok().as_ref().and_then(error_field),
            });
        }

        let value = parsed.map_err(|e| ApiError::Malformed(e.to_string()))?;
        if let Some(message) = error_field(&value) {
            return Err(ApiError::Application(message));
        }
        Ok(value)
    }
}

/// The `error` field, when present and not null
fn error_field(value: &Value) -> Option<String> {
    match value.get("error")? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

pub(crate) fn session_id(value: &Value) -> ApiResult<String> {
    match value.get("session_id") {
        Some(Value::String(id)) if !id.is_empty() => Ok(id.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        _ => Err(ApiError::Malformed(
            "session response has no session_id".to_string(),
        )),
    }
}

pub(crate) fn sessions(value: Value) -> ApiResult<Vec<SessionSummary>> {
    list_field(value, "sessions")
}

pub(crate) fn messages(value: Value) -> ApiResult<Vec<ChatMessage>> {
    list_field(value, "messages")
}

/// A missing or null list reads as empty
fn list_field<T: serde::de::DeserializeOwned>(mut value: Value, field: &str) -> ApiResult<Vec<T>> {
    match value.get_mut(field).map(Value::take) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(list) => serde_json::from_value(list)
            .map_err(|e| ApiError::Malformed(format!("invalid {}: {}", field, e))),
    }
}

/// Reply text from `{output}` or an OpenAI-style `{choices: [{message: {content}}]}`
///
/// Any other object is returned serialized so the user still sees something.
pub(crate) fn reply_text(value: &Value) -> ApiResult<String> {
    if !value.is_object() {
        return Err(ApiError::Malformed(
            "completion response is not an object".to_string(),
        ));
    }

    match value.get("output") {
        Some(Value::String(output)) if !output.is_empty() => return Ok(output.clone()),
        Some(Value::Null) | Some(Value::String(_)) | None => {}
        Some(other) => return Ok(other.to_string()),
    }

    let content = value
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"));
    match content {
        Some(Value::String(text)) => Ok(text.clone()),
        Some(Value::Null) | None => Ok(value.to_string()),
        Some(other) => Ok(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nimbus_chat_core::session::Role;
    use serde_json::json;

    fn raw(status: u16, body: &str) -> RawResponse {
        RawResponse {
            status,
            body: body.to_string(),
        }
    }

    #[test]
    fn test_non_success_status_with_error_body() {
        let err = raw(404, r#"{"error": "session not found or unauthorized"}"#)
            .into_json()
            .unwrap_err();
        assert_eq!(
            err,
            ApiError::Http {
                status: 404,
                message: Some("session not found or unauthorized".into())
            }
        );
    }

    #[test]
    fn test_non_success_status_with_html_body() {
        let err = raw(502, "<html>Bad Gateway</html>").into_json().unwrap_err();
        assert_eq!(
            err,
            ApiError::Http {
                status: 502,
                message: None
            }
        );
    }

    #[test]
    fn test_success_with_error_field_is_application_error() {
        let err = raw(200, r#"{"error": "model and message required"}"#)
            .into_json()
            .unwrap_err();
        assert_eq!(err, ApiError::Application("model and message required".into()));
    }

    #[test]
    fn test_success_with_null_error_is_ok() {
        let value = raw(200, r#"{"error": null, "output": "hi"}"#).into_json().unwrap();
        assert_eq!(reply_text(&value).unwrap(), "hi");
    }

    #[test]
    fn test_success_with_garbage_is_malformed() {
        let err = raw(200, "OK").into_json().unwrap_err();
        assert!(matches!(err, ApiError::Malformed(_)));
    }

    #[test]
    fn test_empty_success_body_is_null() {
        assert_eq!(raw(204, "").into_json().unwrap(), Value::Null);
    }

    #[test]
    fn test_session_id_extraction() {
        assert_eq!(session_id(&json!({"session_id": "abc"})).unwrap(), "abc");
        assert_eq!(session_id(&json!({"session_id": 42})).unwrap(), "42");
        assert!(matches!(
            session_id(&json!({})).unwrap_err(),
            ApiError::Malformed(_)
        ));
    }

    #[test]
    fn test_missing_lists_read_as_empty() {
        assert!(sessions(json!({})).unwrap().is_empty());
        assert!(messages(json!({"messages": null})).unwrap().is_empty());
    }

    #[test]
    fn test_messages_keep_order() {
        let parsed = messages(json!({"messages": [
            {"role": "user", "content": "a", "model": "m", "created_at": null, "metadata": {}},
            {"role": "assistant", "content": "b"}
        ]}))
        .unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].role, Role::User);
        assert_eq!(parsed[1].content, "b");
    }

    #[test]
    fn test_invalid_message_role_is_malformed() {
        let err = messages(json!({"messages": [{"role": "wizard", "content": "x"}]})).unwrap_err();
        assert!(matches!(err, ApiError::Malformed(_)));
    }

    #[test]
    fn test_reply_shapes() {
        assert_eq!(reply_text(&json!({"output": "Hello"})).unwrap(), "Hello");
        assert_eq!(
            reply_text(&json!({"choices": [{"message": {"role": "assistant", "content": "Hi"}}]}))
                .unwrap(),
            "Hi"
        );
        assert_eq!(
            reply_text(&json!({"unexpected": true})).unwrap(),
            r#"{"unexpected":true}"#
        );
        assert!(reply_text(&json!("just a string")).is_err());
    }
}
