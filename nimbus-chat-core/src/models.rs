//! Normalization of the model registry response
//!
//! The registry answers in several shapes depending on the upstream server.
//! They are classified once here and flattened into an ordered list of model
//! ids before anything else looks at them.

use serde_json::Value;

/// Shapes accepted from `GET /chat/models`
#[derive(Debug, Clone, PartialEq)]
pub enum ModelListing {
    /// `{ "ids": ["a", "b"] }`, ids already flattened by the server
    Ids(Vec<String>),
    /// `{ "models": { "data": [ { "id": .. } | { "name": .. } ] } }`
    Nested(Vec<Value>),
    /// `{ "models": [ "a" | { "id": .. } ] }`
    Plain(Vec<Value>),
    /// `{ "models": "a" }`
    Single(String),
    /// `{ "error": .. }`
    Error(String),
    /// Anything else
    Unrecognized,
}

/// Model ids ready for display, plus a message when the listing failed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelCatalog {
    pub models: Vec<String>,
    pub error: Option<String>,
}

impl ModelCatalog {
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            models: Vec::new(),
            error: Some(error.into()),
        }
    }

    /// First model, the default selection
    pub fn first(&self) -> Option<&str> {
        self.models.first().map(String::as_str)
    }

    pub fn contains(&self, model: &str) -> bool {
        self.models.iter().any(|m| m == model)
    }
}

impl ModelListing {
    /// Classify a decoded response body
    pub fn from_value(value: &Value) -> Self {
        if let Some(ids) = value.get("ids").and_then(Value::as_array) {
            return ModelListing::Ids(ids.iter().filter_map(value_text).collect());
        }

        if let Some(models) = value.get("models") {
            if let Some(data) = models.get("data").and_then(Value::as_array) {
                return ModelListing::Nested(data.clone());
            }
            return match models {
                Value::Array(items) => ModelListing::Plain(items.clone()),
                Value::String(single) => ModelListing::Single(single.clone()),
                _ => ModelListing::Unrecognized,
            };
        }

        if let Some(error) = value.get("error") {
            return ModelListing::Error(value_text(error).unwrap_or_else(|| error.to_string()));
        }

        ModelListing::Unrecognized
    }

    /// Flatten into an ordered list of ids
    pub fn into_catalog(self) -> ModelCatalog {
        match self {
            ModelListing::Ids(ids) => ModelCatalog {
                models: ids,
                error: None,
            },
            ModelListing::Nested(items) | ModelListing::Plain(items) => ModelCatalog {
                models: items.iter().map(entry_id).collect(),
                error: None,
            },
            ModelListing::Single(id) => ModelCatalog {
                models: vec![id],
                error: None,
            },
            ModelListing::Error(message) => ModelCatalog::failed(message),
            ModelListing::Unrecognized => ModelCatalog::failed("No models found"),
        }
    }
}

/// `id`, then `name`, then the entry itself
fn entry_id(entry: &Value) -> String {
    entry
        .get("id")
        .and_then(value_text)
        .or_else(|| entry.get("name").and_then(value_text))
        .or_else(|| value_text(entry))
        .unwrap_or_else(|| entry.to_string())
}

fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}
