// Copyright (c) 2022-2023 Yuki Kishimoto
// Copyright (c) 2023-2025 Rust Nostr Developers
// Distributed under the MIT software license

//! Event template

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Event submitted to `signEvent`
///
/// `id`, `pubkey` and `sig` are accepted but ignored: the signer sets them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventTemplate {
    /// Event ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Author
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pubkey: Option<String>,
    /// Unix timestamp (seconds)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<u64>,
    /// Kind
    pub kind: u16,
    /// Tags
    pub tags: Vec<Vec<String>>,
    /// Content
    pub content: String,
    /// Signature
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sig: Option<String>,
}

impl EventTemplate {
    /// New template
    pub fn new<S>(kind: u16, tags: Vec<Vec<String>>, content: S) -> Self
    where
        S: Into<String>,
    {
        Self {
            id: None,
            pubkey: None,
            created_at: None,
            kind,
            tags,
            content: content.into(),
            sig: None,
        }
    }

    /// Set `created_at`
    #[inline]
    pub fn created_at(mut self, created_at: u64) -> Self {
        self.created_at = Some(created_at);
        self
    }

    /// Validate the shape of an untyped event.
    ///
    /// `kind` must be a number, `tags` an array of string arrays and `content` a string.
    pub fn from_value(value: &Value) -> Result<Self, String> {
        let object = value
            .as_object()
            .ok_or_else(|| String::from("event is not an object"))?;

        match object.get("kind") {
            Some(Value::Number(..)) => {}
            _ => return Err(String::from("kind must be a number")),
        }

        match object.get("tags") {
            Some(Value::Array(tags)) => {
                for tag in tags.iter() {
                    match tag {
                        Value::Array(items) if items.iter().all(Value::is_string) => {}
                        _ => return Err(String::from("tags must be an array of string arrays")),
                    }
                }
            }
            _ => return Err(String::from("tags must be an array of arrays")),
        }

        match object.get("content") {
            Some(Value::String(..)) => {}
            _ => return Err(String::from("content must be a string")),
        }

        match object.get("created_at") {
            None | Some(Value::Null) | Some(Value::Number(..)) => {}
            _ => return Err(String::from("created_at must be a number")),
        }

        serde_json::from_value(value.clone()).map_err(|e| e.to_string())
    }
}
