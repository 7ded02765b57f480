// Copyright (c) 2022-2023 Yuki Kishimoto
// Copyright (c) 2023-2025 Rust Nostr Developers
// Distributed under the MIT software license

//! Cross-context messages

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// NIP-07 error object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorObject {
    /// Error code
    pub code: i32,
    /// Human-readable message
    pub message: String,
}

impl fmt::Display for ErrorObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code {})", self.message, self.code)
    }
}

impl std::error::Error for ErrorObject {}

impl ErrorObject {
    /// Unknown or internal error
    pub const INTERNAL: i32 = -1;
    /// Error raised by the request handler
    pub const HANDLER: i32 = 2;
    /// Unsupported method
    pub const UNSUPPORTED_METHOD: i32 = 3;
    /// No private key available
    pub const NO_PRIVATE_KEY: i32 = 4;

    /// Construct a new error object
    pub fn new<S>(code: i32, message: S) -> Self
    where
        S: Into<String>,
    {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Internal error (`-1`)
    #[inline]
    pub fn internal<S>(message: S) -> Self
    where
        S: Into<String>,
    {
        Self::new(Self::INTERNAL, message)
    }
}

/// Request envelope: `{type, payload, id}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestEnvelope {
    /// Method
    #[serde(rename = "type")]
    pub method: String,
    /// Params
    #[serde(default)]
    pub payload: Value,
    /// Correlation ID
    pub id: Uuid,
}

impl RequestEnvelope {
    /// New request with a fresh correlation ID
    pub fn new<S>(method: S, payload: Value) -> Self
    where
        S: Into<String>,
    {
        Self {
            method: method.into(),
            payload,
            id: Uuid::new_v4(),
        }
    }
}

/// Response envelope: `{id, result?, error?}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    /// Correlation ID of the request
    pub id: Uuid,
    /// Result
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Error
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorObject>,
}

impl ResponseEnvelope {
    /// Successful response
    #[inline]
    pub fn ok(id: Uuid, result: Value) -> Self {
        Self {
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Error response
    #[inline]
    pub fn err(id: Uuid, error: ErrorObject) -> Self {
        Self {
            id,
            result: None,
            error: Some(error),
        }
    }

    /// Convert to result
    pub fn into_result(self) -> Result<Value, ErrorObject> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.result.unwrap_or(Value::Null)),
        }
    }
}

/// Kind of unsolicited notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BroadcastKind {
    /// A relay sent a challenge that can't be answered automatically
    AuthNeeded,
    /// Authentication to a relay succeeded
    Authenticated,
    /// Authentication to a relay failed
    AuthenticationFailed,
}

/// Broadcast envelope: `{target: "broadcast", type, payload}`
///
/// Carries no correlation ID and is never awaited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroadcastEnvelope {
    /// Always `broadcast`
    pub target: String,
    /// Notification kind
    #[serde(rename = "type")]
    pub kind: BroadcastKind,
    /// Payload
    pub payload: Value,
}

impl BroadcastEnvelope {
    /// Target of every broadcast envelope
    pub const TARGET: &'static str = "broadcast";

    /// New broadcast
    pub fn new(kind: BroadcastKind, payload: Value) -> Self {
        Self {
            target: Self::TARGET.to_string(),
            kind,
            payload,
        }
    }
}
