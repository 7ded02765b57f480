// Copyright (c) 2022-2023 Yuki Kishimoto
// Copyright (c) 2023-2025 Rust Nostr Developers
// Distributed under the MIT software license

//! Relay notifications

use nostr::RelayUrl;
use serde_json::Value;

/// Relay notification
///
/// Delivered to every listening UI context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayNotification {
    /// Socket opened
    Connected {
        /// Relay url
        relay_url: RelayUrl,
    },
    /// Socket closed
    Disconnected {
        /// Relay url
        relay_url: RelayUrl,
        /// Close code
        code: u16,
        /// Close reason
        reason: String,
    },
    /// Received a relay message that isn't interpreted here (`EVENT`, `EOSE`, `NOTICE`, `OK`, ...)
    Message {
        /// Relay url
        relay_url: RelayUrl,
        /// Raw message array
        message: Vec<Value>,
    },
    /// Transport error, malformed frame or undelivered message
    Error {
        /// Relay url
        relay_url: RelayUrl,
        /// Error description
        error: String,
    },
}

impl RelayNotification {
    /// Relay url this notification is about
    pub fn relay_url(&self) -> &RelayUrl {
        match self {
            Self::Connected { relay_url }
            | Self::Disconnected { relay_url, .. }
            | Self::Message { relay_url, .. }
            | Self::Error { relay_url, .. } => relay_url,
        }
    }
}
