// Copyright (c) 2022-2023 Yuki Kishimoto
// Copyright (c) 2023-2025 Rust Nostr Developers
// Distributed under the MIT software license

//! Error

use thiserror::Error;

use crate::transport::error::TransportError;

/// [`RelayConnection`](super::RelayConnection) error
#[derive(Debug, Error)]
pub enum Error {
    /// Transport error
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// Json error
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    /// Malformed relay frame
    #[error("protocol error: {0}")]
    Protocol(String),
    /// Relay not connected
    #[error("relay not connected")]
    NotConnected,
    /// Message not delivered to the socket
    #[error("message not delivered")]
    NotDelivered,
    /// Connection attempt aborted by a disconnect request
    #[error("received termination request")]
    TerminationRequest,
    /// Generic timeout
    #[error("timeout")]
    Timeout,
}

impl Error {
    #[inline]
    pub(crate) fn protocol<S>(reason: S) -> Self
    where
        S: Into<String>,
    {
        Self::Protocol(reason.into())
    }
}
