// Copyright (c) 2022-2023 Yuki Kishimoto
// Copyright (c) 2023-2025 Rust Nostr Developers
// Distributed under the MIT software license

//! Error

use thiserror::Error;

use crate::bridge::{self, ErrorObject};

/// [`Nip07Provider`](super::Nip07Provider) error
#[derive(Debug, Error)]
pub enum Error {
    /// Bridge error (timeout, closed channel or error returned by the extension)
    #[error(transparent)]
    Bridge(#[from] bridge::Error),
    /// Json error
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    /// Malformed event passed to `signEvent`
    #[error("invalid event: {0}")]
    InvalidEvent(String),
    /// Malformed params
    #[error("invalid params: {0}")]
    InvalidParams(String),
    /// The extension returned an event with an invalid signature
    #[error("invalid signed event: {0}")]
    InvalidSignature(String),
}

impl Error {
    /// NIP-07 error code
    pub fn code(&self) -> i32 {
        match self {
            Self::Bridge(e) => e.code(),
            Self::InvalidEvent(..) | Self::InvalidParams(..) => ErrorObject::HANDLER,
            Self::Json(..) | Self::InvalidSignature(..) => ErrorObject::INTERNAL,
        }
    }

    /// Check if the extension has no private key yet
    #[inline]
    pub fn is_no_private_key(&self) -> bool {
        self.code() == ErrorObject::NO_PRIVATE_KEY
    }

    /// Check if the request timed out
    #[inline]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Bridge(bridge::Error::RequestTimeout { .. }))
    }
}
