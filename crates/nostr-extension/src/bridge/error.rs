// Copyright (c) 2022-2023 Yuki Kishimoto
// Copyright (c) 2023-2025 Rust Nostr Developers
// Distributed under the MIT software license

//! Error

use thiserror::Error;

use super::message::ErrorObject;

/// [`RequestBridge`](super::RequestBridge) error
#[derive(Debug, Error)]
pub enum Error {
    /// The counterpart never responded
    #[error("request timed out: {method}")]
    RequestTimeout {
        /// Method of the request
        method: String,
    },
    /// The counterpart context is gone
    #[error("message channel closed")]
    ChannelClosed,
    /// The counterpart answered with an error
    #[error("{}", .0.message)]
    Remote(ErrorObject),
}

impl Error {
    /// NIP-07 error code
    pub fn code(&self) -> i32 {
        match self {
            Self::Remote(e) => e.code,
            Self::RequestTimeout { .. } | Self::ChannelClosed => ErrorObject::INTERNAL,
        }
    }

    /// Convert into an error object
    pub fn into_error_object(self) -> ErrorObject {
        match self {
            Self::Remote(e) => e,
            e => ErrorObject::internal(e.to_string()),
        }
    }
}
