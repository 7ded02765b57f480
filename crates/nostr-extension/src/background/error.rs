// Copyright (c) 2022-2023 Yuki Kishimoto
// Copyright (c) 2023-2025 Rust Nostr Developers
// Distributed under the MIT software license

//! Error

use nostr::SignerError;
use thiserror::Error;

use crate::auth;
use crate::bridge::ErrorObject;
use crate::provider::UnsupportedMethod;
use crate::shared::SharedStateError;
use crate::storage::StorageError;

/// [`Background`](super::Background) error
#[derive(Debug, Error)]
pub enum Error {
    /// Shared state error (i.e. no private key)
    #[error(transparent)]
    SharedState(#[from] SharedStateError),
    /// Storage error
    #[error(transparent)]
    Storage(#[from] StorageError),
    /// Json error
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    /// Signer error
    #[error(transparent)]
    Signer(#[from] SignerError),
    /// Authentication error
    #[error(transparent)]
    Auth(#[from] auth::Error),
    /// Unsupported method
    #[error(transparent)]
    UnsupportedMethod(#[from] UnsupportedMethod),
    /// Malformed event
    #[error("invalid event: {0}")]
    InvalidEvent(String),
    /// Malformed params
    #[error("invalid params: {0}")]
    InvalidParams(String),
    /// Invalid secret key
    #[error("invalid key: {0}")]
    Keys(String),
    /// Invalid relay url
    #[error("invalid relay url: {0}")]
    RelayUrl(String),
}

impl Error {
    /// Check if the error is caused by a missing private key
    pub fn is_no_private_key(&self) -> bool {
        matches!(
            self,
            Self::SharedState(SharedStateError::NoPrivateKey)
                | Self::Auth(auth::Error::SharedState(SharedStateError::NoPrivateKey))
        )
    }

    /// Convert to the NIP-07 error object
    pub fn to_error_object(&self) -> ErrorObject {
        let code: i32 = if self.is_no_private_key() {
            ErrorObject::NO_PRIVATE_KEY
        } else if let Self::UnsupportedMethod(..) = self {
            ErrorObject::UNSUPPORTED_METHOD
        } else {
            ErrorObject::HANDLER
        };

        ErrorObject::new(code, self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            Error::SharedState(SharedStateError::NoPrivateKey)
                .to_error_object()
                .code,
            4
        );
        assert_eq!(
            Error::UnsupportedMethod(UnsupportedMethod(String::from("foo")))
                .to_error_object(),
            ErrorObject::new(3, "unsupported method: foo")
        );
        assert_eq!(
            Error::InvalidParams(String::from("missing pubkey"))
                .to_error_object()
                .code,
            2
        );
    }
}
