// Copyright (c) 2022-2023 Yuki Kishimoto
// Copyright (c) 2023-2025 Rust Nostr Developers
// Distributed under the MIT software license

//! Storage error

use thiserror::Error;

/// Storage error
#[derive(Debug, Error)]
pub enum StorageError {
    /// An error happened in the underlying storage backend.
    #[error("{0}")]
    Backend(Box<dyn std::error::Error + Send + Sync>),
    /// Stored value has an unexpected shape
    #[error("invalid value for key '{key}': {reason}")]
    InvalidValue {
        /// Storage key
        key: String,
        /// Why the value was rejected
        reason: String,
    },
}

impl StorageError {
    /// Create a new backend error
    ///
    /// Shorthand for `Error::Backend(Box::new(error))`.
    #[inline]
    pub fn backend<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Backend(Box::new(error))
    }

    pub(crate) fn invalid_value<K, R>(key: K, reason: R) -> Self
    where
        K: Into<String>,
        R: ToString,
    {
        Self::InvalidValue {
            key: key.into(),
            reason: reason.to_string(),
        }
    }
}
