// Copyright (c) 2022-2023 Yuki Kishimoto
// Copyright (c) 2023-2025 Rust Nostr Developers
// Distributed under the MIT software license

//! Extension storage
//!
//! Async key-value capability used to persist keys and relay policies.

use std::fmt;
use std::sync::Arc;

use nostr::util::BoxedFuture;
use serde_json::Value;

pub mod error;
pub mod memory;

pub use self::error::StorageError;
pub use self::memory::MemoryStorage;

/// Storage key of the hex-encoded secret key
pub const KEYS_KEY: &str = "nostr_keys";
/// Storage key of the relay policy map
pub const RELAYS_KEY: &str = "nostr_relays";

#[doc(hidden)]
pub trait IntoExtensionStorage {
    fn into_extension_storage(self) -> Arc<dyn ExtensionStorage>;
}

impl IntoExtensionStorage for Arc<dyn ExtensionStorage> {
    fn into_extension_storage(self) -> Arc<dyn ExtensionStorage> {
        self
    }
}

impl<T> IntoExtensionStorage for T
where
    T: ExtensionStorage + Sized + 'static,
{
    fn into_extension_storage(self) -> Arc<dyn ExtensionStorage> {
        Arc::new(self)
    }
}

/// Extension storage
pub trait ExtensionStorage: fmt::Debug + Send + Sync {
    /// Read a value
    fn get<'a>(&'a self, key: &'a str) -> BoxedFuture<'a, Result<Option<Value>, StorageError>>;

    /// Write a value, replacing the previous one
    fn set<'a>(&'a self, key: &'a str, value: Value) -> BoxedFuture<'a, Result<(), StorageError>>;

    /// Delete a value
    fn remove<'a>(&'a self, key: &'a str) -> BoxedFuture<'a, Result<(), StorageError>>;
}
