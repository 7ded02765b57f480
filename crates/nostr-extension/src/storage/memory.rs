// Copyright (c) 2022-2023 Yuki Kishimoto
// Copyright (c) 2023-2025 Rust Nostr Developers
// Distributed under the MIT software license

//! Memory storage

use std::collections::HashMap;
use std::sync::Arc;

use nostr::util::BoxedFuture;
use serde_json::Value;
use tokio::sync::RwLock;

use super::{ExtensionStorage, StorageError};

/// In-memory storage
///
/// Values are lost when dropped.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    values: Arc<RwLock<HashMap<String, Value>>>,
    writes: Arc<RwLock<usize>>,
}

impl MemoryStorage {
    /// New empty storage
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `set` calls served so far
    pub async fn writes(&self) -> usize {
        *self.writes.read().await
    }
}

impl ExtensionStorage for MemoryStorage {
    fn get<'a>(&'a self, key: &'a str) -> BoxedFuture<'a, Result<Option<Value>, StorageError>> {
        Box::pin(async move {
            let values = self.values.read().await;
            Ok(values.get(key).cloned())
        })
    }

    fn set<'a>(&'a self, key: &'a str, value: Value) -> BoxedFuture<'a, Result<(), StorageError>> {
        Box::pin(async move {
            let mut values = self.values.write().await;
            values.insert(key.to_string(), value);

            let mut writes = self.writes.write().await;
            *writes += 1;

            Ok(())
        })
    }

    fn remove<'a>(&'a self, key: &'a str) -> BoxedFuture<'a, Result<(), StorageError>> {
        Box::pin(async move {
            let mut values = self.values.write().await;
            values.remove(key);
            Ok(())
        })
    }
}
