// Copyright (c) 2022-2023 Yuki Kishimoto
// Copyright (c) 2023-2025 Rust Nostr Developers
// Distributed under the MIT software license

//! Relay policies

use std::collections::BTreeMap;

use nostr::RelayUrl;
use serde::{Deserialize, Serialize};

use super::Error;
use crate::storage::{ExtensionStorage, StorageError, RELAYS_KEY};

/// Read/write policy of a relay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RelayPolicy {
    /// Read from the relay
    pub read: bool,
    /// Write to the relay
    pub write: bool,
}

impl Default for RelayPolicy {
    fn default() -> Self {
        Self {
            read: true,
            write: true,
        }
    }
}

/// Relay url -> policy
pub type RelayPolicies = BTreeMap<String, RelayPolicy>;

/// Read the stored policies.
///
/// If nothing is stored yet, the default relay is stored and returned: this writes at most once.
pub(super) async fn get_or_init(
    storage: &dyn ExtensionStorage,
    default_relay: &RelayUrl,
) -> Result<RelayPolicies, Error> {
    if let Some(value) = storage.get(RELAYS_KEY).await? {
        return serde_json::from_value(value)
            .map_err(|e| Error::Storage(StorageError::invalid_value(RELAYS_KEY, e)));
    }

    let mut relays: RelayPolicies = BTreeMap::new();
    relays.insert(default_relay.as_str().to_string(), RelayPolicy::default());

    storage
        .set(RELAYS_KEY, serde_json::to_value(&relays)?)
        .await?;

    tracing::debug!(url = %default_relay, "Stored default relay policies.");

    Ok(relays)
}

pub(super) async fn set(storage: &dyn ExtensionStorage, relays: &RelayPolicies) -> Result<(), Error> {
    storage
        .set(RELAYS_KEY, serde_json::to_value(relays)?)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::storage::MemoryStorage;

    #[tokio::test]
    async fn test_default_is_written_once() {
        let storage = MemoryStorage::new();
        let default_relay = RelayUrl::parse("wss://relay.example.com").unwrap();

        let first = get_or_init(&storage, &default_relay).await.unwrap();
        let second = get_or_init(&storage, &default_relay).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first.len(), 1);
        assert_eq!(
            first.get(default_relay.as_str()),
            Some(&RelayPolicy::default())
        );
        assert_eq!(storage.writes().await, 1);
    }

    #[tokio::test]
    async fn test_stored_policies() {
        let storage = MemoryStorage::new();
        storage
            .set(
                RELAYS_KEY,
                json!({"wss://a.example.com": {"read": true, "write": false}}),
            )
            .await
            .unwrap();

        let default_relay = RelayUrl::parse("wss://relay.example.com").unwrap();
        let relays = get_or_init(&storage, &default_relay).await.unwrap();
        assert_eq!(
            relays.get("wss://a.example.com"),
            Some(&RelayPolicy {
                read: true,
                write: false
            })
        );
        assert_eq!(storage.writes().await, 1);
    }

    #[tokio::test]
    async fn test_invalid_stored_value() {
        let storage = MemoryStorage::new();
        storage.set(RELAYS_KEY, json!(["nope"])).await.unwrap();

        let default_relay = RelayUrl::parse("wss://relay.example.com").unwrap();
        assert!(matches!(
            get_or_init(&storage, &default_relay).await,
            Err(Error::Storage(StorageError::InvalidValue { .. }))
        ));
    }
}
