// Copyright (c) 2022-2023 Yuki Kishimoto
// Copyright (c) 2023-2025 Rust Nostr Developers
// Distributed under the MIT software license

//! Key store

use nostr::{Keys, PublicKey};
use serde_json::Value;

use super::Error;
use crate::shared::SharedState;
use crate::storage::{StorageError, KEYS_KEY};

/// Persists the private key and keeps the signer slot in sync
#[derive(Debug, Clone)]
pub struct KeyStore {
    state: SharedState,
}

impl KeyStore {
    /// New key store
    #[inline]
    pub fn new(state: SharedState) -> Self {
        Self { state }
    }

    /// Load the stored key, if any, and install it as signer
    pub async fn load(&self) -> Result<Option<PublicKey>, Error> {
        match self.state.storage().get(KEYS_KEY).await? {
            Some(Value::String(secret)) => {
                let keys: Keys = Keys::parse(&secret).map_err(|e| Error::Keys(e.to_string()))?;
                let public_key: PublicKey = keys.public_key();
                self.state.set_signer(keys).await;

                tracing::debug!(public_key = %public_key, "Loaded stored key.");

                Ok(Some(public_key))
            }
            Some(..) => Err(Error::Storage(StorageError::invalid_value(
                KEYS_KEY,
                "expected a hex string",
            ))),
            None => Ok(None),
        }
    }

    /// Generate, store and install a new key
    pub async fn create(&self) -> Result<PublicKey, Error> {
        self.install(Keys::generate()).await
    }

    /// Import a secret key (hex or bech32), store and install it
    pub async fn import(&self, secret_key: &str) -> Result<PublicKey, Error> {
        let keys: Keys = Keys::parse(secret_key).map_err(|e| Error::Keys(e.to_string()))?;
        self.install(keys).await
    }

    /// Delete the stored key and uninstall the signer
    pub async fn remove(&self) -> Result<(), Error> {
        self.state.storage().remove(KEYS_KEY).await?;
        self.state.unset_signer().await;
        Ok(())
    }

    async fn install(&self, keys: Keys) -> Result<PublicKey, Error> {
        let public_key: PublicKey = keys.public_key();

        self.state
            .storage()
            .set(KEYS_KEY, Value::String(keys.secret_key().to_secret_hex()))
            .await?;
        self.state.set_signer(keys).await;

        tracing::info!(public_key = %public_key, "Installed new key.");

        Ok(public_key)
    }
}
