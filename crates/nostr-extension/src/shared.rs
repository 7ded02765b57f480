// Copyright (c) 2022-2023 Yuki Kishimoto
// Copyright (c) 2023-2025 Rust Nostr Developers
// Distributed under the MIT software license

//! Shared state

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use nostr::prelude::IntoNostrSigner;
use nostr::NostrSigner;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::storage::{ExtensionStorage, IntoExtensionStorage, MemoryStorage};

/// Shared state error
#[derive(Debug, Error)]
pub enum SharedStateError {
    /// No private key provisioned yet
    #[error("no private key available")]
    NoPrivateKey,
}

/// State shared by the components of the background context
#[derive(Debug, Clone)]
pub struct SharedState {
    storage: Arc<dyn ExtensionStorage>,
    signer: Arc<RwLock<Option<Arc<dyn NostrSigner>>>>,
    nip42_auto_authentication: Arc<AtomicBool>,
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new(MemoryStorage::new(), true)
    }
}

impl SharedState {
    /// New state without signer
    pub fn new<S>(storage: S, nip42_auto_authentication: bool) -> Self
    where
        S: IntoExtensionStorage,
    {
        Self {
            storage: storage.into_extension_storage(),
            signer: Arc::new(RwLock::new(None)),
            nip42_auto_authentication: Arc::new(AtomicBool::new(nip42_auto_authentication)),
        }
    }

    /// Check if auto authentication to relays is enabled
    #[inline]
    pub fn is_auto_authentication_enabled(&self) -> bool {
        self.nip42_auto_authentication.load(Ordering::SeqCst)
    }

    /// Auto authenticate to relays
    ///
    /// <https://github.com/nostr-protocol/nips/blob/master/42.md>
    pub fn automatic_authentication(&self, enable: bool) {
        self.nip42_auto_authentication
            .store(enable, Ordering::SeqCst);
    }

    /// Get storage
    #[inline]
    pub fn storage(&self) -> &Arc<dyn ExtensionStorage> {
        &self.storage
    }

    /// Check if a signer is available
    pub async fn has_signer(&self) -> bool {
        let signer = self.signer.read().await;
        signer.is_some()
    }

    /// Get current signer
    ///
    /// Rise error if no private key was provisioned.
    pub async fn signer(&self) -> Result<Arc<dyn NostrSigner>, SharedStateError> {
        let signer = self.signer.read().await;
        signer.clone().ok_or(SharedStateError::NoPrivateKey)
    }

    /// Set signer
    pub async fn set_signer<T>(&self, signer: T)
    where
        T: IntoNostrSigner,
    {
        let mut s = self.signer.write().await;
        *s = Some(signer.into_nostr_signer());
    }

    /// Unset signer
    pub async fn unset_signer(&self) {
        let mut s = self.signer.write().await;
        *s = None;
    }
}
