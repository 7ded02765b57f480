// Copyright (c) 2022-2023 Yuki Kishimoto
// Copyright (c) 2023-2025 Rust Nostr Developers
// Distributed under the MIT software license

//! Background context
//!
//! Owns the privileged state: keys, relay connections and stored challenges.
//! Serves the NIP-07 requests forwarded by the content script
//! and the control commands of the extension UI.

use std::sync::Arc;

use nostr::{PublicKey, RelayUrl};
use serde::Serialize;
use tokio::sync::{broadcast, mpsc, Mutex};

pub mod error;
mod handler;
pub mod keys;
pub mod relays;

pub use self::error::Error;
pub use self::keys::KeyStore;
pub use self::relays::{RelayPolicies, RelayPolicy};
use crate::auth::{AuthChallenge, AuthChallengeManager};
use crate::bridge::BroadcastEnvelope;
use crate::options::ExtensionOptions;
use crate::relay::{ChallengeFrame, RelayNotification, RelayRegistry};
use crate::shared::SharedState;
use crate::storage::IntoExtensionStorage;
use crate::transport::websocket::{DefaultWebsocketTransport, WebSocketTransport};

#[derive(Debug)]
struct InnerBackground {
    opts: ExtensionOptions,
    default_relay: RelayUrl,
    state: SharedState,
    relays: RelayRegistry,
    auth: AuthChallengeManager,
    keys: KeyStore,
    challenges: Mutex<Option<mpsc::UnboundedReceiver<ChallengeFrame>>>,
}

/// Background context
#[derive(Debug, Clone)]
pub struct Background {
    inner: Arc<InnerBackground>,
}

impl Background {
    /// New background context using the default websocket transport
    #[inline]
    pub fn new<S>(storage: S, opts: ExtensionOptions) -> Result<Self, Error>
    where
        S: IntoExtensionStorage,
    {
        Self::with_transport(storage, DefaultWebsocketTransport, opts)
    }

    /// New background context with a custom websocket transport
    pub fn with_transport<S, T>(
        storage: S,
        transport: T,
        opts: ExtensionOptions,
    ) -> Result<Self, Error>
    where
        S: IntoExtensionStorage,
        T: WebSocketTransport + 'static,
    {
        let default_relay: RelayUrl = RelayUrl::parse(&opts.default_relay)
            .map_err(|e| Error::RelayUrl(e.to_string()))?;

        let state: SharedState = SharedState::new(storage, opts.nip42_auto_authentication);
        let (relays, challenges) = RelayRegistry::new(transport, opts.relay.clone());
        let auth: AuthChallengeManager =
            AuthChallengeManager::new(state.clone(), relays.clone(), default_relay.clone());
        let keys: KeyStore = KeyStore::new(state.clone());

        Ok(Self {
            inner: Arc::new(InnerBackground {
                opts,
                default_relay,
                state,
                relays,
                auth,
                keys,
                challenges: Mutex::new(Some(challenges)),
            }),
        })
    }

    /// Options
    #[inline]
    pub fn opts(&self) -> &ExtensionOptions {
        &self.inner.opts
    }

    /// Default relay
    #[inline]
    pub fn default_relay(&self) -> &RelayUrl {
        &self.inner.default_relay
    }

    /// Shared state
    #[inline]
    pub fn state(&self) -> &SharedState {
        &self.inner.state
    }

    /// Relay registry
    #[inline]
    pub fn relays(&self) -> &RelayRegistry {
        &self.inner.relays
    }

    /// NIP-42 challenge manager
    #[inline]
    pub fn auth(&self) -> &AuthChallengeManager {
        &self.inner.auth
    }

    /// Subscribe to the relay notifications
    #[inline]
    pub fn notifications(&self) -> broadcast::Receiver<RelayNotification> {
        self.inner.relays.notifications()
    }

    /// Subscribe to the authentication broadcasts
    #[inline]
    pub fn broadcasts(&self) -> broadcast::Receiver<BroadcastEnvelope> {
        self.inner.auth.broadcasts()
    }

    #[inline]
    pub(crate) fn broadcast_sender(&self) -> broadcast::Sender<BroadcastEnvelope> {
        self.inner.auth.broadcast_sender()
    }

    /// Start the context
    ///
    /// Starts the `AUTH` ingester, loads the stored key and, if one exists,
    /// connects to the default relay (unless disabled in the options).
    pub async fn start(&self) -> Result<(), Error> {
        if let Some(rx) = self.inner.challenges.lock().await.take() {
            self.inner.auth.spawn_ingester(rx);
        }

        let public_key: Option<PublicKey> = self.inner.keys.load().await?;

        if public_key.is_some() && self.inner.opts.connect_on_startup {
            self.connect(self.inner.default_relay.clone()).await;
        }

        Ok(())
    }

    /// Disconnect every relay and forget the stored challenges
    pub async fn shutdown(&self) {
        self.inner.relays.disconnect_all().await;
        self.inner.auth.clear().await;
        tracing::info!("Background context shut down.");
    }

    /// Connect to a relay
    ///
    /// No-op if already connected or connecting.
    pub async fn connect(&self, url: RelayUrl) {
        self.inner.relays.connect(url).await;
    }

    /// Disconnect from a relay
    pub async fn disconnect(&self, url: &RelayUrl) {
        self.inner.relays.disconnect(url).await;
    }

    /// Send a message to a relay
    ///
    /// Returns `false` if not delivered.
    pub async fn send<T>(&self, url: &RelayUrl, msg: &T) -> bool
    where
        T: Serialize + ?Sized,
    {
        self.inner.relays.send(url, msg).await
    }

    /// Check if the socket to a relay is open
    #[inline]
    pub async fn is_connected(&self, url: &RelayUrl) -> bool {
        self.inner.relays.is_connected(url).await
    }

    /// Unresolved challenges
    #[inline]
    pub async fn list_challenges(&self) -> Vec<AuthChallenge> {
        self.inner.auth.list_challenges().await
    }

    /// Answer the stored challenge of a relay
    #[inline]
    pub async fn manual_authenticate(&self, url: &RelayUrl) -> bool {
        self.inner.auth.manual_authenticate(url).await
    }

    /// Generate a new key
    ///
    /// Stored challenges are answered if automatic authentication is enabled.
    pub async fn create_keys(&self) -> Result<PublicKey, Error> {
        let public_key: PublicKey = self.inner.keys.create().await?;
        self.inner.auth.retry_all().await;
        Ok(public_key)
    }

    /// Import a secret key (hex or bech32)
    ///
    /// Stored challenges are answered if automatic authentication is enabled.
    pub async fn import_keys(&self, secret_key: &str) -> Result<PublicKey, Error> {
        let public_key: PublicKey = self.inner.keys.import(secret_key).await?;
        self.inner.auth.retry_all().await;
        Ok(public_key)
    }

    /// Delete the stored key
    #[inline]
    pub async fn remove_keys(&self) -> Result<(), Error> {
        self.inner.keys.remove().await
    }

    /// Replace the relay policies
    pub async fn set_relays(&self, relays: &RelayPolicies) -> Result<(), Error> {
        relays::set(self.inner.state.storage().as_ref(), relays).await
    }
}
