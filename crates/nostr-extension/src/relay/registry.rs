// Copyright (c) 2022-2023 Yuki Kishimoto
// Copyright (c) 2023-2025 Rust Nostr Developers
// Distributed under the MIT software license

//! Relay registry

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use nostr::RelayUrl;
use serde::Serialize;
use tokio::sync::{broadcast, mpsc, RwLock};

use super::frame::ChallengeFrame;
use super::notification::RelayNotification;
use super::options::RelayConnectionOptions;
use super::{RelayConnection, RelayStatus};
use crate::transport::websocket::WebSocketTransport;

#[derive(Debug)]
struct InnerRelayRegistry {
    relays: RwLock<HashMap<RelayUrl, RelayConnection>>,
    transport: Arc<dyn WebSocketTransport>,
    opts: RelayConnectionOptions,
    notification_sender: broadcast::Sender<RelayNotification>,
    challenge_sender: mpsc::UnboundedSender<ChallengeFrame>,
}

/// Process-wide set of relay connections
///
/// At most one live [`RelayConnection`] per url.
/// All connections share the same notification channel.
#[derive(Debug, Clone)]
pub struct RelayRegistry {
    inner: Arc<InnerRelayRegistry>,
}

impl RelayRegistry {
    /// Construct a new registry
    ///
    /// Returns also the receiver of the `AUTH` challenges read by every connection.
    pub fn new<T>(
        transport: T,
        opts: RelayConnectionOptions,
    ) -> (Self, mpsc::UnboundedReceiver<ChallengeFrame>)
    where
        T: WebSocketTransport + 'static,
    {
        let (notification_sender, ..) = broadcast::channel(opts.notification_channel_size);
        let (challenge_sender, challenge_receiver) = mpsc::unbounded_channel();

        let registry = Self {
            inner: Arc::new(InnerRelayRegistry {
                relays: RwLock::new(HashMap::new()),
                transport: Arc::new(transport),
                opts,
                notification_sender,
                challenge_sender,
            }),
        };

        (registry, challenge_receiver)
    }

    /// Subscribe to the notifications of every relay
    #[inline]
    pub fn notifications(&self) -> broadcast::Receiver<RelayNotification> {
        self.inner.notification_sender.subscribe()
    }

    /// Connect to a relay
    ///
    /// If a connection to `url` is already open or being opened, it's returned untouched.
    /// Otherwise a fresh connection replaces the old one.
    /// A connection that is still closing is awaited first, so at most one socket per url is alive.
    pub async fn connect(&self, url: RelayUrl) -> RelayConnection {
        let closing: Option<RelayConnection> = {
            let relays = self.inner.relays.read().await;
            relays
                .get(&url)
                .filter(|relay| relay.status() == RelayStatus::Closing)
                .cloned()
        };

        if let Some(relay) = closing {
            let timeout: Duration = self.inner.opts.close_timeout * 2;
            if !relay.wait_for_disconnection(timeout).await {
                tracing::warn!(url = %url, "Previous connection didn't close in time.");
            }
        }

        let mut relays = self.inner.relays.write().await;

        if let Some(relay) = relays.get(&url) {
            if relay.status().is_active() {
                tracing::debug!(url = %url, "Relay already connected or connecting.");
                return relay.clone();
            }
        }

        let relay: RelayConnection = RelayConnection::internal_new(
            url.clone(),
            self.inner.transport.clone(),
            self.inner.opts.clone(),
            self.inner.notification_sender.clone(),
            Some(self.inner.challenge_sender.clone()),
        );
        relay.connect();

        relays.insert(url, relay.clone());

        relay
    }

    /// Get the connection of a relay
    pub async fn get(&self, url: &RelayUrl) -> Option<RelayConnection> {
        let relays = self.inner.relays.read().await;
        relays.get(url).cloned()
    }

    /// Managed relay urls
    pub async fn urls(&self) -> Vec<RelayUrl> {
        let relays = self.inner.relays.read().await;
        relays.keys().cloned().collect()
    }

    /// Status of a relay connection ([`RelayStatus::Disconnected`] if unknown)
    pub async fn status(&self, url: &RelayUrl) -> RelayStatus {
        match self.get(url).await {
            Some(relay) => relay.status(),
            None => RelayStatus::Disconnected,
        }
    }

    /// Check if the socket to a relay is open
    #[inline]
    pub async fn is_connected(&self, url: &RelayUrl) -> bool {
        self.status(url).await.is_open()
    }

    /// Send a message to a relay
    ///
    /// Returns `false` and emits a [`RelayNotification::Error`] if the relay isn't connected.
    pub async fn send<T>(&self, url: &RelayUrl, msg: &T) -> bool
    where
        T: Serialize + ?Sized,
    {
        match self.get(url).await {
            Some(relay) => relay.send(msg),
            None => {
                tracing::warn!(url = %url, "Cannot send message: relay not found.");
                let _ = self
                    .inner
                    .notification_sender
                    .send(RelayNotification::Error {
                        relay_url: url.clone(),
                        error: String::from("Cannot send message: not connected"),
                    });
                false
            }
        }
    }

    /// Disconnect a relay and forget its connection
    pub async fn disconnect(&self, url: &RelayUrl) {
        let mut relays = self.inner.relays.write().await;
        if let Some(relay) = relays.remove(url) {
            relay.disconnect();
        }
    }

    /// Disconnect every relay
    pub async fn disconnect_all(&self) {
        let mut relays = self.inner.relays.write().await;
        for (_, relay) in relays.drain() {
            relay.disconnect();
        }
    }
}
