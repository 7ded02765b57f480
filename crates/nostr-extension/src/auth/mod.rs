// Copyright (c) 2022-2023 Yuki Kishimoto
// Copyright (c) 2023-2025 Rust Nostr Developers
// Distributed under the MIT software license

//! NIP-42 authentication
//!
//! Challenges are stored per relay (last challenge wins) until answered.
//! A challenge received while no private key is available stays stored
//! and can be answered later with [`AuthChallengeManager::manual_authenticate`].
//!
//! <https://github.com/nostr-protocol/nips/blob/master/42.md>

use std::collections::HashMap;
use std::sync::Arc;

use async_utility::task;
use nostr::{Event, EventBuilder, NostrSigner, RelayUrl};
use serde_json::json;
use tokio::sync::{broadcast, mpsc, RwLock};

mod challenge;
pub mod error;

pub use self::challenge::AuthChallenge;
pub use self::error::Error;
use crate::bridge::{BroadcastEnvelope, BroadcastKind};
use crate::relay::{ChallengeFrame, ClientFrame, RelayRegistry};
use crate::shared::SharedState;

const BROADCAST_CHANNEL_SIZE: usize = 256;

#[derive(Debug)]
struct InnerAuthChallengeManager {
    state: SharedState,
    relays: RelayRegistry,
    default_relay: RelayUrl,
    challenges: RwLock<HashMap<RelayUrl, AuthChallenge>>,
    broadcast: broadcast::Sender<BroadcastEnvelope>,
}

/// NIP-42 challenge state machine
#[derive(Debug, Clone)]
pub struct AuthChallengeManager {
    inner: Arc<InnerAuthChallengeManager>,
}

impl AuthChallengeManager {
    /// Construct a new manager
    ///
    /// `default_relay` is used for challenges that don't name their relay.
    pub fn new(state: SharedState, relays: RelayRegistry, default_relay: RelayUrl) -> Self {
        let (broadcast, ..) = broadcast::channel(BROADCAST_CHANNEL_SIZE);

        Self {
            inner: Arc::new(InnerAuthChallengeManager {
                state,
                relays,
                default_relay,
                challenges: RwLock::new(HashMap::new()),
                broadcast,
            }),
        }
    }

    /// Subscribe to `authNeeded`, `authenticated` and `authenticationFailed` broadcasts
    #[inline]
    pub fn broadcasts(&self) -> broadcast::Receiver<BroadcastEnvelope> {
        self.inner.broadcast.subscribe()
    }

    #[inline]
    pub(crate) fn broadcast_sender(&self) -> broadcast::Sender<BroadcastEnvelope> {
        self.inner.broadcast.clone()
    }

    /// Relay used when a challenge doesn't name one
    #[inline]
    pub fn default_relay(&self) -> &RelayUrl {
        &self.inner.default_relay
    }

    fn send_broadcast(&self, kind: BroadcastKind, payload: serde_json::Value) {
        // An error only means that nobody is listening
        let _ = self
            .inner
            .broadcast
            .send(BroadcastEnvelope::new(kind, payload));
    }

    /// Handle an `AUTH` challenge
    ///
    /// The challenge replaces any stored one for the same relay.
    /// It's answered immediately if a signer is available and automatic authentication is enabled,
    /// otherwise an `authNeeded` broadcast is emitted.
    pub async fn on_auth_frame(
        &self,
        relay: Option<RelayUrl>,
        challenge: String,
    ) -> Result<(), Error> {
        if challenge.is_empty() {
            return Err(Error::Protocol(String::from("empty AUTH challenge")));
        }

        let relay: RelayUrl = relay.unwrap_or_else(|| self.inner.default_relay.clone());

        tracing::debug!(url = %relay, "Received AUTH challenge.");

        {
            let mut challenges = self.inner.challenges.write().await;
            challenges.insert(
                relay.clone(),
                AuthChallenge::new(relay.clone(), challenge.clone()),
            );
        }

        if self.inner.state.has_signer().await && self.inner.state.is_auto_authentication_enabled()
        {
            return self.authenticate(&relay, &challenge).await;
        }

        tracing::info!(url = %relay, "Authentication needed.");
        self.send_broadcast(
            BroadcastKind::AuthNeeded,
            json!({ "relay": relay.as_str(), "challenge": challenge }),
        );

        Ok(())
    }

    /// Answer a challenge
    ///
    /// On success the stored challenge is consumed, unless a newer one replaced it meanwhile.
    /// On failure it stays stored and no retry is attempted.
    pub async fn authenticate(&self, relay: &RelayUrl, challenge: &str) -> Result<(), Error> {
        match self.try_authenticate(relay, challenge).await {
            Ok(()) => {
                {
                    let mut challenges = self.inner.challenges.write().await;
                    if let Some(stored) = challenges.get(relay) {
                        if stored.challenge == challenge {
                            challenges.remove(relay);
                        }
                    }
                }

                tracing::info!(url = %relay, "Authenticated to relay.");
                self.send_broadcast(
                    BroadcastKind::Authenticated,
                    json!({ "relay": relay.as_str() }),
                );

                Ok(())
            }
            Err(e) => {
                tracing::error!(url = %relay, error = %e, "Can't authenticate to relay.");
                self.send_broadcast(
                    BroadcastKind::AuthenticationFailed,
                    json!({ "relay": relay.as_str(), "error": e.to_string() }),
                );
                Err(e)
            }
        }
    }

    async fn try_authenticate(&self, relay: &RelayUrl, challenge: &str) -> Result<(), Error> {
        let connection = match self.inner.relays.get(relay).await {
            Some(connection) if connection.is_connected() => connection,
            _ => return Err(Error::NotConnected),
        };

        let signer: Arc<dyn NostrSigner> = self.inner.state.signer().await?;
        let event: Event = auth_event(&signer, relay, challenge).await?;

        if connection.send(&ClientFrame::auth(event)) {
            Ok(())
        } else {
            Err(Error::NotDelivered)
        }
    }

    /// Answer the stored challenge of a relay
    ///
    /// Returns `false` if there is no stored challenge, no private key or if the authentication failed.
    pub async fn manual_authenticate(&self, relay: &RelayUrl) -> bool {
        let challenge: String = {
            let challenges = self.inner.challenges.read().await;
            match challenges.get(relay) {
                Some(stored) => stored.challenge.clone(),
                None => {
                    tracing::debug!(url = %relay, "No challenge to answer.");
                    return false;
                }
            }
        };

        if !self.inner.state.has_signer().await {
            tracing::warn!(url = %relay, "Can't authenticate: no private key available.");
            return false;
        }

        self.authenticate(relay, &challenge).await.is_ok()
    }

    /// Snapshot of the unresolved challenges
    pub async fn list_challenges(&self) -> Vec<AuthChallenge> {
        let challenges = self.inner.challenges.read().await;
        let mut list: Vec<AuthChallenge> = challenges.values().cloned().collect();
        list.sort_by(|a, b| a.relay.as_str().cmp(b.relay.as_str()));
        list
    }

    /// Try to answer every stored challenge
    ///
    /// Used after a private key has been provisioned.
    pub async fn retry_all(&self) {
        if !self.inner.state.is_auto_authentication_enabled() {
            return;
        }

        for challenge in self.list_challenges().await.into_iter() {
            if let Err(e) = self
                .authenticate(&challenge.relay, &challenge.challenge)
                .await
            {
                tracing::debug!(url = %challenge.relay, error = %e, "Stored challenge not answered.");
            }
        }
    }

    /// Forget every stored challenge
    pub async fn clear(&self) {
        let mut challenges = self.inner.challenges.write().await;
        challenges.clear();
    }

    /// Process the `AUTH` frames read by the relay connections, in arrival order
    pub fn spawn_ingester(&self, mut rx: mpsc::UnboundedReceiver<ChallengeFrame>) {
        let manager: Self = self.clone();
        task::spawn(async move {
            while let Some(frame) = rx.recv().await {
                if let Err(e) = manager
                    .on_auth_frame(Some(frame.relay_url), frame.challenge)
                    .await
                {
                    tracing::warn!(error = %e, "AUTH challenge not handled.");
                }
            }

            tracing::debug!("AUTH ingester exited.");
        });
    }
}

/// Build and sign a kind `22242` event answering `challenge`
async fn auth_event<T>(signer: &T, relay: &RelayUrl, challenge: &str) -> Result<Event, Error>
where
    T: NostrSigner,
{
    EventBuilder::auth(challenge, relay.clone())
        .sign(signer)
        .await
        .map_err(|e| Error::Signer(e.to_string()))
}
