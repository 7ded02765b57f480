// Copyright (c) 2022-2023 Yuki Kishimoto
// Copyright (c) 2023-2025 Rust Nostr Developers
// Distributed under the MIT software license

//! NIP-07 provider
//!
//! Page-facing `window.nostr` surface.
//! Every call crosses the page boundary through a [`RequestBridge`] and never touches relay state.
//!
//! <https://github.com/nostr-protocol/nips/blob/master/07.md>

use std::collections::BTreeMap;

use nostr::{Event, PublicKey};
use serde_json::{json, Value};
use tokio::sync::broadcast;

pub mod error;
pub mod method;
pub mod template;

pub use self::error::Error;
pub use self::method::{Nip07Method, UnsupportedMethod};
pub use self::template::EventTemplate;
use crate::background::RelayPolicy;
use crate::bridge::{BroadcastEnvelope, RequestBridge};

/// NIP-07 provider
#[derive(Debug, Clone)]
pub struct Nip07Provider {
    bridge: RequestBridge,
    broadcasts: broadcast::Sender<BroadcastEnvelope>,
}

impl Nip07Provider {
    /// Construct a provider on top of a bridge
    pub fn new(bridge: RequestBridge, broadcasts: broadcast::Sender<BroadcastEnvelope>) -> Self {
        Self { bridge, broadcasts }
    }

    /// Subscribe to unsolicited notifications (i.e. `authNeeded`)
    #[inline]
    pub fn broadcasts(&self) -> broadcast::Receiver<BroadcastEnvelope> {
        self.broadcasts.subscribe()
    }

    async fn request(&self, method: Nip07Method, params: Value) -> Result<Value, Error> {
        Ok(self.bridge.call(method.as_str(), params).await?)
    }

    /// Get public key
    pub async fn get_public_key(&self) -> Result<PublicKey, Error> {
        let res: Value = self.request(Nip07Method::GetPublicKey, json!({})).await?;
        Ok(serde_json::from_value(res)?)
    }

    /// Sign an event
    ///
    /// The event is validated before being sent to the extension.
    /// The `pubkey` of the returned event is always the one of the extension key.
    pub async fn sign_event(&self, event: Value) -> Result<Event, Error> {
        let template: EventTemplate = EventTemplate::from_value(&event).map_err(Error::InvalidEvent)?;

        let res: Value = self
            .request(Nip07Method::SignEvent, serde_json::to_value(template)?)
            .await?;

        let event: Event = serde_json::from_value(res)?;
        event
            .verify()
            .map_err(|e| Error::InvalidSignature(e.to_string()))?;

        Ok(event)
    }

    /// Get relays
    pub async fn get_relays(&self) -> Result<BTreeMap<String, RelayPolicy>, Error> {
        let res: Value = self.request(Nip07Method::GetRelays, json!({})).await?;
        Ok(serde_json::from_value(res)?)
    }

    /// NIP-04 encrypt
    pub async fn nip04_encrypt(&self, pubkey: &str, plaintext: &str) -> Result<String, Error> {
        check_pubkey(pubkey)?;
        let res: Value = self
            .request(
                Nip07Method::Nip04Encrypt,
                json!({ "pubkey": pubkey, "plaintext": plaintext }),
            )
            .await?;
        Ok(serde_json::from_value(res)?)
    }

    /// NIP-04 decrypt
    pub async fn nip04_decrypt(&self, pubkey: &str, ciphertext: &str) -> Result<String, Error> {
        check_pubkey(pubkey)?;
        let res: Value = self
            .request(
                Nip07Method::Nip04Decrypt,
                json!({ "pubkey": pubkey, "ciphertext": ciphertext }),
            )
            .await?;
        Ok(serde_json::from_value(res)?)
    }
}

fn check_pubkey(pubkey: &str) -> Result<(), Error> {
    if pubkey.trim().is_empty() {
        return Err(Error::InvalidParams(String::from("missing pubkey")));
    }
    Ok(())
}
