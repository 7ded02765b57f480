// Copyright (c) 2022-2023 Yuki Kishimoto
// Copyright (c) 2023-2025 Rust Nostr Developers
// Distributed under the MIT software license

use std::str::FromStr;
use std::sync::Arc;

use nostr::{Event, EventBuilder, Kind, NostrSigner, PublicKey, Tag, Timestamp, UnsignedEvent};
use serde_json::Value;

use super::{relays, Background, Error};
use crate::bridge::{RequestEnvelope, ResponseEnvelope};
use crate::provider::{EventTemplate, Nip07Method};

impl Background {
    /// Serve a NIP-07 request
    ///
    /// Never fails: errors are returned as `{code, message}` objects.
    pub async fn handle_request(&self, request: RequestEnvelope) -> ResponseEnvelope {
        let id = request.id;

        tracing::debug!(id = %id, method = %request.method, "Handling request.");

        match self.dispatch(&request.method, request.payload).await {
            Ok(result) => ResponseEnvelope::ok(id, result),
            Err(e) => {
                tracing::warn!(id = %id, method = %request.method, error = %e, "Request failed.");
                ResponseEnvelope::err(id, e.to_error_object())
            }
        }
    }

    async fn dispatch(&self, method: &str, payload: Value) -> Result<Value, Error> {
        match Nip07Method::from_str(method)? {
            Nip07Method::GetPublicKey => self.get_public_key().await,
            Nip07Method::SignEvent => self.sign_event(payload).await,
            Nip07Method::GetRelays => self.get_relays().await,
            Nip07Method::Nip04Encrypt => {
                let signer = self.inner.state.signer().await?;
                let (public_key, plaintext) = crypto_params(&payload, "plaintext")?;
                let ciphertext: String = signer.nip04_encrypt(&public_key, &plaintext).await?;
                Ok(Value::String(ciphertext))
            }
            Nip07Method::Nip04Decrypt => {
                let signer = self.inner.state.signer().await?;
                let (public_key, ciphertext) = crypto_params(&payload, "ciphertext")?;
                let plaintext: String = signer.nip04_decrypt(&public_key, &ciphertext).await?;
                Ok(Value::String(plaintext))
            }
        }
    }

    async fn get_public_key(&self) -> Result<Value, Error> {
        let signer: Arc<dyn NostrSigner> = self.inner.state.signer().await?;
        let public_key: PublicKey = signer.get_public_key().await?;
        Ok(Value::String(public_key.to_hex()))
    }

    async fn sign_event(&self, payload: Value) -> Result<Value, Error> {
        let template: EventTemplate =
            EventTemplate::from_value(&payload).map_err(Error::InvalidEvent)?;

        let signer: Arc<dyn NostrSigner> = self.inner.state.signer().await?;

        // Whatever the caller put in `pubkey`, the event is signed for the extension key
        let public_key: PublicKey = signer.get_public_key().await?;

        let tags: Vec<Tag> = template
            .tags
            .into_iter()
            .map(Tag::parse)
            .collect::<Result<_, _>>()
            .map_err(|e| Error::InvalidEvent(e.to_string()))?;

        let created_at: Timestamp = match template.created_at {
            Some(created_at) => Timestamp::from(created_at),
            None => Timestamp::now(),
        };

        let unsigned: UnsignedEvent = EventBuilder::new(Kind::from(template.kind), template.content)
            .tags(tags)
            .custom_created_at(created_at)
            .build(public_key);

        let event: Event = signer.sign_event(unsigned).await?;

        Ok(serde_json::to_value(event)?)
    }

    async fn get_relays(&self) -> Result<Value, Error> {
        let relays = relays::get_or_init(
            self.inner.state.storage().as_ref(),
            &self.inner.default_relay,
        )
        .await?;
        Ok(serde_json::to_value(relays)?)
    }
}

/// Extract `pubkey` and the text field of NIP-04 params
fn crypto_params(payload: &Value, text_field: &str) -> Result<(PublicKey, String), Error> {
    let pubkey: &str = match payload.get("pubkey") {
        Some(Value::String(pubkey)) if !pubkey.is_empty() => pubkey,
        _ => return Err(Error::InvalidParams(String::from("missing pubkey"))),
    };

    let public_key: PublicKey =
        PublicKey::from_hex(pubkey).map_err(|e| Error::InvalidParams(e.to_string()))?;

    let text: String = match payload.get(text_field) {
        Some(Value::String(text)) => text.clone(),
        _ => {
            return Err(Error::InvalidParams(format!(
                "{text_field} must be a string"
            )));
        }
    };

    Ok((public_key, text))
}

#[cfg(test)]
mod tests {
    use nostr::Keys;
    use serde_json::json;

    use super::*;
    use crate::bridge::ErrorObject;
    use crate::options::ExtensionOptions;
    use crate::storage::MemoryStorage;
    use crate::transport::mock::MockTransport;

    fn background(storage: MemoryStorage) -> Background {
        let (transport, _sessions) = MockTransport::new();
        Background::with_transport(storage, transport, ExtensionOptions::default()).unwrap()
    }

    async fn call(background: &Background, method: &str, payload: Value) -> Result<Value, ErrorObject> {
        background
            .handle_request(RequestEnvelope::new(method, payload))
            .await
            .into_result()
    }

    #[tokio::test]
    async fn test_no_private_key() {
        let background = background(MemoryStorage::new());

        for (method, payload) in [
            ("getPublicKey", json!({})),
            ("signEvent", json!({"kind": 1, "tags": [], "content": ""})),
            (
                "nip04.encrypt",
                json!({"pubkey": Keys::generate().public_key().to_hex(), "plaintext": "hi"}),
            ),
            // Missing key is reported before malformed params
            (
                "nip04.encrypt",
                json!({"pubkey": "not-hex", "plaintext": "hi"}),
            ),
            ("nip04.decrypt", json!({"ciphertext": 1})),
        ] {
            let error = call(&background, method, payload).await.unwrap_err();
            assert_eq!(error.code, ErrorObject::NO_PRIVATE_KEY, "{method}");
        }
    }

    #[tokio::test]
    async fn test_unsupported_method() {
        let background = background(MemoryStorage::new());
        let error = call(&background, "nip44.encrypt", json!({})).await.unwrap_err();
        assert_eq!(error.code, ErrorObject::UNSUPPORTED_METHOD);
    }

    #[tokio::test]
    async fn test_get_public_key() {
        let background = background(MemoryStorage::new());
        let public_key = background.create_keys().await.unwrap();

        let res = call(&background, "getPublicKey", Value::Null).await.unwrap();
        assert_eq!(res, json!(public_key.to_hex()));
    }

    #[tokio::test]
    async fn test_sign_event_overwrites_pubkey() {
        let background = background(MemoryStorage::new());
        let public_key = background.create_keys().await.unwrap();
        let other = Keys::generate().public_key();

        let res = call(
            &background,
            "signEvent",
            json!({
                "kind": 1,
                "tags": [["t", "nostr"]],
                "content": "hello",
                "pubkey": other.to_hex(),
                "created_at": 1700000000
            }),
        )
        .await
        .unwrap();

        let event: Event = serde_json::from_value(res).unwrap();
        assert_eq!(event.pubkey, public_key);
        assert_eq!(event.created_at, Timestamp::from(1700000000));
        assert_eq!(event.content, "hello");
        assert!(event.verify().is_ok());
    }

    #[tokio::test]
    async fn test_sign_event_defaults_created_at() {
        let background = background(MemoryStorage::new());
        background.create_keys().await.unwrap();

        let before = Timestamp::now();
        let res = call(
            &background,
            "signEvent",
            json!({"kind": 1, "tags": [], "content": ""}),
        )
        .await
        .unwrap();
        let after = Timestamp::now();

        let event: Event = serde_json::from_value(res).unwrap();
        assert!(event.created_at >= before);
        assert!(event.created_at <= after);
    }

    #[tokio::test]
    async fn test_sign_invalid_event() {
        let background = background(MemoryStorage::new());
        background.create_keys().await.unwrap();

        let error = call(&background, "signEvent", json!({"kind": 1, "content": ""}))
            .await
            .unwrap_err();
        assert_eq!(error.code, ErrorObject::HANDLER);
    }

    #[tokio::test]
    async fn test_get_relays_is_idempotent() {
        let storage = MemoryStorage::new();
        let background = background(storage.clone());

        // No key required
        let first = call(&background, "getRelays", json!({})).await.unwrap();
        let second = call(&background, "getRelays", json!({})).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(
            first,
            json!({ background.default_relay().as_str(): {"read": true, "write": true} })
        );
        assert_eq!(storage.writes().await, 1);
    }

    #[tokio::test]
    async fn test_nip04_round_trip() {
        let background = background(MemoryStorage::new());
        background.create_keys().await.unwrap();
        let peer = Keys::generate().public_key().to_hex();

        for plaintext in ["hello", "ünïcödé ✓", "a longer message spanning more than one block"] {
            let ciphertext = call(
                &background,
                "nip04.encrypt",
                json!({"pubkey": peer, "plaintext": plaintext}),
            )
            .await
            .unwrap();

            let decrypted = call(
                &background,
                "nip04.decrypt",
                json!({"pubkey": peer, "ciphertext": ciphertext}),
            )
            .await
            .unwrap();
            assert_eq!(decrypted, json!(plaintext));
        }
    }

    #[tokio::test]
    async fn test_nip04_invalid_pubkey() {
        let background = background(MemoryStorage::new());
        background.create_keys().await.unwrap();

        let error = call(
            &background,
            "nip04.encrypt",
            json!({"pubkey": "not-hex", "plaintext": "hi"}),
        )
        .await
        .unwrap_err();
        assert_eq!(error.code, ErrorObject::HANDLER);

        let error = call(&background, "nip04.decrypt", json!({"ciphertext": "x"}))
            .await
            .unwrap_err();
        assert_eq!(error.code, ErrorObject::HANDLER);
    }
}
