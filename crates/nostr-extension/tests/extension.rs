// Copyright (c) 2022-2023 Yuki Kishimoto
// Copyright (c) 2023-2025 Rust Nostr Developers
// Distributed under the MIT software license

use std::time::Duration;

use nostr_extension::prelude::*;
use nostr_extension::transport::mock::{MockSession, MockSessions, MockTransport};
use serde_json::{json, Value};

const RELAY: &str = "wss://relay.example.com";

fn relay_url() -> RelayUrl {
    RelayUrl::parse(RELAY).unwrap()
}

async fn launch(opts: ExtensionOptions) -> (Extension, MockSessions) {
    let (transport, sessions) = MockTransport::new();
    let background =
        Background::with_transport(MemoryStorage::new(), transport, opts.default_relay(RELAY))
            .unwrap();
    background.start().await.unwrap();
    (Extension::launch(background), sessions)
}

async fn connect(extension: &Extension, sessions: &mut MockSessions) -> MockSession {
    let background = extension.background();
    let mut notifications = background.notifications();

    background.connect(relay_url()).await;
    let session = sessions.accept().await.unwrap();

    loop {
        if let RelayNotification::Connected { relay_url: url } = notifications.recv().await.unwrap() {
            assert_eq!(url, relay_url());
            break;
        }
    }

    session
}

async fn next_auth_frame(session: &mut MockSession) -> Value {
    let frame: Value = serde_json::from_str(&session.recv_text().await.unwrap()).unwrap();
    assert_eq!(frame[0], "AUTH");
    frame[1].clone()
}

fn has_tag(event: &Value, tag: Value) -> bool {
    event["tags"].as_array().unwrap().contains(&tag)
}

#[tokio::test]
async fn test_provider_without_key() {
    let (extension, _sessions) = launch(ExtensionOptions::default()).await;
    let provider = extension.provider();

    let err = provider.get_public_key().await.unwrap_err();
    assert!(err.is_no_private_key());

    let err = provider
        .sign_event(json!({"kind": 1, "tags": [], "content": "hi"}))
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorObject::NO_PRIVATE_KEY);

    // Relay policies don't need a key
    let relays = provider.get_relays().await.unwrap();
    assert_eq!(relays.len(), 1);
    assert_eq!(relays.get(relay_url().as_str()), Some(&RelayPolicy::default()));
}

#[tokio::test]
async fn test_provider_with_key() {
    let (extension, _sessions) = launch(ExtensionOptions::default()).await;
    let provider = extension.provider();
    let public_key = extension.background().create_keys().await.unwrap();

    assert_eq!(provider.get_public_key().await.unwrap(), public_key);

    let forged = Keys::generate().public_key();
    let event = provider
        .sign_event(json!({
            "kind": 1,
            "tags": [["t", "nostr"]],
            "content": "hello",
            "pubkey": forged.to_hex()
        }))
        .await
        .unwrap();
    assert_eq!(event.pubkey, public_key);
    assert_eq!(event.kind, Kind::from(1));

    let peer = Keys::generate().public_key().to_hex();
    let ciphertext = provider.nip04_encrypt(&peer, "secret").await.unwrap();
    assert_ne!(ciphertext, "secret");
    assert_eq!(
        provider.nip04_decrypt(&peer, &ciphertext).await.unwrap(),
        "secret"
    );
}

#[tokio::test]
async fn test_concurrent_requests() {
    let (extension, _sessions) = launch(ExtensionOptions::default()).await;
    let provider = extension.provider();
    let public_key = extension.background().create_keys().await.unwrap();

    let (a, b, c) = tokio::join!(
        provider.get_public_key(),
        provider.get_relays(),
        provider.sign_event(json!({"kind": 1, "tags": [], "content": "a"})),
    );

    assert_eq!(a.unwrap(), public_key);
    assert_eq!(b.unwrap().len(), 1);
    assert_eq!(c.unwrap().content, "a");
}

#[tokio::test]
async fn test_challenge_before_key_is_answered_on_key_creation() {
    let (extension, mut sessions) = launch(ExtensionOptions::default()).await;
    let background = extension.background();
    let mut broadcasts = extension.provider().broadcasts();
    let mut session = connect(&extension, &mut sessions).await;

    session.send_text(r#"["AUTH","abc123"]"#);

    let broadcast = broadcasts.recv().await.unwrap();
    assert_eq!(broadcast.kind, BroadcastKind::AuthNeeded);
    assert_eq!(broadcast.payload["challenge"], "abc123");

    let challenges = background.list_challenges().await;
    assert_eq!(challenges.len(), 1);
    assert_eq!(challenges[0].relay, relay_url());
    assert_eq!(challenges[0].challenge, "abc123");

    let public_key = background.create_keys().await.unwrap();

    let event = next_auth_frame(&mut session).await;
    assert_eq!(event["pubkey"], public_key.to_hex());
    assert_eq!(event["kind"], 22242);
    assert!(has_tag(&event, json!(["challenge", "abc123"])));
    assert!(event["tags"].as_array().unwrap().iter().any(|tag| tag[0] == "relay"));

    assert_eq!(broadcasts.recv().await.unwrap().kind, BroadcastKind::Authenticated);
    assert!(background.list_challenges().await.is_empty());
}

#[tokio::test]
async fn test_manual_authentication() {
    let (extension, mut sessions) =
        launch(ExtensionOptions::default().automatic_authentication(false)).await;
    let background = extension.background();
    let mut broadcasts = background.broadcasts();
    let mut session = connect(&extension, &mut sessions).await;

    // Nothing to answer yet
    assert!(!background.manual_authenticate(&relay_url()).await);

    session.send_text(r#"["AUTH","c1"]"#);
    assert_eq!(broadcasts.recv().await.unwrap().kind, BroadcastKind::AuthNeeded);
    session.send_text(r#"["AUTH","c2"]"#);
    assert_eq!(broadcasts.recv().await.unwrap().kind, BroadcastKind::AuthNeeded);

    let challenges = background.list_challenges().await;
    assert_eq!(challenges.len(), 1);
    assert_eq!(challenges[0].challenge, "c2");

    // Key imported, but automatic authentication is off
    let keys = Keys::generate();
    background
        .import_keys(&keys.secret_key().to_secret_hex())
        .await
        .unwrap();
    assert_eq!(background.list_challenges().await.len(), 1);

    assert!(background.manual_authenticate(&relay_url()).await);

    let event = next_auth_frame(&mut session).await;
    assert!(has_tag(&event, json!(["challenge", "c2"])));
    assert!(background.list_challenges().await.is_empty());
}

#[tokio::test]
async fn test_auth_after_disconnect_keeps_challenge() {
    let (extension, mut sessions) =
        launch(ExtensionOptions::default().automatic_authentication(false)).await;
    let background = extension.background();
    let mut notifications = background.notifications();
    let mut broadcasts = background.broadcasts();
    let session = connect(&extension, &mut sessions).await;

    session.send_text(r#"["AUTH","abc123"]"#);
    assert_eq!(broadcasts.recv().await.unwrap().kind, BroadcastKind::AuthNeeded);

    background.create_keys().await.unwrap();
    session.close();

    loop {
        if let RelayNotification::Disconnected { .. } = notifications.recv().await.unwrap() {
            break;
        }
    }

    assert!(!background.send(&relay_url(), &json!(["EVENT", {}])).await);
    assert!(!background.manual_authenticate(&relay_url()).await);
    assert_eq!(background.list_challenges().await.len(), 1);
}

#[tokio::test]
async fn test_start_connects_when_key_exists() {
    let storage = MemoryStorage::new();
    let keys = Keys::generate();
    storage
        .set("nostr_keys", Value::String(keys.secret_key().to_secret_hex()))
        .await
        .unwrap();

    let (transport, mut sessions) = MockTransport::new();
    let background = Background::with_transport(
        storage,
        transport,
        ExtensionOptions::default().default_relay(RELAY),
    )
    .unwrap();
    background.start().await.unwrap();

    let session = tokio::time::timeout(Duration::from_secs(5), sessions.accept())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(session.url(), &relay_url());

    let extension = Extension::launch(background.clone());
    assert_eq!(
        extension.provider().get_public_key().await.unwrap(),
        keys.public_key()
    );

    background.shutdown().await;
    assert!(!background.is_connected(&relay_url()).await);
}
