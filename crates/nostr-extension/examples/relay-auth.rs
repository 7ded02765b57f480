// Copyright (c) 2022-2023 Yuki Kishimoto
// Copyright (c) 2023-2025 Rust Nostr Developers
// Distributed under the MIT software license

use std::time::Duration;

use nostr_extension::prelude::*;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let background = Background::new(MemoryStorage::new(), ExtensionOptions::default())?;
    let mut broadcasts = background.broadcasts();
    background.start().await?;

    let public_key = background.create_keys().await?;
    println!("Public key: {public_key}");

    background.connect(background.default_relay().clone()).await;

    let extension = Extension::launch(background.clone());
    let provider = extension.provider();

    println!("Relays: {:?}", provider.get_relays().await?);

    let event = provider
        .sign_event(serde_json::json!({
            "kind": 1,
            "tags": [],
            "content": "Hello from a NIP-07 provider"
        }))
        .await?;
    println!("Signed event: {}", event.id);

    // Wait for a challenge from the relay, if any
    if let Ok(Ok(broadcast)) = tokio::time::timeout(Duration::from_secs(10), broadcasts.recv()).await {
        println!("Broadcast: {}", serde_json::to_string(&broadcast)?);
    }

    for challenge in background.list_challenges().await {
        println!("Unresolved challenge from {}: {}", challenge.relay, challenge.challenge);
    }

    background.shutdown().await;

    Ok(())
}
