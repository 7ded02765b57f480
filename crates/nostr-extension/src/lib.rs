// Copyright (c) 2022-2023 Yuki Kishimoto
// Copyright (c) 2023-2025 Rust Nostr Developers
// Distributed under the MIT software license

//! Nostr signing extension core
//!
//! NIP-07 provider bridge, relay connection management and NIP-42 authentication.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(rustdoc::bare_urls)]

pub mod auth;
pub mod background;
pub mod bridge;
pub mod content;
pub mod extension;
pub mod options;
pub mod prelude;
pub mod provider;
pub mod relay;
pub mod shared;
pub mod storage;
pub mod transport;

pub use self::auth::{AuthChallenge, AuthChallengeManager};
pub use self::background::{Background, KeyStore, RelayPolicies, RelayPolicy};
pub use self::bridge::{
    BridgeResponder, BroadcastEnvelope, BroadcastKind, ErrorObject, RequestBridge,
    RequestEnvelope, ResponseEnvelope,
};
pub use self::content::ContentScript;
pub use self::extension::Extension;
pub use self::options::ExtensionOptions;
pub use self::provider::{EventTemplate, Nip07Method, Nip07Provider};
pub use self::relay::{
    ClientFrame, RelayConnection, RelayConnectionOptions, RelayNotification, RelayRegistry,
    RelayStatus,
};
pub use self::shared::{SharedState, SharedStateError};
pub use self::storage::{ExtensionStorage, MemoryStorage, StorageError};
pub use self::transport::error::TransportError;
pub use self::transport::websocket::{DefaultWebsocketTransport, RelaySocket, WebSocketTransport};
