// Copyright (c) 2022-2023 Yuki Kishimoto
// Copyright (c) 2023-2025 Rust Nostr Developers
// Distributed under the MIT software license

use nostr::{RelayUrl, Timestamp};
use serde::{Serialize, Serializer};

/// Stored NIP-42 challenge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthChallenge {
    /// Relay that issued the challenge
    pub relay: RelayUrl,
    /// Challenge string
    pub challenge: String,
    /// When the challenge was received
    pub received_at: Timestamp,
}

impl AuthChallenge {
    pub(super) fn new(relay: RelayUrl, challenge: String) -> Self {
        Self {
            relay,
            challenge,
            received_at: Timestamp::now(),
        }
    }
}

impl Serialize for AuthChallenge {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        use serde::ser::SerializeStruct;

        let mut s = serializer.serialize_struct("AuthChallenge", 3)?;
        s.serialize_field("relay", self.relay.as_str())?;
        s.serialize_field("challenge", &self.challenge)?;
        s.serialize_field("receivedAt", &self.received_at)?;
        s.end()
    }
}
