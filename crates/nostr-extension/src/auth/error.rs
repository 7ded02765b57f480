// Copyright (c) 2022-2023 Yuki Kishimoto
// Copyright (c) 2023-2025 Rust Nostr Developers
// Distributed under the MIT software license

//! Error

use thiserror::Error;

use crate::shared::SharedStateError;

/// [`AuthChallengeManager`](super::AuthChallengeManager) error
#[derive(Debug, Error)]
pub enum Error {
    /// Shared state error (i.e. no private key)
    #[error(transparent)]
    SharedState(#[from] SharedStateError),
    /// Malformed challenge
    #[error("protocol error: {0}")]
    Protocol(String),
    /// The relay socket isn't open
    #[error("relay not connected")]
    NotConnected,
    /// Auth event can't be built or signed
    #[error("signer: {0}")]
    Signer(String),
    /// The relay connection refused the `AUTH` message
    #[error("AUTH message not delivered")]
    NotDelivered,
}
