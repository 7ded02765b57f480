// Copyright (c) 2022-2023 Yuki Kishimoto
// Copyright (c) 2023-2025 Rust Nostr Developers
// Distributed under the MIT software license

//! Relay connection options

use std::time::Duration;

use async_wsocket::ConnectionMode;

/// Default timeout for opening the socket
pub const DEFAULT_CONNECTION_TIMEOUT: Duration = Duration::from_secs(10);
/// Default timeout for writing a frame to the socket
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(10);
/// Default timeout for the transport to confirm a close request
pub const DEFAULT_CLOSE_TIMEOUT: Duration = Duration::from_secs(5);
pub(super) const DEFAULT_NOTIFICATION_CHANNEL_SIZE: usize = 2048;
pub(super) const OUTGOING_CHANNEL_SIZE: usize = 1024;

/// [`RelayConnection`](super::RelayConnection) options
#[derive(Debug, Clone)]
pub struct RelayConnectionOptions {
    pub(super) connection_mode: ConnectionMode,
    pub(super) connection_timeout: Duration,
    pub(super) send_timeout: Duration,
    pub(super) close_timeout: Duration,
    pub(super) notification_channel_size: usize,
}

impl Default for RelayConnectionOptions {
    fn default() -> Self {
        Self {
            connection_mode: ConnectionMode::default(),
            connection_timeout: DEFAULT_CONNECTION_TIMEOUT,
            send_timeout: DEFAULT_SEND_TIMEOUT,
            close_timeout: DEFAULT_CLOSE_TIMEOUT,
            notification_channel_size: DEFAULT_NOTIFICATION_CHANNEL_SIZE,
        }
    }
}

impl RelayConnectionOptions {
    /// New default options
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set connection mode (direct, proxy or tor)
    #[inline]
    pub fn connection_mode(mut self, mode: ConnectionMode) -> Self {
        self.connection_mode = mode;
        self
    }

    /// Timeout for opening the socket (default: 10 secs)
    #[inline]
    pub fn connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    /// Timeout for writing a single frame (default: 10 secs)
    #[inline]
    pub fn send_timeout(mut self, timeout: Duration) -> Self {
        self.send_timeout = timeout;
        self
    }

    /// Timeout for the close handshake (default: 5 secs)
    #[inline]
    pub fn close_timeout(mut self, timeout: Duration) -> Self {
        self.close_timeout = timeout;
        self
    }

    /// Notification channel size (default: 2048)
    #[inline]
    pub fn notification_channel_size(mut self, size: usize) -> Self {
        self.notification_channel_size = size;
        self
    }
}
