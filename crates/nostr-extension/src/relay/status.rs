// Copyright (c) 2022-2023 Yuki Kishimoto
// Copyright (c) 2023-2025 Rust Nostr Developers
// Distributed under the MIT software license

//! Relay connection status

use core::fmt;
use core::sync::atomic::{AtomicU8, Ordering};

#[derive(Debug)]
pub(super) struct AtomicRelayStatus {
    value: AtomicU8,
}

impl Default for AtomicRelayStatus {
    fn default() -> Self {
        Self::new(RelayStatus::Disconnected)
    }
}

impl AtomicRelayStatus {
    #[inline]
    pub(super) fn new(status: RelayStatus) -> Self {
        Self {
            value: AtomicU8::new(status as u8),
        }
    }

    #[inline]
    pub(super) fn set(&self, status: RelayStatus) {
        self.value.store(status as u8, Ordering::SeqCst);
    }

    /// Set `new` only if the current status is `current`
    #[inline]
    pub(super) fn compare_exchange(&self, current: RelayStatus, new: RelayStatus) -> bool {
        self.value
            .compare_exchange(current as u8, new as u8, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    pub(super) fn load(&self) -> RelayStatus {
        let val: u8 = self.value.load(Ordering::SeqCst);
        match val {
            1 => RelayStatus::Connecting,
            2 => RelayStatus::Open,
            3 => RelayStatus::Closing,
            _ => RelayStatus::Disconnected,
        }
    }
}

/// Relay connection status
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RelayStatus {
    /// No socket
    Disconnected = 0,
    /// Socket is being opened
    Connecting = 1,
    /// Socket is open
    Open = 2,
    /// Close requested, waiting for the transport to confirm it
    Closing = 3,
}

impl fmt::Display for RelayStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Connecting => write!(f, "Connecting"),
            Self::Open => write!(f, "Open"),
            Self::Closing => write!(f, "Closing"),
        }
    }
}

impl RelayStatus {
    /// Check if is [`RelayStatus::Open`]
    #[inline]
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open)
    }

    /// Check if is [`RelayStatus::Disconnected`]
    #[inline]
    pub fn is_disconnected(&self) -> bool {
        matches!(self, Self::Disconnected)
    }

    /// Check if a connection is open or being opened
    #[inline]
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Connecting | Self::Open)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_atomic_status_roundtrip() {
        let status = AtomicRelayStatus::default();
        assert_eq!(status.load(), RelayStatus::Disconnected);

        status.set(RelayStatus::Connecting);
        assert_eq!(status.load(), RelayStatus::Connecting);

        assert!(!status.compare_exchange(RelayStatus::Open, RelayStatus::Closing));
        assert!(status.compare_exchange(RelayStatus::Connecting, RelayStatus::Open));
        assert_eq!(status.load(), RelayStatus::Open);
    }

    #[test]
    fn test_status_helpers() {
        assert!(RelayStatus::Open.is_open());
        assert!(RelayStatus::Connecting.is_active());
        assert!(!RelayStatus::Closing.is_active());
        assert!(RelayStatus::Disconnected.is_disconnected());
        assert_eq!(RelayStatus::Closing.to_string(), "Closing");
    }
}
