// Copyright (c) 2022-2023 Yuki Kishimoto
// Copyright (c) 2023-2025 Rust Nostr Developers
// Distributed under the MIT software license

//! Extension options

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::relay::RelayConnectionOptions;

/// Default relay
pub const DEFAULT_RELAY_URL: &str = "wss://t-relay.nextblock.app";
/// Default timeout of the page -> extension requests
pub const DEFAULT_PAGE_TIMEOUT: Duration = Duration::from_secs(30);
/// Default timeout of the content script -> background requests
pub const DEFAULT_CONTENT_TIMEOUT: Duration = Duration::from_secs(10);

/// Extension options
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtensionOptions {
    pub(crate) default_relay: String,
    pub(crate) page_timeout: Duration,
    pub(crate) content_timeout: Duration,
    pub(crate) nip42_auto_authentication: bool,
    pub(crate) connect_on_startup: bool,
    #[serde(skip)]
    pub(crate) relay: RelayConnectionOptions,
}

impl Default for ExtensionOptions {
    fn default() -> Self {
        Self {
            default_relay: DEFAULT_RELAY_URL.to_string(),
            page_timeout: DEFAULT_PAGE_TIMEOUT,
            content_timeout: DEFAULT_CONTENT_TIMEOUT,
            nip42_auto_authentication: true,
            connect_on_startup: true,
            relay: RelayConnectionOptions::default(),
        }
    }
}

impl ExtensionOptions {
    /// New default options
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Relay used for challenges that don't name one and as default relay policy
    pub fn default_relay<S>(mut self, url: S) -> Self
    where
        S: Into<String>,
    {
        self.default_relay = url.into();
        self
    }

    /// Timeout of the requests issued by the page (default: 30 secs)
    #[inline]
    pub fn page_timeout(mut self, timeout: Duration) -> Self {
        self.page_timeout = timeout;
        self
    }

    /// Timeout of the requests forwarded by the content script (default: 10 secs)
    #[inline]
    pub fn content_timeout(mut self, timeout: Duration) -> Self {
        self.content_timeout = timeout;
        self
    }

    /// Auto authenticate to relays (default: true)
    ///
    /// <https://github.com/nostr-protocol/nips/blob/master/42.md>
    #[inline]
    pub fn automatic_authentication(mut self, enabled: bool) -> Self {
        self.nip42_auto_authentication = enabled;
        self
    }

    /// Connect to the default relay on startup, if a key exists (default: true)
    #[inline]
    pub fn connect_on_startup(mut self, enabled: bool) -> Self {
        self.connect_on_startup = enabled;
        self
    }

    /// Relay connection options
    #[inline]
    pub fn relay_options(mut self, opts: RelayConnectionOptions) -> Self {
        self.relay = opts;
        self
    }

    /// Page request timeout
    #[inline]
    pub fn get_page_timeout(&self) -> Duration {
        self.page_timeout
    }

    /// Content script request timeout
    #[inline]
    pub fn get_content_timeout(&self) -> Duration {
        self.content_timeout
    }
}
