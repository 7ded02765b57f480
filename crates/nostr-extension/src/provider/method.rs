// Copyright (c) 2022-2023 Yuki Kishimoto
// Copyright (c) 2023-2025 Rust Nostr Developers
// Distributed under the MIT software license

//! NIP-07 methods

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Unknown NIP-07 method
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsupportedMethod(pub String);

impl fmt::Display for UnsupportedMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unsupported method: {}", self.0)
    }
}

impl std::error::Error for UnsupportedMethod {}

/// NIP-07 method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Nip07Method {
    /// `getPublicKey`
    GetPublicKey,
    /// `signEvent`
    SignEvent,
    /// `getRelays`
    GetRelays,
    /// `nip04.encrypt`
    Nip04Encrypt,
    /// `nip04.decrypt`
    Nip04Decrypt,
}

impl Nip07Method {
    /// Wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GetPublicKey => "getPublicKey",
            Self::SignEvent => "signEvent",
            Self::GetRelays => "getRelays",
            Self::Nip04Encrypt => "nip04.encrypt",
            Self::Nip04Decrypt => "nip04.decrypt",
        }
    }
}

impl fmt::Display for Nip07Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Nip07Method {
    type Err = UnsupportedMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "getPublicKey" => Ok(Self::GetPublicKey),
            "signEvent" => Ok(Self::SignEvent),
            "getRelays" => Ok(Self::GetRelays),
            "nip04.encrypt" => Ok(Self::Nip04Encrypt),
            "nip04.decrypt" => Ok(Self::Nip04Decrypt),
            other => Err(UnsupportedMethod(other.to_string())),
        }
    }
}

impl Serialize for Nip07Method {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Nip07Method {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let method: String = String::deserialize(deserializer)?;
        Self::from_str(&method).map_err(serde::de::Error::custom)
    }
}
