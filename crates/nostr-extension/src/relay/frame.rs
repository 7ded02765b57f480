// Copyright (c) 2022-2023 Yuki Kishimoto
// Copyright (c) 2023-2025 Rust Nostr Developers
// Distributed under the MIT software license

//! Relay frames

use nostr::{Event, RelayUrl};
use serde::ser::{SerializeSeq, Serializer};
use serde::Serialize;
use serde_json::Value;

use super::error::Error;

/// Inbound relay frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayFrame {
    /// `["AUTH", <challenge>, <relay-url>?]`
    Auth {
        /// Challenge
        challenge: String,
        /// Relay url, if the relay included one
        relay: Option<String>,
    },
    /// Any other frame, kept as the raw array
    Other(Vec<Value>),
}

impl RelayFrame {
    /// Parse a text frame
    pub fn from_json<T>(json: T) -> Result<Self, Error>
    where
        T: AsRef<[u8]>,
    {
        let value: Value = serde_json::from_slice(json.as_ref())?;

        let array: Vec<Value> = match value {
            Value::Array(array) => array,
            _ => return Err(Error::protocol("frame is not a JSON array")),
        };

        let tag: &str = match array.first() {
            Some(Value::String(tag)) => tag,
            Some(..) => return Err(Error::protocol("frame tag is not a string")),
            None => return Err(Error::protocol("empty frame")),
        };

        if tag != "AUTH" {
            return Ok(Self::Other(array));
        }

        let challenge: String = match array.get(1) {
            Some(Value::String(challenge)) if challenge.is_empty() => {
                return Err(Error::protocol("empty AUTH challenge"));
            }
            Some(Value::String(challenge)) => challenge.clone(),
            _ => return Err(Error::protocol("AUTH challenge is not a string")),
        };

        let relay: Option<String> = match array.get(2) {
            Some(Value::String(url)) => Some(url.clone()),
            Some(Value::Null) | None => None,
            Some(..) => return Err(Error::protocol("AUTH relay url is not a string")),
        };

        Ok(Self::Auth { challenge, relay })
    }

    /// Frame tag (first array element)
    pub fn tag(&self) -> Option<&str> {
        match self {
            Self::Auth { .. } => Some("AUTH"),
            Self::Other(array) => array.first().and_then(Value::as_str),
        }
    }
}

/// An `AUTH` challenge read from a relay socket
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChallengeFrame {
    /// Url of the connection that received the frame
    pub relay_url: RelayUrl,
    /// Challenge
    pub challenge: String,
}

/// Outbound client frame
#[derive(Debug, Clone, PartialEq)]
pub enum ClientFrame {
    /// `["AUTH", <signed event>]`
    Auth(Box<Event>),
    /// `["EVENT", <event>]`
    Event(Box<Event>),
    /// `["REQ", <subscription id>, <filter>...]`
    Req {
        /// Subscription ID
        subscription_id: String,
        /// Filters, passed through as JSON
        filters: Vec<Value>,
    },
    /// `["CLOSE", <subscription id>]`
    Close(String),
}

impl ClientFrame {
    /// Construct an `AUTH` frame
    #[inline]
    pub fn auth(event: Event) -> Self {
        Self::Auth(Box::new(event))
    }

    /// Construct an `EVENT` frame
    #[inline]
    pub fn event(event: Event) -> Self {
        Self::Event(Box::new(event))
    }

    /// Construct a `REQ` frame
    pub fn req<S, I>(subscription_id: S, filters: I) -> Self
    where
        S: Into<String>,
        I: IntoIterator<Item = Value>,
    {
        Self::Req {
            subscription_id: subscription_id.into(),
            filters: filters.into_iter().collect(),
        }
    }

    /// Construct a `CLOSE` frame
    #[inline]
    pub fn close<S>(subscription_id: S) -> Self
    where
        S: Into<String>,
    {
        Self::Close(subscription_id.into())
    }

    /// Serialize as JSON string
    pub fn as_json(&self) -> Result<String, Error> {
        Ok(serde_json::to_string(self)?)
    }
}

impl Serialize for ClientFrame {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::Auth(event) => {
                let mut seq = serializer.serialize_seq(Some(2))?;
                seq.serialize_element("AUTH")?;
                seq.serialize_element(event)?;
                seq.end()
            }
            Self::Event(event) => {
                let mut seq = serializer.serialize_seq(Some(2))?;
                seq.serialize_element("EVENT")?;
                seq.serialize_element(event)?;
                seq.end()
            }
            Self::Req {
                subscription_id,
                filters,
            } => {
                let mut seq = serializer.serialize_seq(Some(2 + filters.len()))?;
                seq.serialize_element("REQ")?;
                seq.serialize_element(subscription_id)?;
                for filter in filters.iter() {
                    seq.serialize_element(filter)?;
                }
                seq.end()
            }
            Self::Close(subscription_id) => {
                let mut seq = serializer.serialize_seq(Some(2))?;
                seq.serialize_element("CLOSE")?;
                seq.serialize_element(subscription_id)?;
                seq.end()
            }
        }
    }
}
