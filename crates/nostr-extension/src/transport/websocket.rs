// Copyright (c) 2022-2023 Yuki Kishimoto
// Copyright (c) 2023-2025 Rust Nostr Developers
// Distributed under the MIT software license

//! WebSocket transport
//!
//! A relay connection only writes text frames and reads [`Frame`]s:
//! a transport hands out a [`RelaySocket`] made of a text sink and a frame stream.

use std::fmt;
use std::time::Duration;

use async_wsocket::futures_util::{future, SinkExt, StreamExt};
use async_wsocket::{ConnectionMode, Message, WebSocket};
use futures::{Sink, Stream};
use nostr::util::BoxedFuture;
use nostr::RelayUrl;

use super::error::TransportError;

/// Close code used when the peer sent a close frame without status
pub const CLOSE_NO_STATUS: u16 = 1005;

/// Writing half of a relay socket
pub type TextSink = Box<dyn Sink<String, Error = TransportError> + Send + Unpin>;
/// Reading half of a relay socket
pub type FrameStream = Box<dyn Stream<Item = Result<Frame, TransportError>> + Send + Unpin>;

/// Frame read from a relay socket
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Text frame
    Text(String),
    /// Binary frame
    Binary(Vec<u8>),
    /// Close frame
    Close {
        /// Close code ([`CLOSE_NO_STATUS`] if the peer didn't send one)
        code: u16,
        /// Close reason
        reason: String,
    },
}

impl Frame {
    /// Ping and pong are handled by the backend and yield `None`
    fn from_message(msg: Message) -> Option<Self> {
        match msg {
            Message::Text(text) => Some(Self::Text(text)),
            Message::Binary(data) => Some(Self::Binary(data)),
            Message::Close(Some(frame)) => Some(Self::Close {
                code: frame.code,
                reason: frame.reason,
            }),
            Message::Close(None) => Some(Self::Close {
                code: CLOSE_NO_STATUS,
                reason: String::new(),
            }),
            Message::Ping(..) | Message::Pong(..) => None,
        }
    }
}

/// Open socket to a relay
pub struct RelaySocket {
    /// Outgoing text frames
    pub sink: TextSink,
    /// Incoming frames
    pub stream: FrameStream,
}

impl fmt::Debug for RelaySocket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelaySocket").finish_non_exhaustive()
    }
}

/// WebSocket transport
///
/// Relay connections only talk to this trait, so the socket backend can be swapped
/// (i.e. an in-memory transport in tests).
pub trait WebSocketTransport: fmt::Debug + Send + Sync {
    /// Open a socket to `url`
    fn connect<'a>(
        &'a self,
        url: &'a RelayUrl,
        mode: &'a ConnectionMode,
        timeout: Duration,
    ) -> BoxedFuture<'a, Result<RelaySocket, TransportError>>;
}

/// Transport backed by `async-wsocket`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DefaultWebsocketTransport;

impl WebSocketTransport for DefaultWebsocketTransport {
    fn connect<'a>(
        &'a self,
        url: &'a RelayUrl,
        mode: &'a ConnectionMode,
        timeout: Duration,
    ) -> BoxedFuture<'a, Result<RelaySocket, TransportError>> {
        Box::pin(async move {
            let socket: WebSocket = WebSocket::connect(url.into(), mode, timeout)
                .await
                .map_err(TransportError::backend)?;

            let (tx, rx) = socket.split();

            // NOTE: no sink_map_err, it panics if polled again after an error
            let sink = tx.with(|text: String| {
                future::ready(Ok::<Message, TransportError>(Message::Text(text)))
            });
            let stream = rx.filter_map(|res| {
                future::ready(match res {
                    Ok(msg) => Frame::from_message(msg).map(Ok),
                    Err(e) => Some(Err(TransportError::backend(e))),
                })
            });

            Ok(RelaySocket {
                sink: Box::new(sink),
                stream: Box::new(stream),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use async_wsocket::message::CloseFrame;

    use super::*;

    #[test]
    fn test_frame_from_message() {
        assert_eq!(
            Frame::from_message(Message::Text(String::from("[\"EOSE\",\"sub\"]"))),
            Some(Frame::Text(String::from("[\"EOSE\",\"sub\"]")))
        );
        assert_eq!(
            Frame::from_message(Message::Close(Some(CloseFrame {
                code: 1001,
                reason: String::from("going away"),
            }))),
            Some(Frame::Close {
                code: 1001,
                reason: String::from("going away"),
            })
        );
        assert_eq!(
            Frame::from_message(Message::Close(None)),
            Some(Frame::Close {
                code: CLOSE_NO_STATUS,
                reason: String::new(),
            })
        );
        assert_eq!(Frame::from_message(Message::Ping(vec![1])), None);
    }
}
