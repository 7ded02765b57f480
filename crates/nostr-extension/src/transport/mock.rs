// Copyright (c) 2022-2023 Yuki Kishimoto
// Copyright (c) 2023-2025 Rust Nostr Developers
// Distributed under the MIT software license

//! In-memory transport
//!
//! Every [`MockTransport::connect`](WebSocketTransport::connect) call yields a [`MockSession`]
//! that plays the relay side of the socket.

use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use async_wsocket::ConnectionMode;
use futures::channel::mpsc as channel;
use futures::{Sink, StreamExt};
use nostr::util::BoxedFuture;
use nostr::RelayUrl;
use tokio::sync::mpsc;

use super::error::TransportError;
use super::websocket::{Frame, RelaySocket, WebSocketTransport, CLOSE_NO_STATUS};

type InboundSender = channel::UnboundedSender<Result<Frame, TransportError>>;

/// In-memory WebSocket transport
#[derive(Debug, Clone)]
pub struct MockTransport {
    sessions: mpsc::UnboundedSender<MockSession>,
    refuse: Arc<AtomicBool>,
}

impl MockTransport {
    /// Construct a new in-memory transport and the receiver of its sessions
    pub fn new() -> (Self, MockSessions) {
        let (tx, rx) = mpsc::unbounded_channel();
        let transport = Self {
            sessions: tx,
            refuse: Arc::new(AtomicBool::new(false)),
        };
        (transport, MockSessions { rx })
    }

    /// Make the next connection attempts fail
    pub fn refuse_connections(&self, refuse: bool) {
        self.refuse.store(refuse, Ordering::SeqCst);
    }
}

impl WebSocketTransport for MockTransport {
    fn connect<'a>(
        &'a self,
        url: &'a RelayUrl,
        _mode: &'a ConnectionMode,
        _timeout: Duration,
    ) -> BoxedFuture<'a, Result<RelaySocket, TransportError>> {
        Box::pin(async move {
            if self.refuse.load(Ordering::SeqCst) {
                return Err(TransportError::refused());
            }

            let (frames, sent) = channel::unbounded::<String>();
            let (inbound, received) = channel::unbounded::<Result<Frame, TransportError>>();

            let session = MockSession {
                url: url.clone(),
                sent,
                inbound: inbound.clone(),
            };

            self.sessions
                .send(session)
                .map_err(|_| TransportError::refused())?;

            Ok(RelaySocket {
                sink: Box::new(MockSink { frames, inbound }),
                stream: Box::new(received),
            })
        })
    }
}

/// Receiver of the sessions opened through a [`MockTransport`]
#[derive(Debug)]
pub struct MockSessions {
    rx: mpsc::UnboundedReceiver<MockSession>,
}

impl MockSessions {
    /// Wait for the next opened session
    pub async fn accept(&mut self) -> Option<MockSession> {
        self.rx.recv().await
    }

    /// Take an already opened session, without waiting
    pub fn try_accept(&mut self) -> Option<MockSession> {
        self.rx.try_recv().ok()
    }
}

/// Relay side of an in-memory socket
#[derive(Debug)]
pub struct MockSession {
    url: RelayUrl,
    sent: channel::UnboundedReceiver<String>,
    inbound: InboundSender,
}

impl MockSession {
    /// URL the client connected to
    #[inline]
    pub fn url(&self) -> &RelayUrl {
        &self.url
    }

    /// Deliver a text frame to the client
    pub fn send_text<S>(&self, text: S) -> bool
    where
        S: Into<String>,
    {
        self.inbound
            .unbounded_send(Ok(Frame::Text(text.into())))
            .is_ok()
    }

    /// Deliver a transport error to the client
    pub fn send_error(&self, error: TransportError) -> bool {
        self.inbound.unbounded_send(Err(error)).is_ok()
    }

    /// Next text frame written by the client.
    ///
    /// Returns `None` once the client closed the socket.
    pub async fn recv_text(&mut self) -> Option<String> {
        self.sent.next().await
    }

    /// Take the next text frame written by the client, without waiting
    pub fn try_recv_text(&mut self) -> Option<String> {
        self.sent.try_recv().ok()
    }

    /// Send a close frame without status code
    pub fn send_close(&self) -> bool {
        self.inbound
            .unbounded_send(Ok(Frame::Close {
                code: CLOSE_NO_STATUS,
                reason: String::new(),
            }))
            .is_ok()
    }

    /// Drop the socket from the relay side, without a close handshake
    pub fn close(self) {
        self.inbound.close_channel();
    }
}

struct MockSink {
    frames: channel::UnboundedSender<String>,
    inbound: InboundSender,
}

impl Sink<String> for MockSink {
    type Error = TransportError;

    fn poll_ready(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        if self.frames.is_closed() {
            Poll::Ready(Err(TransportError::backend("socket closed")))
        } else {
            Poll::Ready(Ok(()))
        }
    }

    fn start_send(self: Pin<&mut Self>, item: String) -> Result<(), Self::Error> {
        self.frames
            .unbounded_send(item)
            .map_err(|_| TransportError::backend("socket closed"))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn poll_close(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        // The relay acknowledges the close by ending the stream
        self.frames.close_channel();
        self.inbound.close_channel();
        Poll::Ready(Ok(()))
    }
}
