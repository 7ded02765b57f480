// Copyright (c) 2022-2023 Yuki Kishimoto
// Copyright (c) 2023-2025 Rust Nostr Developers
// Distributed under the MIT software license

use std::sync::Arc;
use std::time::Duration;

use async_utility::{task, time};
use async_wsocket::futures_util::{SinkExt, StreamExt};
use nostr::RelayUrl;
use tokio::sync::{broadcast, mpsc, Mutex, MutexGuard, Notify};

use super::error::Error;
use super::frame::{ChallengeFrame, RelayFrame};
use super::notification::RelayNotification;
use super::options::{RelayConnectionOptions, OUTGOING_CHANNEL_SIZE};
use super::status::{AtomicRelayStatus, RelayStatus};
use crate::transport::websocket::{Frame, FrameStream, RelaySocket, TextSink, WebSocketTransport};

/// Normal closure
const CLOSE_NORMAL: u16 = 1000;
/// Connection dropped without a close frame
const CLOSE_ABNORMAL: u16 = 1006;

enum Exit {
    Terminated,
    ClosedByPeer { code: u16, reason: String },
    SenderFailed(Error),
}

#[derive(Debug)]
struct Outgoing {
    tx: mpsc::Sender<String>,
    rx: Mutex<mpsc::Receiver<String>>,
}

#[derive(Debug)]
pub(super) struct InnerRelayConnection {
    pub(super) url: RelayUrl,
    pub(super) opts: RelayConnectionOptions,
    transport: Arc<dyn WebSocketTransport>,
    status: AtomicRelayStatus,
    outgoing: Outgoing,
    terminate: Notify,
    notification_sender: broadcast::Sender<RelayNotification>,
    challenge_sender: Option<mpsc::UnboundedSender<ChallengeFrame>>,
}

impl InnerRelayConnection {
    pub(super) fn new(
        url: RelayUrl,
        transport: Arc<dyn WebSocketTransport>,
        opts: RelayConnectionOptions,
        notification_sender: broadcast::Sender<RelayNotification>,
        challenge_sender: Option<mpsc::UnboundedSender<ChallengeFrame>>,
    ) -> Self {
        let (tx, rx) = mpsc::channel(OUTGOING_CHANNEL_SIZE);

        Self {
            url,
            opts,
            transport,
            status: AtomicRelayStatus::default(),
            outgoing: Outgoing {
                tx,
                rx: Mutex::new(rx),
            },
            terminate: Notify::new(),
            notification_sender,
            challenge_sender,
        }
    }

    #[inline]
    pub(super) fn status(&self) -> RelayStatus {
        self.status.load()
    }

    fn set_status(&self, status: RelayStatus) {
        self.status.set(status);
        tracing::debug!(url = %self.url, status = %status, "Relay status changed.");
    }

    #[inline]
    pub(super) fn notifications(&self) -> broadcast::Receiver<RelayNotification> {
        self.notification_sender.subscribe()
    }

    fn send_notification(&self, notification: RelayNotification) {
        // An error only means that nobody is listening
        let _ = self.notification_sender.send(notification);
    }

    fn send_error<S>(&self, error: S)
    where
        S: Into<String>,
    {
        self.send_notification(RelayNotification::Error {
            relay_url: self.url.clone(),
            error: error.into(),
        });
    }

    pub(super) fn spawn_connection_task(self: &Arc<Self>) {
        if !self
            .status
            .compare_exchange(RelayStatus::Disconnected, RelayStatus::Connecting)
        {
            tracing::debug!(url = %self.url, status = %self.status(), "Connection already active, skipping connect.");
            return;
        }

        tracing::debug!(url = %self.url, "Connecting to relay.");

        let relay: Arc<Self> = Arc::clone(self);
        task::spawn(async move { relay.connection_task().await });
    }

    async fn connection_task(&self) {
        let mut rx = self.outgoing.rx.lock().await;

        // Nothing queued while disconnected must leak into the new socket
        while rx.try_recv().is_ok() {}

        match self.try_connect().await {
            Ok(socket) => self.post_connection(socket, &mut rx).await,
            Err(Error::TerminationRequest) => {
                tracing::debug!(url = %self.url, "Connection attempt aborted.");
                self.set_disconnected(CLOSE_NORMAL, String::new());
            }
            Err(e) => {
                tracing::error!(url = %self.url, error = %e, "Connection failed.");
                self.send_error(e.to_string());
                self.set_disconnected(CLOSE_ABNORMAL, e.to_string());
            }
        }
    }

    async fn try_connect(&self) -> Result<RelaySocket, Error> {
        let timeout: Duration = self.opts.connection_timeout;

        tokio::select! {
            res = self.transport.connect(&self.url, &self.opts.connection_mode, timeout) => Ok(res?),
            _ = self.handle_terminate() => Err(Error::TerminationRequest),
        }
    }

    async fn post_connection(
        &self,
        socket: RelaySocket,
        rx: &mut MutexGuard<'_, mpsc::Receiver<String>>,
    ) {
        let RelaySocket {
            sink: mut ws_tx,
            stream: mut ws_rx,
        } = socket;

        // A disconnect request may have landed while the transport was completing the handshake
        if !self
            .status
            .compare_exchange(RelayStatus::Connecting, RelayStatus::Open)
        {
            let _ = close_ws(&mut ws_tx, self.opts.close_timeout).await;
            self.set_disconnected(CLOSE_NORMAL, String::new());
            return;
        }

        tracing::info!(url = %self.url, "Connected to relay.");
        self.send_notification(RelayNotification::Connected {
            relay_url: self.url.clone(),
        });

        let exit: Exit = tokio::select! {
            res = self.sender_message_handler(&mut ws_tx, rx) => match res {
                Ok(()) => Exit::Terminated,
                Err(e) => Exit::SenderFailed(e),
            },
            (code, reason) = self.receiver_message_handler(&mut ws_rx) => Exit::ClosedByPeer { code, reason },
            _ = self.handle_terminate() => Exit::Terminated,
        };

        let (code, reason) = match exit {
            Exit::Terminated => {
                self.set_status(RelayStatus::Closing);

                if let Err(e) = close_ws(&mut ws_tx, self.opts.close_timeout).await {
                    tracing::error!(url = %self.url, error = %e, "Can't close WebSocket connection.");
                }

                // Wait for the transport to confirm the close
                match time::timeout(Some(self.opts.close_timeout), wait_close(&mut ws_rx)).await {
                    Some(Some((code, reason))) => (code, reason),
                    Some(None) => (CLOSE_NORMAL, String::new()),
                    None => {
                        tracing::warn!(url = %self.url, "Close not confirmed in time.");
                        (CLOSE_NORMAL, String::new())
                    }
                }
            }
            Exit::ClosedByPeer { code, reason } => {
                tracing::info!(url = %self.url, code = code, reason = %reason, "Connection closed by peer.");
                let _ = close_ws(&mut ws_tx, self.opts.close_timeout).await;
                (code, reason)
            }
            Exit::SenderFailed(e) => {
                tracing::error!(url = %self.url, error = %e, "Relay sender exited with error.");
                self.send_error(e.to_string());
                let _ = close_ws(&mut ws_tx, self.opts.close_timeout).await;
                (CLOSE_ABNORMAL, e.to_string())
            }
        };

        self.set_disconnected(code, reason);
    }

    fn set_disconnected(&self, code: u16, reason: String) {
        self.set_status(RelayStatus::Disconnected);
        self.send_notification(RelayNotification::Disconnected {
            relay_url: self.url.clone(),
            code,
            reason,
        });
    }

    async fn sender_message_handler(
        &self,
        ws_tx: &mut TextSink,
        rx: &mut MutexGuard<'_, mpsc::Receiver<String>>,
    ) -> Result<(), Error> {
        while let Some(json) = rx.recv().await {
            tracing::debug!("Sending '{json}' to '{}' (size: {} bytes)", self.url, json.len());
            send_ws_msg(ws_tx, json, self.opts.send_timeout).await?;
        }

        Ok(())
    }

    async fn receiver_message_handler(&self, ws_rx: &mut FrameStream) -> (u16, String) {
        while let Some(frame) = ws_rx.next().await {
            match frame {
                Ok(Frame::Text(json)) => self.handle_relay_message(&json),
                Ok(Frame::Binary(..)) => {
                    tracing::warn!(url = %self.url, "Binary messages aren't supported.");
                }
                Ok(Frame::Close { code, reason }) => return (code, reason),
                Err(e) => {
                    // The transport's own close sequence ends the stream, if any
                    tracing::error!(url = %self.url, error = %e, "WebSocket error.");
                    self.send_error(e.to_string());
                }
            }
        }

        (CLOSE_ABNORMAL, String::from("connection lost"))
    }

    fn handle_relay_message(&self, json: &str) {
        tracing::debug!(url = %self.url, "Received message (size: {} bytes)", json.len());

        match RelayFrame::from_json(json) {
            Ok(RelayFrame::Auth { challenge, .. }) => match &self.challenge_sender {
                Some(tx) => {
                    let frame = ChallengeFrame {
                        relay_url: self.url.clone(),
                        challenge,
                    };
                    if tx.send(frame).is_err() {
                        tracing::warn!(url = %self.url, "Challenge handler is gone, dropping AUTH frame.");
                    }
                }
                None => {
                    tracing::warn!(url = %self.url, "No challenge handler attached, dropping AUTH frame.");
                }
            },
            Ok(RelayFrame::Other(message)) => {
                self.send_notification(RelayNotification::Message {
                    relay_url: self.url.clone(),
                    message,
                });
            }
            Err(e) => {
                tracing::warn!(url = %self.url, error = %e, "Dropping malformed frame.");
                self.send_error(e.to_string());
            }
        }
    }

    /// Wait for a disconnect request.
    ///
    /// Permits left over from a request that raced with a natural close are skipped.
    async fn handle_terminate(&self) {
        loop {
            self.terminate.notified().await;

            if self.status() == RelayStatus::Closing {
                tracing::debug!(url = %self.url, "Received termination request.");
                return;
            }
        }
    }

    pub(super) fn enqueue(&self, json: String) -> bool {
        if !self.status().is_open() {
            tracing::warn!(url = %self.url, "Cannot send message: not connected.");
            self.send_error("Cannot send message: not connected");
            return false;
        }

        match self.outgoing.tx.try_send(json) {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(url = %self.url, error = %e, "Cannot send message.");
                self.send_error(format!("Cannot send message: {e}"));
                false
            }
        }
    }

    pub(super) fn report_error<S>(&self, error: S)
    where
        S: Into<String>,
    {
        self.send_error(error);
    }

    pub(super) fn disconnect(&self) {
        let closing: bool = self
            .status
            .compare_exchange(RelayStatus::Open, RelayStatus::Closing)
            || self
                .status
                .compare_exchange(RelayStatus::Connecting, RelayStatus::Closing);

        if closing {
            tracing::debug!(url = %self.url, "Disconnect requested.");
            self.terminate.notify_one();
        }
    }
}

async fn wait_close(ws_rx: &mut FrameStream) -> Option<(u16, String)> {
    while let Some(frame) = ws_rx.next().await {
        if let Ok(Frame::Close { code, reason }) = frame {
            return Some((code, reason));
        }
    }
    None
}

/// Send WebSocket message with timeout
async fn send_ws_msg(tx: &mut TextSink, json: String, timeout: Duration) -> Result<(), Error> {
    match time::timeout(Some(timeout), tx.send(json)).await {
        Some(res) => Ok(res?),
        None => Err(Error::Timeout),
    }
}

/// Close WebSocket with timeout
async fn close_ws(tx: &mut TextSink, timeout: Duration) -> Result<(), Error> {
    match time::timeout(Some(timeout), tx.close()).await {
        Some(res) => Ok(res?),
        None => Err(Error::Timeout),
    }
}
