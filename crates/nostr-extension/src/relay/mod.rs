// Copyright (c) 2022-2023 Yuki Kishimoto
// Copyright (c) 2023-2025 Rust Nostr Developers
// Distributed under the MIT software license

//! Relay connection

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_utility::time;
use nostr::RelayUrl;
use serde::Serialize;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc};

pub mod error;
pub mod frame;
mod inner;
pub mod notification;
pub mod options;
pub mod registry;
mod status;

pub use self::error::Error;
pub use self::frame::{ChallengeFrame, ClientFrame, RelayFrame};
use self::inner::InnerRelayConnection;
pub use self::notification::RelayNotification;
pub use self::options::RelayConnectionOptions;
pub use self::registry::RelayRegistry;
pub use self::status::RelayStatus;
use crate::transport::websocket::{DefaultWebsocketTransport, WebSocketTransport};

/// Connection to a single relay
///
/// No automatic reconnection: after a close the connection stays [`RelayStatus::Disconnected`]
/// until [`RelayConnection::connect`] is called again.
#[derive(Clone)]
pub struct RelayConnection {
    inner: Arc<InnerRelayConnection>,
}

impl fmt::Debug for RelayConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelayConnection")
            .field("url", &self.inner.url)
            .field("status", &self.inner.status())
            .finish()
    }
}

impl PartialEq for RelayConnection {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for RelayConnection {}

impl RelayConnection {
    /// New connection using the default websocket transport
    #[inline]
    pub fn new(url: RelayUrl) -> Self {
        Self::with_opts(url, DefaultWebsocketTransport, RelayConnectionOptions::default())
    }

    /// New connection with custom transport and options
    pub fn with_opts<T>(url: RelayUrl, transport: T, opts: RelayConnectionOptions) -> Self
    where
        T: WebSocketTransport + 'static,
    {
        let (notification_sender, ..) = broadcast::channel(opts.notification_channel_size);
        Self::internal_new(url, Arc::new(transport), opts, notification_sender, None)
    }

    pub(crate) fn internal_new(
        url: RelayUrl,
        transport: Arc<dyn WebSocketTransport>,
        opts: RelayConnectionOptions,
        notification_sender: broadcast::Sender<RelayNotification>,
        challenge_sender: Option<mpsc::UnboundedSender<ChallengeFrame>>,
    ) -> Self {
        Self {
            inner: Arc::new(InnerRelayConnection::new(
                url,
                transport,
                opts,
                notification_sender,
                challenge_sender,
            )),
        }
    }

    /// Relay url
    #[inline]
    pub fn url(&self) -> &RelayUrl {
        &self.inner.url
    }

    /// Connection options
    #[inline]
    pub fn opts(&self) -> &RelayConnectionOptions {
        &self.inner.opts
    }

    /// Current status
    #[inline]
    pub fn status(&self) -> RelayStatus {
        self.inner.status()
    }

    /// Check if the socket is open
    #[inline]
    pub fn is_connected(&self) -> bool {
        self.status().is_open()
    }

    /// Subscribe to notifications
    ///
    /// When the connection is managed by a [`RelayRegistry`], the channel is shared by all relays.
    #[inline]
    pub fn notifications(&self) -> broadcast::Receiver<RelayNotification> {
        self.inner.notifications()
    }

    /// Open the socket
    ///
    /// No-op if the connection is already open or being opened.
    /// The outcome is reported through [`RelayNotification`]s.
    #[inline]
    pub fn connect(&self) {
        self.inner.spawn_connection_task();
    }

    /// Serialize `msg` and write it to the socket.
    ///
    /// Returns `false` and emits a [`RelayNotification::Error`] if the socket isn't open:
    /// messages are never buffered while disconnected.
    pub fn send<T>(&self, msg: &T) -> bool
    where
        T: Serialize + ?Sized,
    {
        match serde_json::to_string(msg) {
            Ok(json) => self.inner.enqueue(json),
            Err(e) => {
                tracing::error!(url = %self.url(), error = %e, "Cannot serialize message.");
                self.inner.report_error(e.to_string());
                false
            }
        }
    }

    /// Request the transport to close the socket
    ///
    /// The status becomes [`RelayStatus::Closing`] and then, once the transport confirmed, [`RelayStatus::Disconnected`].
    #[inline]
    pub fn disconnect(&self) {
        self.inner.disconnect();
    }

    /// Wait until the status is [`RelayStatus::Disconnected`]
    ///
    /// Returns `false` if `timeout` elapsed first.
    pub async fn wait_for_disconnection(&self, timeout: Duration) -> bool {
        let mut notifications = self.notifications();

        if self.status().is_disconnected() {
            return true;
        }

        time::timeout(Some(timeout), async {
            loop {
                match notifications.recv().await {
                    Ok(RelayNotification::Disconnected { relay_url, .. })
                        if &relay_url == self.url() =>
                    {
                        break;
                    }
                    Ok(..) => {}
                    Err(RecvError::Lagged(..)) => {
                        if self.status().is_disconnected() {
                            break;
                        }
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
        .await
        .is_some()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;

    use super::*;
    use crate::transport::mock::{MockSession, MockSessions, MockTransport};

    fn url() -> RelayUrl {
        RelayUrl::parse("wss://relay.example.com").unwrap()
    }

    async fn open_connection() -> (
        RelayConnection,
        MockSession,
        MockSessions,
        broadcast::Receiver<RelayNotification>,
    ) {
        let (transport, mut sessions) = MockTransport::new();
        let relay = RelayConnection::with_opts(url(), transport, RelayConnectionOptions::default());
        let mut notifications = relay.notifications();

        relay.connect();
        let session = sessions.accept().await.unwrap();

        let notification = notifications.recv().await.unwrap();
        assert_eq!(notification, RelayNotification::Connected { relay_url: url() });
        assert_eq!(relay.status(), RelayStatus::Open);

        (relay, session, sessions, notifications)
    }

    #[tokio::test]
    async fn test_connect_and_send() {
        let (relay, mut session, _sessions, _notifications) = open_connection().await;

        assert_eq!(session.url(), &url());

        assert!(relay.send(&json!(["EVENT", {"kind": 1}])));
        assert_eq!(
            session.recv_text().await.unwrap(),
            r#"["EVENT",{"kind":1}]"#
        );

        assert!(relay.send(&ClientFrame::close("sub1")));
        assert_eq!(session.recv_text().await.unwrap(), r#"["CLOSE","sub1"]"#);
    }

    #[tokio::test]
    async fn test_connect_is_noop_when_open() {
        let (relay, _session, mut sessions, _notifications) = open_connection().await;

        relay.connect();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(sessions.try_accept().is_none());
        assert!(relay.is_connected());
    }

    #[tokio::test]
    async fn test_send_while_disconnected() {
        let (transport, _sessions) = MockTransport::new();
        let relay = RelayConnection::with_opts(url(), transport, RelayConnectionOptions::default());
        let mut notifications = relay.notifications();

        assert_eq!(relay.status(), RelayStatus::Disconnected);
        assert!(!relay.send(&json!(["EVENT", {}])));

        match notifications.recv().await.unwrap() {
            RelayNotification::Error { relay_url, error } => {
                assert_eq!(relay_url, url());
                assert_eq!(error, "Cannot send message: not connected");
            }
            n => panic!("unexpected notification: {n:?}"),
        }
    }

    #[tokio::test]
    async fn test_inbound_frames() {
        let (_relay, session, _sessions, mut notifications) = open_connection().await;

        session.send_text(r#"["NOTICE","hello"]"#);
        assert_eq!(
            notifications.recv().await.unwrap(),
            RelayNotification::Message {
                relay_url: url(),
                message: vec![json!("NOTICE"), json!("hello")],
            }
        );

        // Malformed frames are reported and dropped, the socket stays open
        session.send_text("{not json");
        assert!(matches!(
            notifications.recv().await.unwrap(),
            RelayNotification::Error { .. }
        ));
        session.send_text(r#"["AUTH",1]"#);
        assert!(matches!(
            notifications.recv().await.unwrap(),
            RelayNotification::Error { .. }
        ));

        session.send_text(r#"["EOSE","sub1"]"#);
        assert!(matches!(
            notifications.recv().await.unwrap(),
            RelayNotification::Message { .. }
        ));
    }

    #[tokio::test]
    async fn test_auth_frame_is_routed_to_challenge_handler() {
        let (transport, mut sessions) = MockTransport::new();
        let (notification_sender, mut notifications) = broadcast::channel(16);
        let (challenge_tx, mut challenge_rx) = mpsc::unbounded_channel();
        let relay = RelayConnection::internal_new(
            url(),
            Arc::new(transport),
            RelayConnectionOptions::default(),
            notification_sender,
            Some(challenge_tx),
        );

        relay.connect();
        let session = sessions.accept().await.unwrap();
        assert!(matches!(
            notifications.recv().await.unwrap(),
            RelayNotification::Connected { .. }
        ));

        session.send_text(r#"["AUTH","abc123"]"#);
        let frame = challenge_rx.recv().await.unwrap();
        assert_eq!(frame.relay_url, url());
        assert_eq!(frame.challenge, "abc123");

        // Not forwarded as a generic message
        assert!(notifications.try_recv().is_err());

        // An empty challenge is reported like any other malformed frame
        session.send_text(r#"["AUTH",""]"#);
        assert!(matches!(
            notifications.recv().await.unwrap(),
            RelayNotification::Error { .. }
        ));
        assert!(challenge_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_disconnect() {
        let (relay, mut session, _sessions, mut notifications) = open_connection().await;

        relay.disconnect();

        assert_eq!(
            notifications.recv().await.unwrap(),
            RelayNotification::Disconnected {
                relay_url: url(),
                code: 1000,
                reason: String::new(),
            }
        );
        assert_eq!(relay.status(), RelayStatus::Disconnected);
        assert!(session.recv_text().await.is_none());

        // Sending after the close is not buffered
        assert!(!relay.send(&json!(["EVENT", {}])));
    }

    #[tokio::test]
    async fn test_closed_by_peer() {
        let (relay, session, _sessions, mut notifications) = open_connection().await;

        session.send_close();
        assert_eq!(
            notifications.recv().await.unwrap(),
            RelayNotification::Disconnected {
                relay_url: url(),
                code: 1005,
                reason: String::new(),
            }
        );
        assert_eq!(relay.status(), RelayStatus::Disconnected);
    }

    #[tokio::test]
    async fn test_connection_lost_and_reconnect() {
        let (relay, session, mut sessions, mut notifications) = open_connection().await;

        session.close();
        match notifications.recv().await.unwrap() {
            RelayNotification::Disconnected { code, .. } => assert_eq!(code, 1006),
            n => panic!("unexpected notification: {n:?}"),
        }

        // Reconnection is caller-initiated
        relay.connect();
        let mut session = sessions.accept().await.unwrap();
        assert!(matches!(
            notifications.recv().await.unwrap(),
            RelayNotification::Connected { .. }
        ));
        assert!(relay.send(&json!(["REQ", "sub1", {}])));
        assert_eq!(session.recv_text().await.unwrap(), r#"["REQ","sub1",{}]"#);
    }

    #[tokio::test]
    async fn test_transport_error_keeps_socket_open() {
        let (relay, session, _sessions, mut notifications) = open_connection().await;

        session.send_error(crate::transport::error::TransportError::backend("boom"));
        match notifications.recv().await.unwrap() {
            RelayNotification::Error { error, .. } => assert_eq!(error, "boom"),
            n => panic!("unexpected notification: {n:?}"),
        }
        assert!(relay.is_connected());
    }

    #[tokio::test]
    async fn test_connection_refused() {
        let (transport, _sessions) = MockTransport::new();
        transport.refuse_connections(true);
        let relay = RelayConnection::with_opts(url(), transport, RelayConnectionOptions::default());
        let mut notifications = relay.notifications();

        relay.connect();

        assert!(matches!(
            notifications.recv().await.unwrap(),
            RelayNotification::Error { .. }
        ));
        match notifications.recv().await.unwrap() {
            RelayNotification::Disconnected { code, .. } => assert_eq!(code, 1006),
            n => panic!("unexpected notification: {n:?}"),
        }
        assert_eq!(relay.status(), RelayStatus::Disconnected);
    }
}
