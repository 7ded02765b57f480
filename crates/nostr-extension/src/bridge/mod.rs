// Copyright (c) 2022-2023 Yuki Kishimoto
// Copyright (c) 2023-2025 Rust Nostr Developers
// Distributed under the MIT software license

//! Request bridge
//!
//! Correlates requests crossing a context boundary with their responses.
//! Each request gets a fresh [`Uuid`]: responses may arrive in any order,
//! and a response arriving after its request timed out is dropped.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_utility::task;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::time;
use uuid::Uuid;

pub mod error;
pub mod message;

pub use self::error::Error;
pub use self::message::{
    BroadcastEnvelope, BroadcastKind, ErrorObject, RequestEnvelope, ResponseEnvelope,
};

type PendingResponseMap = HashMap<Uuid, oneshot::Sender<Result<Value, ErrorObject>>>;

/// Sending half of a context boundary
#[derive(Debug, Clone)]
pub struct RequestBridge {
    pending: Arc<Mutex<PendingResponseMap>>,
    outgoing: mpsc::UnboundedSender<RequestEnvelope>,
    timeout: Duration,
}

impl RequestBridge {
    /// Construct a new bridge
    ///
    /// Returns also the receiver of the requests, to be served by the other context.
    pub fn new(timeout: Duration) -> (Self, mpsc::UnboundedReceiver<RequestEnvelope>) {
        let (outgoing, rx) = mpsc::unbounded_channel();
        let bridge = Self {
            pending: Arc::new(Mutex::new(HashMap::new())),
            outgoing,
            timeout,
        };
        (bridge, rx)
    }

    /// Request timeout
    #[inline]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Handle to deliver responses to this bridge
    #[inline]
    pub fn responder(&self) -> BridgeResponder {
        BridgeResponder {
            pending: self.pending.clone(),
        }
    }

    /// Number of requests waiting for a response
    pub async fn pending(&self) -> usize {
        let pending = self.pending.lock().await;
        pending.len()
    }

    /// Send a request and wait for its response
    pub async fn call<S>(&self, method: S, params: Value) -> Result<Value, Error>
    where
        S: Into<String>,
    {
        self.send(RequestEnvelope::new(method, params)).await
    }

    /// Send an already built request and wait for its response
    pub async fn send(&self, request: RequestEnvelope) -> Result<Value, Error> {
        let id: Uuid = request.id;
        let method: String = request.method.clone();

        let (tx, rx) = oneshot::channel();

        {
            let mut pending = self.pending.lock().await;
            pending.insert(id, tx);
        }

        // Removes the entry on every exit path, including the caller dropping this future
        let _guard = PendingGuard {
            id,
            pending: self.pending.clone(),
        };

        tracing::debug!(id = %id, method = %method, "Sending request.");

        if self.outgoing.send(request).is_err() {
            return Err(Error::ChannelClosed);
        }

        match time::timeout(self.timeout, rx).await {
            Ok(Ok(Ok(result))) => Ok(result),
            Ok(Ok(Err(error))) => Err(Error::Remote(error)),
            Ok(Err(..)) => Err(Error::ChannelClosed),
            Err(..) => {
                tracing::warn!(id = %id, method = %method, "Request timed out.");
                Err(Error::RequestTimeout { method })
            }
        }
    }

    /// Deliver a response
    #[inline]
    pub async fn handle_response(&self, response: ResponseEnvelope) -> bool {
        self.responder().handle_response(response).await
    }
}

struct PendingGuard {
    id: Uuid,
    pending: Arc<Mutex<PendingResponseMap>>,
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        let id: Uuid = self.id;
        match self.pending.try_lock() {
            Ok(mut pending) => {
                pending.remove(&id);
            }
            Err(..) => {
                let pending = self.pending.clone();
                task::spawn(async move {
                    let mut pending = pending.lock().await;
                    pending.remove(&id);
                });
            }
        }
    }
}

/// Receiving half of a context boundary
///
/// Doesn't keep the request channel open.
#[derive(Debug, Clone)]
pub struct BridgeResponder {
    pending: Arc<Mutex<PendingResponseMap>>,
}

impl BridgeResponder {
    /// Deliver a response to the matching pending request.
    ///
    /// Returns `false` if no request is waiting for it (i.e. it already timed out).
    pub async fn handle_response(&self, response: ResponseEnvelope) -> bool {
        let id: Uuid = response.id;
        let mut pending = self.pending.lock().await;

        match pending.remove(&id) {
            Some(sender) => {
                let _ = sender.send(response.into_result());
                tracing::debug!(id = %id, "Forwarded response.");
                true
            }
            None => {
                tracing::warn!(id = %id, "No pending request found.");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn test_call_resolves() {
        let (bridge, mut rx) = RequestBridge::new(Duration::from_secs(10));
        let responder = bridge.responder();

        tokio::spawn(async move {
            while let Some(request) = rx.recv().await {
                let response = ResponseEnvelope::ok(request.id, json!({"echo": request.payload}));
                responder.handle_response(response).await;
            }
        });

        let res = bridge.call("getPublicKey", json!(1)).await.unwrap();
        assert_eq!(res, json!({"echo": 1}));
        assert_eq!(bridge.pending().await, 0);
    }

    #[tokio::test]
    async fn test_remote_error() {
        let (bridge, mut rx) = RequestBridge::new(Duration::from_secs(10));
        let responder = bridge.responder();

        tokio::spawn(async move {
            let request = rx.recv().await.unwrap();
            let response = ResponseEnvelope::err(request.id, ErrorObject::new(4, "no private key"));
            responder.handle_response(response).await;
        });

        match bridge.call("getPublicKey", Value::Null).await {
            Err(Error::Remote(e)) => {
                assert_eq!(e.code, 4);
                assert_eq!(e.message, "no private key");
            }
            res => panic!("unexpected result: {res:?}"),
        }
    }

    #[tokio::test]
    async fn test_out_of_order_responses() {
        let (bridge, mut rx) = RequestBridge::new(Duration::from_secs(10));
        let responder = bridge.responder();

        tokio::spawn(async move {
            let first = rx.recv().await.unwrap();
            let second = rx.recv().await.unwrap();
            // Answer the second request first
            responder
                .handle_response(ResponseEnvelope::ok(second.id, second.payload))
                .await;
            responder
                .handle_response(ResponseEnvelope::ok(first.id, first.payload))
                .await;
        });

        let (a, b) = tokio::join!(bridge.call("a", json!("a")), bridge.call("b", json!("b")));
        assert_eq!(a.unwrap(), json!("a"));
        assert_eq!(b.unwrap(), json!("b"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_response_is_dropped() {
        let (bridge, mut rx) = RequestBridge::new(Duration::from_secs(10));
        let responder = bridge.responder();

        let handle = tokio::spawn(async move {
            let request = rx.recv().await.unwrap();
            time::sleep(Duration::from_secs(11)).await;
            responder
                .handle_response(ResponseEnvelope::ok(request.id, json!({})))
                .await
        });

        match bridge.call("signEvent", json!({})).await {
            Err(Error::RequestTimeout { method }) => assert_eq!(method, "signEvent"),
            res => panic!("unexpected result: {res:?}"),
        }
        assert_eq!(bridge.pending().await, 0);

        // Delivered after the timeout: no matching entry
        assert!(!handle.await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_call_is_forgotten() {
        let (bridge, _rx) = RequestBridge::new(Duration::from_secs(30));

        // The caller gives up before the bridge timeout
        let res = time::timeout(
            Duration::from_secs(1),
            bridge.call("getPublicKey", Value::Null),
        )
        .await;
        assert!(res.is_err());

        time::sleep(Duration::from_secs(60)).await;
        assert_eq!(bridge.pending().await, 0);
    }

    #[tokio::test]
    async fn test_channel_closed() {
        let (bridge, rx) = RequestBridge::new(Duration::from_secs(10));
        drop(rx);

        assert!(matches!(
            bridge.call("getRelays", Value::Null).await,
            Err(Error::ChannelClosed)
        ));
        assert_eq!(bridge.pending().await, 0);
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(Error::ChannelClosed.code(), -1);
        assert_eq!(
            Error::RequestTimeout {
                method: String::from("getRelays")
            }
            .code(),
            -1
        );
        assert_eq!(Error::Remote(ErrorObject::new(3, "unsupported")).code(), 3);
    }
}
