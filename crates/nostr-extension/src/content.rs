// Copyright (c) 2022-2023 Yuki Kishimoto
// Copyright (c) 2023-2025 Rust Nostr Developers
// Distributed under the MIT software license

//! Content script
//!
//! Forwards page requests to the background context through its own bridge.

use crate::bridge::{RequestBridge, RequestEnvelope, ResponseEnvelope};

/// Page -> background forwarder
#[derive(Debug, Clone)]
pub struct ContentScript {
    bridge: RequestBridge,
}

impl ContentScript {
    /// New forwarder
    #[inline]
    pub fn new(bridge: RequestBridge) -> Self {
        Self { bridge }
    }

    /// Forward a request and build the response for the page.
    ///
    /// Errors returned by the background pass through unchanged,
    /// failures of this hop (timeout, closed channel) become code `-1`.
    pub async fn forward(&self, request: RequestEnvelope) -> ResponseEnvelope {
        let id = request.id;

        match self.bridge.send(request).await {
            Ok(result) => ResponseEnvelope::ok(id, result),
            Err(e) => {
                tracing::debug!(id = %id, error = %e, "Request failed.");
                ResponseEnvelope::err(id, e.into_error_object())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;

    use super::*;
    use crate::bridge::ErrorObject;

    #[tokio::test]
    async fn test_remote_error_passes_through() {
        let (bridge, mut rx) = RequestBridge::new(Duration::from_secs(10));
        let responder = bridge.responder();
        let content = ContentScript::new(bridge);

        tokio::spawn(async move {
            let request = rx.recv().await.unwrap();
            responder
                .handle_response(ResponseEnvelope::err(
                    request.id,
                    ErrorObject::new(ErrorObject::UNSUPPORTED_METHOD, "unsupported method: foo"),
                ))
                .await;
        });

        let request = RequestEnvelope::new("foo", json!({}));
        let id = request.id;
        let response = content.forward(request).await;
        assert_eq!(response.id, id);
        assert_eq!(response.error.unwrap().code, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_becomes_internal_error() {
        let (bridge, _rx) = RequestBridge::new(Duration::from_secs(10));
        let content = ContentScript::new(bridge);

        let response = content
            .forward(RequestEnvelope::new("getPublicKey", json!({})))
            .await;
        let error = response.error.unwrap();
        assert_eq!(error.code, ErrorObject::INTERNAL);
        assert_eq!(error.message, "request timed out: getPublicKey");
    }
}
