// Copyright (c) 2022-2023 Yuki Kishimoto
// Copyright (c) 2023-2025 Rust Nostr Developers
// Distributed under the MIT software license

//! Extension wiring
//!
//! Connects page, content script and background contexts over channels.

use async_utility::task;

use crate::background::Background;
use crate::bridge::RequestBridge;
use crate::content::ContentScript;
use crate::provider::Nip07Provider;

/// Running extension
#[derive(Debug, Clone)]
pub struct Extension {
    background: Background,
    provider: Nip07Provider,
}

impl Extension {
    /// Spawn the message pumps between the contexts
    ///
    /// Every request is served in its own task: responses may resolve out of order.
    /// The pumps exit once every handle to the returned provider is dropped.
    pub fn launch(background: Background) -> Self {
        let (page_bridge, mut page_rx) = RequestBridge::new(background.opts().get_page_timeout());
        let (content_bridge, mut content_rx) =
            RequestBridge::new(background.opts().get_content_timeout());

        let page_responder = page_bridge.responder();
        let content_responder = content_bridge.responder();
        let content: ContentScript = ContentScript::new(content_bridge);

        // Page -> content script
        task::spawn(async move {
            while let Some(request) = page_rx.recv().await {
                let content: ContentScript = content.clone();
                let responder = page_responder.clone();
                task::spawn(async move {
                    let response = content.forward(request).await;
                    responder.handle_response(response).await;
                });
            }

            tracing::debug!("Page pump exited.");
        });

        // Content script -> background
        let handler: Background = background.clone();
        task::spawn(async move {
            while let Some(request) = content_rx.recv().await {
                let handler: Background = handler.clone();
                let responder = content_responder.clone();
                task::spawn(async move {
                    let response = handler.handle_request(request).await;
                    responder.handle_response(response).await;
                });
            }

            tracing::debug!("Content script pump exited.");
        });

        let provider: Nip07Provider = Nip07Provider::new(page_bridge, background.broadcast_sender());

        Self {
            background,
            provider,
        }
    }

    /// Background context
    #[inline]
    pub fn background(&self) -> &Background {
        &self.background
    }

    /// Page-facing `window.nostr` provider
    #[inline]
    pub fn provider(&self) -> &Nip07Provider {
        &self.provider
    }
}
