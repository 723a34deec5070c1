//! WebSocket stream connector.
//!
//! Opens `{stream_base}{stream_path}/{visitor_id}` with tokio-tungstenite and
//! splits the socket: a writer task forwards queued client frames, and the
//! read half is exposed as a stream of text frames. Control frames are
//! handled by tungstenite; binary frames are ignored.

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite;

use salesline_core::transport::{StreamChannel, StreamConnector};
use salesline_types::config::ClientConfig;
use salesline_types::error::TransportError;
use salesline_types::visitor::VisitorId;

/// Capacity of the outbound frame queue.
const OUTBOUND_CAPACITY: usize = 32;

pub struct WsConnector {
    config: ClientConfig,
}

impl WsConnector {
    pub fn new(config: ClientConfig) -> Self {
        Self { config }
    }

    pub fn endpoint(&self, visitor_id: &VisitorId) -> String {
        self.config.stream_endpoint(visitor_id)
    }
}

impl StreamConnector for WsConnector {
    async fn connect(&self, visitor_id: &VisitorId) -> Result<StreamChannel, TransportError> {
        let url = self.endpoint(visitor_id);
        let (ws_stream, _) = tokio_tungstenite::connect_async(&url)
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;
        tracing::debug!(url = %url, "websocket connected");

        let (mut ws_write, ws_read) = ws_stream.split();
        let (outbound, mut outbound_rx) = mpsc::channel::<String>(OUTBOUND_CAPACITY);

        tokio::spawn(async move {
            while let Some(frame) = outbound_rx.recv().await {
                if let Err(e) = ws_write.send(tungstenite::Message::Text(frame.into())).await {
                    tracing::debug!(error = %e, "websocket write failed");
                    return;
                }
            }
            // Every sender dropped: the session is done with this socket.
            let _ = ws_write.close().await;
        });

        let inbound = ws_read.filter_map(|message| async move {
            match message {
                Ok(tungstenite::Message::Text(text)) => Some(Ok(text.as_str().to_string())),
                Ok(tungstenite::Message::Close(frame)) => {
                    tracing::debug!(?frame, "websocket close frame");
                    None
                }
                Ok(_) => None,
                Err(e) => {
                    tracing::debug!(error = %e, "websocket read failed");
                    Some(Err(TransportError::Closed))
                }
            }
        });

        Ok(StreamChannel {
            outbound,
            inbound: Box::pin(inbound),
        })
    }
}
