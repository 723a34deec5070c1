//! Transport ports.
//!
//! Uses RPITIT (native async fn in traits, Rust 2024 edition).
//! Implementations live in salesline-infra.

use futures_util::stream::BoxStream;
use tokio::sync::mpsc;

use salesline_types::error::TransportError;
use salesline_types::protocol::{FallbackRequest, FallbackResponse};
use salesline_types::visitor::VisitorId;

/// An open streaming connection.
///
/// `outbound` accepts serialized client frames; the connection's writer ends
/// when every sender is dropped. `inbound` yields raw text frames and ends when
/// the server closes the connection.
pub struct StreamChannel {
    pub outbound: mpsc::Sender<String>,
    pub inbound: BoxStream<'static, Result<String, TransportError>>,
}

impl std::fmt::Debug for StreamChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamChannel")
            .field("outbound_closed", &self.outbound.is_closed())
            .finish_non_exhaustive()
    }
}

/// Opens the streaming connection for a visitor.
pub trait StreamConnector: Send + Sync + 'static {
    fn connect(
        &self,
        visitor_id: &VisitorId,
    ) -> impl std::future::Future<Output = Result<StreamChannel, TransportError>> + Send;
}

/// Request/response transport used when the stream is unavailable.
pub trait FallbackClient: Send + Sync + 'static {
    fn send(
        &self,
        request: &FallbackRequest,
    ) -> impl std::future::Future<Output = Result<FallbackResponse, TransportError>> + Send;
}
