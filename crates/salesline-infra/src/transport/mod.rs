//! Network adapters for the transport ports in `salesline-core`.

pub mod http;
pub mod ws;

pub use http::HttpFallbackClient;
pub use ws::WsConnector;
