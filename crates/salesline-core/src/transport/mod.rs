//! Transport layer: streaming connection lifecycle and the fallback path.
//!
//! `connector` defines the ports implemented in salesline-infra, `backoff`
//! the reconnect schedule, and `manager` the state machine that decides per
//! outgoing message between the stream and the fallback.

pub mod backoff;
pub mod connector;
pub mod manager;

pub use connector::{FallbackClient, StreamChannel, StreamConnector};
pub use manager::{TransportEvent, TransportManager, TransportUpdate};
