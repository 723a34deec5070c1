use thiserror::Error;

/// Errors from the streaming or fallback transports.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransportError {
    #[error("failed to open stream: {0}")]
    Connect(String),

    #[error("stream closed")]
    Closed,

    #[error("failed to send frame: {0}")]
    Send(String),

    #[error("fallback request failed: {0}")]
    Fallback(String),

    #[error("server returned status {0}")]
    Status(u16),

    #[error("failed to decode response: {0}")]
    Decode(String),
}

/// Malformed or out-of-contract frames from the streaming endpoint.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("malformed frame: {0}")]
    Malformed(String),

    #[error("unknown frame type: '{0}'")]
    UnknownType(String),
}

/// Errors from the persisted key-value storage.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage connection error: {0}")]
    Connection(String),

    #[error("query error: {0}")]
    Query(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Errors surfaced to the presentation layer by the session controller.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("message is empty")]
    EmptyMessage,

    #[error("session is closed")]
    Closed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_error_display() {
        let err = TransportError::Status(502);
        assert_eq!(err.to_string(), "server returned status 502");
    }

    #[test]
    fn test_protocol_error_display() {
        let err = ProtocolError::UnknownType("typing".to_string());
        assert_eq!(err.to_string(), "unknown frame type: 'typing'");
    }

    #[test]
    fn test_storage_error_display() {
        let err = StorageError::Query("disk I/O error".to_string());
        assert_eq!(err.to_string(), "query error: disk I/O error");
    }
}
