//! Error handling for the broker

use std::fmt;

/// Result type alias for broker operations
pub type Result<T> = std::result::Result<T, BrokerError>;

/// Broker error types
#[derive(Debug, Clone)]
pub enum BrokerError {
    /// The peer finished the stream cleanly
    Eof,
    /// The stream or connection is gone
    Closed(String),
    /// Network-level I/O errors
    Network(String),
    /// Undecodable bytes on the wire
    Malformed(String),
    /// Wrong frame at the wrong time
    Protocol(String),
    /// The credential verifier declined the client
    AuthRejected(String),
    /// Routing metadata could not be built from a handshake
    Metadata(String),
    /// Payload serialization/deserialization errors
    Serialization(String),
    /// Configuration error
    Config(String),
    /// Connection establishment errors
    Connection(String),
    /// Server internal error
    Internal(String),
}

impl BrokerError {
    /// Create a closed error
    pub fn closed<T: Into<String>>(msg: T) -> Self {
        BrokerError::Closed(msg.into())
    }

    /// Create a network error
    pub fn network<T: Into<String>>(msg: T) -> Self {
        BrokerError::Network(msg.into())
    }

    /// Create a malformed-input error
    pub fn malformed<T: Into<String>>(msg: T) -> Self {
        BrokerError::Malformed(msg.into())
    }

    /// Create a protocol error
    pub fn protocol<T: Into<String>>(msg: T) -> Self {
        BrokerError::Protocol(msg.into())
    }

    /// Create an authentication-rejected error
    pub fn auth_rejected<T: Into<String>>(msg: T) -> Self {
        BrokerError::AuthRejected(msg.into())
    }

    /// Create a metadata error
    pub fn metadata<T: Into<String>>(msg: T) -> Self {
        BrokerError::Metadata(msg.into())
    }

    /// Create a serialization error
    pub fn serialization<T: Into<String>>(msg: T) -> Self {
        BrokerError::Serialization(msg.into())
    }

    /// Create a configuration error
    pub fn config<T: Into<String>>(msg: T) -> Self {
        BrokerError::Config(msg.into())
    }

    /// Create a connection error
    pub fn connection<T: Into<String>>(msg: T) -> Self {
        BrokerError::Connection(msg.into())
    }

    /// Create an internal error
    pub fn internal<T: Into<String>>(msg: T) -> Self {
        BrokerError::Internal(msg.into())
    }

    /// Whether this error means the peer ended the stream cleanly
    pub fn is_eof(&self) -> bool {
        matches!(self, BrokerError::Eof)
    }

    /// Whether this error terminates the owning read loop
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BrokerError::Eof
                | BrokerError::Closed(_)
                | BrokerError::Network(_)
                | BrokerError::Malformed(_)
        )
    }
}

impl fmt::Display for BrokerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BrokerError::Eof => write!(f, "stream ended"),
            BrokerError::Closed(msg) => write!(f, "closed: {}", msg),
            BrokerError::Network(msg) => write!(f, "network error: {}", msg),
            BrokerError::Malformed(msg) => write!(f, "malformed frame: {}", msg),
            BrokerError::Protocol(msg) => write!(f, "protocol error: {}", msg),
            BrokerError::AuthRejected(msg) => write!(f, "authentication rejected: {}", msg),
            BrokerError::Metadata(msg) => write!(f, "metadata error: {}", msg),
            BrokerError::Serialization(msg) => write!(f, "serialization error: {}", msg),
            BrokerError::Config(msg) => write!(f, "configuration error: {}", msg),
            BrokerError::Connection(msg) => write!(f, "connection error: {}", msg),
            BrokerError::Internal(msg) => write!(f, "internal error: {}", msg),
        }
    }
}

impl std::error::Error for BrokerError {}

impl From<std::io::Error> for BrokerError {
    fn from(err: std::io::Error) -> Self {
        use std::io::ErrorKind;
        match err.kind() {
            ErrorKind::UnexpectedEof => BrokerError::Eof,
            ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::BrokenPipe
            | ErrorKind::NotConnected => BrokerError::Closed(err.to_string()),
            ErrorKind::InvalidData => BrokerError::Malformed(err.to_string()),
            _ => BrokerError::Network(format!("IO error: {}", err)),
        }
    }
}

impl From<quinn::ConnectError> for BrokerError {
    fn from(err: quinn::ConnectError) -> Self {
        BrokerError::Connection(format!("QUIC connect error: {}", err))
    }
}

impl From<quinn::ConnectionError> for BrokerError {
    fn from(err: quinn::ConnectionError) -> Self {
        BrokerError::Closed(format!("QUIC connection error: {}", err))
    }
}

impl From<quinn::ReadError> for BrokerError {
    fn from(err: quinn::ReadError) -> Self {
        BrokerError::Network(format!("QUIC read error: {}", err))
    }
}

impl From<quinn::WriteError> for BrokerError {
    fn from(err: quinn::WriteError) -> Self {
        BrokerError::Network(format!("QUIC write error: {}", err))
    }
}

impl From<quinn::ClosedStream> for BrokerError {
    fn from(err: quinn::ClosedStream) -> Self {
        BrokerError::Closed(format!("stream closed: {}", err))
    }
}

impl From<serde_json::Error> for BrokerError {
    fn from(err: serde_json::Error) -> Self {
        BrokerError::Serialization(format!("JSON error: {}", err))
    }
}

impl From<anyhow::Error> for BrokerError {
    fn from(err: anyhow::Error) -> Self {
        BrokerError::Internal(err.to_string())
    }
}
