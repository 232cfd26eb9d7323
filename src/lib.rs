//! Vireo - QUIC tagged-data streaming broker
//!
//! This library provides the server-side core of a tagged-data streaming
//! broker. Clients connect over QUIC and multiplex many logical data
//! streams on a single connection; the broker authenticates each
//! connection, creates and tears down data streams on demand, and hands
//! each stream to an application dispatch handler.
//!
//! ## Architecture
//!
//! Every connection carries one **control stream** (the first bidirectional
//! stream) and any number of **data streams**:
//!
//! - The control stream starts with an `Authentication` frame and then
//!   carries stream-lifecycle frames: `Handshake` to open a data stream,
//!   `CloseStream` to tear one down.
//! - Each accepted handshake opens a fresh bidirectional stream whose first
//!   frame is always a `HandshakeAck`; tagged `Data` frames flow on it
//!   afterwards.
//! - A per-connection [`StreamGroup`](server::StreamGroup) runs the control
//!   loop and supervises one dispatch task per data stream; the
//!   [`Connector`](server::Connector) registry tracks the live streams.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use vireo::server::{AcceptAll, Broker, BrokerConfig, PassthroughBuilder, StreamContext};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let handler = Arc::new(|ctx: StreamContext| async move {
//!         while ctx.stream().read_frame().await.is_ok() {}
//!     });
//!     let mut broker = Broker::new(
//!         BrokerConfig::default(),
//!         Arc::new(AcceptAll),
//!         Arc::new(PassthroughBuilder),
//!         handler,
//!     );
//!     broker.start().await?;
//!     Ok(())
//! }
//! ```

// Core modules
pub mod error;
pub mod protocol;
pub mod transport;

// Server modules
pub mod server;

#[cfg(test)]
pub(crate) mod testing;

// Re-export error types
pub use error::{BrokerError, Result};

// Re-export protocol types
pub use protocol::{
    // Codec types
    DecodedFrame,
    Message,
    // Frame types
    Frame,
    FrameAssembler,
    FrameType,
    // Message types
    messages::{
        Authentication, AuthenticationResp, Backflow, CloseStream, Data, Goaway, Handshake,
        HandshakeAck, HandshakeRejected, Rejected, StreamId, StreamKind, Tag,
    },
};

// Re-export transport types
pub use transport::FrameStream;

// Re-export server types
pub use server::{
    AcceptAll, Broker, BrokerConfig, Connector, CredentialVerifier, DataStream, Metadata,
    MetadataBuilder, PassthroughBuilder, StreamContext, StreamGroup, StreamHandler,
    ERROR_CODE_REJECTED,
};
