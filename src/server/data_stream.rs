//! Data stream entity
//!
//! A [`DataStream`] owns one bidirectional transport stream plus the routing
//! attributes declared at handshake time. It is created on a successful
//! handshake and lives until its transport ends, the peer closes it, or the
//! connection dies.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{BrokerError, Result};
use crate::protocol::codec::Message;
use crate::protocol::frame::Frame;
use crate::protocol::messages::{HandshakeAck, StreamId, StreamKind, Tag};
use crate::server::metadata::Metadata;
use crate::transport::framed::FrameStream;

pub struct DataStream {
    name: String,
    id: StreamId,
    kind: StreamKind,
    metadata: Metadata,
    observed_tags: Vec<Tag>,
    /// Transport stream carrying this stream's data frames
    transport: FrameStream,
    /// Shared writer for the connection's control stream; control-class
    /// frames written through this stream are routed here
    control: Arc<FrameStream>,
    ack_sent: AtomicBool,
    closed: AtomicBool,
}

impl DataStream {
    pub fn new(
        name: String,
        id: StreamId,
        kind: StreamKind,
        metadata: Metadata,
        transport: FrameStream,
        observed_tags: Vec<Tag>,
        control: Arc<FrameStream>,
    ) -> Self {
        Self {
            name,
            id,
            kind,
            metadata,
            observed_tags,
            transport,
            control,
            ack_sent: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> StreamKind {
        self.kind
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn observed_tags(&self) -> &[Tag] {
        &self.observed_tags
    }

    /// Whether this stream subscribed to the given tag
    pub fn observes(&self, tag: Tag) -> bool {
        self.observed_tags.contains(&tag)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Write the handshake acknowledgement. Must be called exactly once,
    /// before any other frame goes out on the transport.
    pub async fn send_handshake_ack(&self) -> Result<()> {
        if self.ack_sent.swap(true, Ordering::AcqRel) {
            return Err(BrokerError::internal(format!(
                "handshake ack already sent on stream {}",
                self.id
            )));
        }
        self.transport
            .write_message(&HandshakeAck {
                stream_id: self.id.clone(),
            })
            .await
    }

    /// Read the next frame from the transport
    pub async fn read_frame(&self) -> Result<Frame> {
        self.transport.read_frame().await
    }

    /// Write one frame. Control-class frames go to the connection's control
    /// stream; everything else goes to this stream's transport, which
    /// requires the handshake ack to have been written first.
    pub async fn write_frame(&self, frame: &Frame) -> Result<()> {
        if frame.kind.is_control() {
            return self.control.write_frame(frame).await;
        }
        if !self.ack_sent.load(Ordering::Acquire) {
            return Err(BrokerError::internal(format!(
                "data write on stream {} before handshake ack",
                self.id
            )));
        }
        if self.is_closed() {
            return Err(BrokerError::closed(format!("stream {} is closed", self.id)));
        }
        self.transport.write_frame(frame).await
    }

    /// Encode a typed message and write it as one frame
    pub async fn write_message<M: Message>(&self, msg: &M) -> Result<()> {
        let frame = msg
            .to_frame()
            .map_err(|e| BrokerError::serialization(e.to_string()))?;
        self.write_frame(&frame).await
    }

    /// Finish the write side of the transport. Idempotent; the second call
    /// is a no-op returning success.
    pub async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.transport.shutdown().await
    }
}

impl std::fmt::Debug for DataStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataStream")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("observed_tags", &self.observed_tags)
            .field("closed", &self.is_closed())
            .finish()
    }
}
