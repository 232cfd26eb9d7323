//! Protocol message types for the broker
//!
//! All message payloads that can be serialized/deserialized within frames.
//! Uses serde for JSON serialization (can be swapped for a binary codec).

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Routing key attached to data frames. Consumers subscribe to tags at
/// handshake time.
pub type Tag = u32;

/// Client-chosen data stream identifier, expected unique per connection
pub type StreamId = String;

/// Role of a data stream. The numeric values are stable wire constants.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum StreamKind {
    /// Emits tagged data into the broker
    Source = 0x5F,
    /// Observes tags and writes processed results back
    StreamFunction = 0x5D,
    /// Forwards tagged data to an upstream broker
    UpstreamZipper = 0x5E,
}

impl From<StreamKind> for u8 {
    fn from(kind: StreamKind) -> u8 {
        kind as u8
    }
}

impl TryFrom<u8> for StreamKind {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x5F => Ok(StreamKind::Source),
            0x5D => Ok(StreamKind::StreamFunction),
            0x5E => Ok(StreamKind::UpstreamZipper),
            other => Err(format!("unknown stream kind: 0x{:02X}", other)),
        }
    }
}

impl std::fmt::Display for StreamKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            StreamKind::Source => "Source",
            StreamKind::StreamFunction => "StreamFunction",
            StreamKind::UpstreamZipper => "UpstreamZipper",
        };
        f.write_str(name)
    }
}

// =============================================================================
// Control stream messages
// =============================================================================

/// Client credential presentation. Must be the first frame on the control
/// stream; `auth_name` selects the credential method on the server side and
/// `auth_payload` is the opaque verifier input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Authentication {
    pub auth_name: String,
    pub auth_payload: String,
}

/// Server verdict on an [`Authentication`] frame
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthenticationResp {
    pub ok: bool,
    pub reason: String,
}

impl AuthenticationResp {
    pub fn ok() -> Self {
        Self {
            ok: true,
            reason: String::new(),
        }
    }

    pub fn rejected(reason: impl Into<String>) -> Self {
        Self {
            ok: false,
            reason: reason.into(),
        }
    }
}

/// Request to create a new data stream
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Handshake {
    /// Application-assigned label for the stream
    pub name: String,
    /// Client-chosen stream identifier
    pub id: StreamId,
    /// Role of the stream
    pub stream_kind: StreamKind,
    /// Tags this stream subscribes to
    pub observe_tags: Vec<Tag>,
    /// Opaque bytes fed to the metadata builder
    pub metadata: Bytes,
}

/// Refusal of a [`Handshake`], sent on the control stream
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandshakeRejected {
    pub id: StreamId,
    pub message: String,
}

/// Client request to tear down one data stream
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloseStream {
    pub stream_id: StreamId,
    pub reason: String,
}

/// Refusal of a control-stream request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rejected {
    pub message: String,
}

/// Server-initiated connection eviction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Goaway {
    pub message: String,
}

// =============================================================================
// Data stream messages
// =============================================================================

/// Confirmation that a handshake succeeded. Always the first frame the
/// server writes on the newly opened data stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandshakeAck {
    pub stream_id: StreamId,
}

/// Tagged application data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Data {
    /// Per-frame routing attributes
    pub metadata: Bytes,
    /// Routing tag
    pub tag: Tag,
    /// Application payload
    pub payload: Bytes,
}

/// Processed result flowing back towards a source stream
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Backflow {
    pub tag: Tag,
    pub carriage: Bytes,
}
