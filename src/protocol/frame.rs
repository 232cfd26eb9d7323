//! Wire framing
//!
//! Every frame is length-delimited: a single kind tag, a big-endian u32
//! payload length, then the payload itself. The kind tag values are fixed
//! wire constants shared with every client implementation.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::fmt;
use std::io;

/// Fixed bytes in front of every payload: kind tag + payload length
pub const HEADER_LEN: usize = 5;

/// Hard cap on a single frame's payload (16 MiB)
pub const MAX_PAYLOAD: usize = 16 << 20;

/// Frame kinds and their wire tags
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameType {
    /// Client credential presentation, first frame on the control stream
    Authentication = 0x03,
    /// Server verdict on an Authentication frame
    AuthenticationResp = 0x11,
    /// Server refusal of a handshake, sent on the control stream
    HandshakeRejected = 0x14,
    /// Client request to tear down one data stream
    CloseStream = 0x15,
    /// First frame the server writes on every new data stream
    HandshakeAck = 0x29,
    /// Processed result flowing back towards a source stream
    Backflow = 0x2D,
    /// Server-initiated connection eviction
    Goaway = 0x2E,
    /// Client request to open a new data stream
    Handshake = 0x31,
    /// Server refusal of a control-stream request
    Rejected = 0x39,
    /// Tagged application data
    Data = 0x3F,
}

impl FrameType {
    /// Every kind the broker understands
    pub const ALL: [FrameType; 10] = [
        FrameType::Authentication,
        FrameType::AuthenticationResp,
        FrameType::HandshakeRejected,
        FrameType::CloseStream,
        FrameType::HandshakeAck,
        FrameType::Backflow,
        FrameType::Goaway,
        FrameType::Handshake,
        FrameType::Rejected,
        FrameType::Data,
    ];

    /// Map a wire tag back to its kind
    pub fn from_wire(tag: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| *kind as u8 == tag)
    }

    /// Kinds carried on data streams
    pub fn is_data_stream(self) -> bool {
        matches!(
            self,
            FrameType::HandshakeAck | FrameType::Data | FrameType::Backflow
        )
    }

    /// Everything that is not data-stream traffic belongs to the control
    /// stream
    pub fn is_control(self) -> bool {
        !self.is_data_stream()
    }

    fn name(self) -> &'static str {
        match self {
            FrameType::Authentication => "AuthenticationFrame",
            FrameType::AuthenticationResp => "AuthenticationRespFrame",
            FrameType::HandshakeRejected => "HandshakeRejectedFrame",
            FrameType::CloseStream => "CloseStreamFrame",
            FrameType::HandshakeAck => "HandshakeAckFrame",
            FrameType::Backflow => "BackflowFrame",
            FrameType::Goaway => "GoawayFrame",
            FrameType::Handshake => "HandshakeFrame",
            FrameType::Rejected => "RejectedFrame",
            FrameType::Data => "DataFrame",
        }
    }
}

impl fmt::Display for FrameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One decoded unit off the wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub kind: FrameType,
    pub payload: Bytes,
}

impl Frame {
    pub fn new(kind: FrameType, payload: impl Into<Bytes>) -> Self {
        Self {
            kind,
            payload: payload.into(),
        }
    }

    /// Serialize header and payload into one contiguous buffer
    pub fn to_wire(&self) -> Bytes {
        let mut out = BytesMut::with_capacity(HEADER_LEN + self.payload.len());
        out.put_u8(self.kind as u8);
        out.put_u32(self.payload.len() as u32);
        out.extend_from_slice(&self.payload);
        out.freeze()
    }
}

/// Reassembles frames from an incoming byte stream.
///
/// Bytes are pushed in as they arrive from the transport; a frame pops out
/// once its last byte has landed. Garbage on the wire (an unknown kind tag,
/// a length over the cap) surfaces as an error from
/// [`next_frame`](FrameAssembler::next_frame).
#[derive(Debug, Default)]
pub struct FrameAssembler {
    pending: BytesMut,
}

impl FrameAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append received bytes
    pub fn push(&mut self, bytes: &[u8]) {
        self.pending.extend_from_slice(bytes);
    }

    /// Pop the next complete frame, if the buffer holds one
    pub fn next_frame(&mut self) -> io::Result<Option<Frame>> {
        if self.pending.len() < HEADER_LEN {
            return Ok(None);
        }

        let kind = FrameType::from_wire(self.pending[0]).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("unrecognized frame tag 0x{:02X}", self.pending[0]),
            )
        })?;
        let mut length_bytes = &self.pending[1..HEADER_LEN];
        let body_len = length_bytes.get_u32() as usize;
        if body_len > MAX_PAYLOAD {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "{} byte payload exceeds the {} byte cap",
                    body_len, MAX_PAYLOAD
                ),
            ));
        }

        if self.pending.len() < HEADER_LEN + body_len {
            return Ok(None);
        }

        self.pending.advance(HEADER_LEN);
        let payload = self.pending.split_to(body_len).freeze();
        Ok(Some(Frame { kind, payload }))
    }

    /// Bytes received but not yet returned as part of a frame
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_tags_are_stable() {
        assert_eq!(FrameType::Authentication as u8, 0x03);
        assert_eq!(FrameType::AuthenticationResp as u8, 0x11);
        assert_eq!(FrameType::HandshakeRejected as u8, 0x14);
        assert_eq!(FrameType::HandshakeAck as u8, 0x29);
        assert_eq!(FrameType::Backflow as u8, 0x2D);
        assert_eq!(FrameType::Goaway as u8, 0x2E);
        assert_eq!(FrameType::Handshake as u8, 0x31);
        assert_eq!(FrameType::Rejected as u8, 0x39);
        assert_eq!(FrameType::Data as u8, 0x3F);
    }

    #[test]
    fn test_from_wire_covers_every_kind() {
        for kind in FrameType::ALL {
            assert_eq!(FrameType::from_wire(kind as u8), Some(kind));
        }
        assert_eq!(FrameType::from_wire(0x00), None);
        assert_eq!(FrameType::from_wire(0xFE), None);
    }

    #[test]
    fn test_control_and_data_kinds_partition() {
        for kind in FrameType::ALL {
            assert_ne!(kind.is_control(), kind.is_data_stream());
        }
        assert!(FrameType::Authentication.is_control());
        assert!(FrameType::Handshake.is_control());
        assert!(FrameType::CloseStream.is_control());
        assert!(FrameType::HandshakeAck.is_data_stream());
        assert!(FrameType::Data.is_data_stream());
        assert!(FrameType::Backflow.is_data_stream());
    }

    #[test]
    fn test_to_wire_layout() {
        let frame = Frame::new(FrameType::Data, &b"abc"[..]);
        let wire = frame.to_wire();

        assert_eq!(wire.len(), HEADER_LEN + 3);
        assert_eq!(wire[0], FrameType::Data as u8);
        assert_eq!(wire[1..HEADER_LEN], 3u32.to_be_bytes());
        assert_eq!(wire[HEADER_LEN..], *b"abc");
    }

    #[test]
    fn test_assembler_reassembles_dripped_input() {
        let first = Frame::new(FrameType::Handshake, vec![1, 2, 3, 4, 5]);
        let second = Frame::new(FrameType::CloseStream, "");
        let mut wire = first.to_wire().to_vec();
        wire.extend_from_slice(&second.to_wire());

        // Feed one byte at a time; each frame appears exactly when its last
        // byte lands
        let mut assembler = FrameAssembler::new();
        let mut seen = Vec::new();
        for byte in wire {
            assembler.push(&[byte]);
            while let Some(frame) = assembler.next_frame().unwrap() {
                seen.push(frame);
            }
        }

        assert_eq!(seen, vec![first, second]);
        assert_eq!(assembler.pending_len(), 0);
    }

    #[test]
    fn test_assembler_rejects_unknown_tag() {
        let mut assembler = FrameAssembler::new();
        assembler.push(&[0xAB, 0, 0, 0, 0]);
        assert!(assembler.next_frame().is_err());
    }

    #[test]
    fn test_assembler_rejects_oversized_payload() {
        let mut assembler = FrameAssembler::new();
        let mut header = vec![FrameType::Data as u8];
        header.extend_from_slice(&(MAX_PAYLOAD as u32 + 1).to_be_bytes());
        assembler.push(&header);
        assert!(assembler.next_frame().is_err());
    }

    #[test]
    fn test_empty_payload_frame() {
        let frame = Frame::new(FrameType::Goaway, "");
        let mut assembler = FrameAssembler::new();
        assembler.push(&frame.to_wire());
        assert_eq!(assembler.next_frame().unwrap(), Some(frame));
    }
}
