//! Typed view of the wire protocol
//!
//! Payload structs serialize to JSON and travel inside the frame body. The
//! [`Message`] trait ties each struct to its frame kind; [`DecodedFrame`] is
//! the tagged union the dispatch loops match on.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io;

use super::frame::{Frame, FrameType};
use super::messages::*;

/// A payload struct bound to exactly one frame kind
pub trait Message: Serialize + DeserializeOwned {
    /// The frame kind this payload travels under
    const KIND: FrameType;

    /// Wrap this payload in its frame
    fn to_frame(&self) -> io::Result<Frame> {
        let body = serde_json::to_vec(self)?;
        Ok(Frame::new(Self::KIND, body))
    }

    /// Extract this payload from a frame, checking the kind first
    fn from_frame(frame: &Frame) -> io::Result<Self> {
        if frame.kind != Self::KIND {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("cannot read {} out of a {}", Self::KIND, frame.kind),
            ));
        }
        Ok(serde_json::from_slice(&frame.payload)?)
    }
}

impl Message for Authentication {
    const KIND: FrameType = FrameType::Authentication;
}

impl Message for AuthenticationResp {
    const KIND: FrameType = FrameType::AuthenticationResp;
}

impl Message for Handshake {
    const KIND: FrameType = FrameType::Handshake;
}

impl Message for HandshakeRejected {
    const KIND: FrameType = FrameType::HandshakeRejected;
}

impl Message for CloseStream {
    const KIND: FrameType = FrameType::CloseStream;
}

impl Message for Rejected {
    const KIND: FrameType = FrameType::Rejected;
}

impl Message for Goaway {
    const KIND: FrameType = FrameType::Goaway;
}

impl Message for HandshakeAck {
    const KIND: FrameType = FrameType::HandshakeAck;
}

impl Message for Data {
    const KIND: FrameType = FrameType::Data;
}

impl Message for Backflow {
    const KIND: FrameType = FrameType::Backflow;
}

/// Every frame decoded to its payload. Dispatch is a match on this union.
#[derive(Debug, Clone)]
pub enum DecodedFrame {
    Authentication(Authentication),
    AuthenticationResp(AuthenticationResp),
    Handshake(Handshake),
    HandshakeRejected(HandshakeRejected),
    CloseStream(CloseStream),
    Rejected(Rejected),
    Goaway(Goaway),
    HandshakeAck(HandshakeAck),
    Data(Data),
    Backflow(Backflow),
}

impl DecodedFrame {
    pub fn decode(frame: &Frame) -> io::Result<Self> {
        Ok(match frame.kind {
            FrameType::Authentication => Self::Authentication(Authentication::from_frame(frame)?),
            FrameType::AuthenticationResp => {
                Self::AuthenticationResp(AuthenticationResp::from_frame(frame)?)
            }
            FrameType::Handshake => Self::Handshake(Handshake::from_frame(frame)?),
            FrameType::HandshakeRejected => {
                Self::HandshakeRejected(HandshakeRejected::from_frame(frame)?)
            }
            FrameType::CloseStream => Self::CloseStream(CloseStream::from_frame(frame)?),
            FrameType::Rejected => Self::Rejected(Rejected::from_frame(frame)?),
            FrameType::Goaway => Self::Goaway(Goaway::from_frame(frame)?),
            FrameType::HandshakeAck => Self::HandshakeAck(HandshakeAck::from_frame(frame)?),
            FrameType::Data => Self::Data(Data::from_frame(frame)?),
            FrameType::Backflow => Self::Backflow(Backflow::from_frame(frame)?),
        })
    }

    pub fn kind(&self) -> FrameType {
        match self {
            Self::Authentication(_) => FrameType::Authentication,
            Self::AuthenticationResp(_) => FrameType::AuthenticationResp,
            Self::Handshake(_) => FrameType::Handshake,
            Self::HandshakeRejected(_) => FrameType::HandshakeRejected,
            Self::CloseStream(_) => FrameType::CloseStream,
            Self::Rejected(_) => FrameType::Rejected,
            Self::Goaway(_) => FrameType::Goaway,
            Self::HandshakeAck(_) => FrameType::HandshakeAck,
            Self::Data(_) => FrameType::Data,
            Self::Backflow(_) => FrameType::Backflow,
        }
    }
}
