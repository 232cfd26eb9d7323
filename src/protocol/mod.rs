//! Protocol layer: wire frames, typed messages, and the codec bridge

pub mod codec;
pub mod frame;
pub mod messages;

pub use codec::{DecodedFrame, Message};
pub use frame::{Frame, FrameAssembler, FrameType, HEADER_LEN, MAX_PAYLOAD};
pub use messages::*;
