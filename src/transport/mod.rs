//! Transport layer: frame I/O over QUIC streams

pub mod framed;

pub use framed::FrameStream;
