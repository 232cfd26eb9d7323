//! Routing metadata extraction
//!
//! The broker does not interpret stream metadata itself; a
//! [`MetadataBuilder`] supplied by the application turns the opaque bytes of
//! a handshake into the routing attributes attached to the resulting data
//! stream.

use bytes::Bytes;

use crate::error::Result;
use crate::protocol::messages::Handshake;

/// Opaque per-stream routing attributes
pub type Metadata = Bytes;

/// Builds routing metadata from a handshake request.
///
/// A build failure is non-fatal to the connection: the broker skips the
/// handshake and keeps serving the control stream.
pub trait MetadataBuilder: Send + Sync {
    fn build(&self, handshake: &Handshake) -> Result<Metadata>;
}

impl<F> MetadataBuilder for F
where
    F: Fn(&Handshake) -> Result<Metadata> + Send + Sync,
{
    fn build(&self, handshake: &Handshake) -> Result<Metadata> {
        self(handshake)
    }
}

/// Default builder: the handshake's metadata bytes pass through untouched.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassthroughBuilder;

impl MetadataBuilder for PassthroughBuilder {
    fn build(&self, handshake: &Handshake) -> Result<Metadata> {
        Ok(handshake.metadata.clone())
    }
}
