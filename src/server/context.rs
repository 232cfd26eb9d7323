//! Per-dispatch scope for stream handlers

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;

use crate::server::data_stream::DataStream;

/// Scope handed to the application's stream handler, one per data stream.
///
/// Holds the stream plus a scratch area for handler state. The scratch is
/// released by [`StreamContext::clean`], which also runs on drop so cleanup
/// happens however the handler exits.
pub struct StreamContext {
    stream: Arc<DataStream>,
    scratch: HashMap<String, Bytes>,
}

impl StreamContext {
    pub fn new(stream: Arc<DataStream>) -> Self {
        Self {
            stream,
            scratch: HashMap::new(),
        }
    }

    /// The data stream this dispatch runs for
    pub fn stream(&self) -> &Arc<DataStream> {
        &self.stream
    }

    /// Store a scratch value for the duration of this dispatch
    pub fn set(&mut self, key: impl Into<String>, value: Bytes) {
        self.scratch.insert(key.into(), value);
    }

    /// Look up a scratch value
    pub fn get(&self, key: &str) -> Option<&Bytes> {
        self.scratch.get(key)
    }

    /// Release per-context resources
    pub fn clean(&mut self) {
        self.scratch.clear();
    }
}

impl Drop for StreamContext {
    fn drop(&mut self) {
        self.clean();
    }
}

/// Application dispatch body invoked once per data stream.
///
/// Implemented for any `Fn(StreamContext) -> impl Future` closure; the
/// handler is expected to read the stream until a terminal error and then
/// return.
pub trait StreamHandler: Send + Sync + 'static {
    fn handle(self: Arc<Self>, ctx: StreamContext) -> Pin<Box<dyn Future<Output = ()> + Send>>;
}

impl<F, Fut> StreamHandler for F
where
    F: Fn(StreamContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    fn handle(self: Arc<Self>, ctx: StreamContext) -> Pin<Box<dyn Future<Output = ()> + Send>> {
        Box::pin((*self)(ctx))
    }
}
