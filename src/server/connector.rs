//! Registry of active data streams
//!
//! The [`Connector`] maps stream ids to live [`DataStream`] handles. The
//! control-plane loop inserts and evicts entries; the router and the
//! shutdown path read through it. All operations are safe for concurrent
//! callers and none blocks indefinitely.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;

use crate::server::data_stream::DataStream;

#[derive(Default)]
pub struct Connector {
    streams: RwLock<HashMap<String, Arc<DataStream>>>,
}

impl Connector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a stream under its id.
    ///
    /// Duplicate ids are last-writer-wins: the replaced stream is closed so
    /// its dispatch task observes a terminal read and exits.
    pub async fn add(&self, id: impl Into<String>, stream: Arc<DataStream>) {
        let id = id.into();
        let replaced = {
            let mut streams = self.streams.write().await;
            streams.insert(id.clone(), stream)
        };
        if let Some(old) = replaced {
            debug!("stream id {} re-registered, closing previous stream", id);
            if let Err(e) = old.close().await {
                debug!("failed to close replaced stream {}: {}", id, e);
            }
        }
    }

    /// Snapshot lookup. Absence is non-fatal.
    pub async fn get(&self, id: &str) -> Option<Arc<DataStream>> {
        self.streams.read().await.get(id).cloned()
    }

    /// Deregister a stream id. Idempotent; does not close the stream.
    pub async fn remove(&self, id: &str) {
        self.streams.write().await.remove(id);
    }

    /// Deregister only if the entry still is this exact stream. Used by
    /// dispatch tasks on exit so they never evict a replacement registered
    /// under the same id.
    pub async fn remove_if_current(&self, id: &str, stream: &Arc<DataStream>) {
        let mut streams = self.streams.write().await;
        if let Some(current) = streams.get(id) {
            if Arc::ptr_eq(current, stream) {
                streams.remove(id);
            }
        }
    }

    /// All registered streams, for shutdown iteration
    pub async fn snapshot(&self) -> Vec<Arc<DataStream>> {
        self.streams.read().await.values().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.streams.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.streams.read().await.is_empty()
    }
}
