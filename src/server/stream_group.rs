//! Per-connection control-plane orchestrator
//!
//! A [`StreamGroup`] owns one connection's control stream and supervises
//! every data stream spawned from it. The control stream is the first
//! bidirectional stream on the connection and carries authentication and
//! stream-lifecycle frames; each accepted handshake opens a fresh transport
//! stream, registers a [`DataStream`] in the [`Connector`], and runs the
//! application handler in a tracked task.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use quinn::Connection;
use tokio::task::JoinSet;
use tracing::{debug, error, warn};

use crate::error::{BrokerError, Result};
use crate::protocol::codec::DecodedFrame;
use crate::protocol::messages::{Authentication, AuthenticationResp, CloseStream, Handshake};
use crate::server::connector::Connector;
use crate::server::context::{StreamContext, StreamHandler};
use crate::server::data_stream::DataStream;
use crate::server::metadata::MetadataBuilder;
use crate::transport::framed::FrameStream;

/// QUIC application error code used when the server closes a connection
/// after refusing authentication
pub const ERROR_CODE_REJECTED: u32 = 0xCC;

pub struct StreamGroup {
    conn: Connection,
    control: Arc<FrameStream>,
    tasks: JoinSet<()>,
}

impl StreamGroup {
    /// Wrap a freshly accepted connection and its control stream. No tasks
    /// start until [`verify_authentication`](Self::verify_authentication)
    /// and [`run`](Self::run) are invoked, in that order.
    pub fn new(conn: Connection, control: Arc<FrameStream>) -> Self {
        Self {
            conn,
            control,
            tasks: JoinSet::new(),
        }
    }

    /// Read the client's credential frame and decide the connection's fate.
    ///
    /// Exactly one [`AuthenticationResp`] is written per connection. On a
    /// non-Authentication first frame or a declined credential the response
    /// carries `ok=false` and the connection is closed with
    /// [`ERROR_CODE_REJECTED`]; a verifier failure propagates without any
    /// response, leaving the decision to the caller.
    pub async fn verify_authentication<F>(&self, verify_fn: F) -> Result<()>
    where
        F: FnOnce(&Authentication) -> Result<bool>,
    {
        let first = self.control.read_frame().await?;
        let auth = match DecodedFrame::decode(&first) {
            Ok(DecodedFrame::Authentication(auth)) => auth,
            _ => {
                let reason = format!("unexpected first frame: {}", first.kind);
                self.reject(&reason).await;
                return Err(BrokerError::protocol(reason));
            }
        };

        if !verify_fn(&auth)? {
            let reason = format!(
                "authentication failed, client credential name is {}",
                auth.auth_name
            );
            self.reject(&reason).await;
            return Err(BrokerError::auth_rejected(reason));
        }

        self.control.write_message(&AuthenticationResp::ok()).await
    }

    async fn reject(&self, reason: &str) {
        if let Err(e) = self
            .control
            .write_message(&AuthenticationResp::rejected(reason))
            .await
        {
            debug!("failed to write authentication rejection: {}", e);
        }
        self.conn
            .close(ERROR_CODE_REJECTED.into(), reason.as_bytes());
    }

    /// Dispatch loop over the control stream.
    ///
    /// Handshake frames spawn data streams; close-stream frames evict them.
    /// Frames of any other type are ignored for forward compatibility. The
    /// loop exits by returning its terminal read error; the caller is then
    /// expected to close the streams remaining in `connector` and invoke
    /// [`wait`](Self::wait).
    pub async fn run(
        &mut self,
        connector: Arc<Connector>,
        builder: Arc<dyn MetadataBuilder>,
        handler: Arc<dyn StreamHandler>,
    ) -> Result<()> {
        loop {
            let frame = self.control.read_frame().await?;

            match DecodedFrame::decode(&frame)
                .map_err(|e| BrokerError::malformed(e.to_string()))?
            {
                DecodedFrame::Handshake(hs) => {
                    self.handle_handshake(hs, &connector, &builder, &handler)
                        .await?;
                }
                DecodedFrame::CloseStream(cs) => {
                    Self::handle_close_stream(cs, &connector).await;
                }
                other => {
                    debug!("ignoring {} on control stream", other.kind());
                }
            }
        }
    }

    /// Create one data stream from a handshake request.
    ///
    /// Metadata is built before the transport stream is opened, so a
    /// builder failure skips the handshake without leaving a half-opened
    /// stream behind. Transport failures after that point are fatal to the
    /// whole loop.
    async fn handle_handshake(
        &mut self,
        hs: Handshake,
        connector: &Arc<Connector>,
        builder: &Arc<dyn MetadataBuilder>,
        handler: &Arc<dyn StreamHandler>,
    ) -> Result<()> {
        let metadata = match builder.build(&hs) {
            Ok(md) => md,
            Err(e) => {
                warn!("failed to build metadata for stream {}: {}", hs.id, e);
                return Ok(());
            }
        };

        let (send, recv) = self.conn.open_bi().await?;
        let transport = FrameStream::new(recv, send);

        let id = hs.id.clone();
        let stream = Arc::new(DataStream::new(
            hs.name,
            hs.id,
            hs.stream_kind,
            metadata,
            transport,
            hs.observe_tags,
            Arc::clone(&self.control),
        ));
        stream.send_handshake_ack().await?;

        connector.add(id.clone(), Arc::clone(&stream)).await;
        debug!(
            "data stream {} registered ({}, {})",
            id,
            stream.name(),
            stream.kind()
        );

        let connector = Arc::clone(connector);
        let handler = Arc::clone(handler);
        self.tasks.spawn(async move {
            let ctx = StreamContext::new(Arc::clone(&stream));
            // The stream must be closed and deregistered even when the
            // handler panics
            if AssertUnwindSafe(handler.handle(ctx)).catch_unwind().await.is_err() {
                error!("dispatch handler for stream {} panicked", id);
            }

            if let Err(e) = stream.close().await {
                debug!("failed to close data stream {} after dispatch: {}", id, e);
            }
            connector.remove_if_current(&id, &stream).await;
        });

        Ok(())
    }

    async fn handle_close_stream(cs: CloseStream, connector: &Arc<Connector>) {
        let Some(stream) = connector.get(&cs.stream_id).await else {
            // Already gone; closing twice is allowed
            return;
        };

        if let Err(e) = stream.close().await {
            error!(
                "failed to close data stream {} ({}, {}): {}",
                stream.id(),
                stream.name(),
                stream.kind(),
                e
            );
        }
        debug!(
            "client closed data stream {} ({}, {}): {}",
            stream.id(),
            stream.name(),
            stream.kind(),
            cs.reason
        );
        connector.remove(&cs.stream_id).await;
    }

    /// Block until every dispatch task spawned by this group has finished.
    /// Does not close streams; that is the caller's job before waiting.
    pub async fn wait(&mut self) {
        while let Some(result) = self.tasks.join_next().await {
            if let Err(e) = result {
                if e.is_panic() {
                    error!("stream dispatch task panicked");
                }
            }
        }
    }
}
