//! Broker endpoint: accepts connections and runs one stream group per
//! connection.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use quinn::Endpoint;
use rustls::pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer};
use tracing::{debug, error, info, warn};

use crate::error::{BrokerError, Result};
use crate::server::auth::CredentialVerifier;
use crate::server::connector::Connector;
use crate::server::context::StreamHandler;
use crate::server::metadata::MetadataBuilder;
use crate::server::stream_group::StreamGroup;
use crate::transport::framed::FrameStream;

/// ALPN protocol identifier
const ALPN: &[u8] = b"vireo";

/// Broker configuration
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    /// Address to bind to
    pub bind_addr: SocketAddr,
    /// Maximum concurrent connections
    pub max_connections: usize,
    /// Connection idle timeout
    pub idle_timeout: Duration,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:9000".parse().unwrap(),
            max_connections: 10000,
            idle_timeout: Duration::from_secs(300),
        }
    }
}

/// QUIC broker server
pub struct Broker {
    config: BrokerConfig,
    endpoint: Option<Endpoint>,
    verifier: Arc<dyn CredentialVerifier>,
    builder: Arc<dyn MetadataBuilder>,
    handler: Arc<dyn StreamHandler>,
    active_connections: Arc<AtomicUsize>,
}

impl Broker {
    pub fn new(
        config: BrokerConfig,
        verifier: Arc<dyn CredentialVerifier>,
        builder: Arc<dyn MetadataBuilder>,
        handler: Arc<dyn StreamHandler>,
    ) -> Self {
        Self {
            config,
            endpoint: None,
            verifier,
            builder,
            handler,
            active_connections: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// The bound address, once [`bind`](Self::bind) has run
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.endpoint.as_ref().and_then(|e| e.local_addr().ok())
    }

    /// Number of currently served connections
    pub fn active_connections(&self) -> usize {
        self.active_connections.load(Ordering::SeqCst)
    }

    /// Start the broker and serve connections until the endpoint stops
    /// accepting.
    pub async fn start(&mut self) -> Result<()> {
        self.bind()?;
        self.serve().await
    }

    /// Create the QUIC endpoint with a self-signed development certificate.
    pub fn bind(&mut self) -> Result<()> {
        info!("starting broker on {}", self.config.bind_addr);

        let cert = rcgen::generate_simple_self_signed(vec!["localhost".into()])
            .map_err(|e| BrokerError::config(format!("failed to generate certificate: {}", e)))?;

        let cert_der = CertificateDer::from(cert.serialize_der().map_err(|e| {
            BrokerError::config(format!("failed to serialize certificate: {}", e))
        })?);
        let key_der =
            PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(cert.serialize_private_key_der()));

        // Configure rustls
        let mut server_config = rustls::ServerConfig::builder()
            .with_no_client_auth()
            .with_single_cert(vec![cert_der], key_der)
            .map_err(|e| BrokerError::config(format!("failed to configure TLS: {}", e)))?;

        server_config.alpn_protocols = vec![ALPN.to_vec()];

        // Configure QUIC
        let mut transport_config = quinn::TransportConfig::default();
        transport_config.max_concurrent_bidi_streams(256u32.into());
        transport_config.max_idle_timeout(Some(
            self.config
                .idle_timeout
                .try_into()
                .map_err(|_| BrokerError::config("idle timeout out of range"))?,
        ));

        let mut quic_server_config = quinn::ServerConfig::with_crypto(Arc::new(
            quinn::crypto::rustls::QuicServerConfig::try_from(server_config)
                .map_err(|e| BrokerError::config(format!("failed to create QUIC config: {}", e)))?,
        ));
        quic_server_config.transport_config(Arc::new(transport_config));

        let endpoint = Endpoint::server(quic_server_config, self.config.bind_addr)
            .map_err(|e| BrokerError::network(format!("failed to create endpoint: {}", e)))?;

        info!("broker listening on {}", endpoint.local_addr()?);
        self.endpoint = Some(endpoint);
        Ok(())
    }

    /// Accept incoming connections until the endpoint closes.
    pub async fn serve(&self) -> Result<()> {
        let endpoint = self
            .endpoint
            .clone()
            .ok_or_else(|| BrokerError::config("broker is not bound"))?;

        loop {
            match endpoint.accept().await {
                Some(incoming) => {
                    if self.active_connections.load(Ordering::SeqCst) >= self.config.max_connections
                    {
                        warn!("connection limit reached, refusing connection");
                        incoming.refuse();
                        continue;
                    }

                    let broker = self.clone_ref();
                    broker.active_connections.fetch_add(1, Ordering::SeqCst);
                    tokio::spawn(async move {
                        if let Err(e) = broker.handle_incoming(incoming).await {
                            error!("connection handling failed: {}", e);
                        }
                        broker.active_connections.fetch_sub(1, Ordering::SeqCst);
                    });
                }
                None => {
                    warn!("endpoint stopped accepting connections");
                    break;
                }
            }
        }
        Ok(())
    }

    /// Serve one connection: authenticate over the control stream, run the
    /// dispatch loop, then tear down every remaining data stream and drain
    /// the group.
    async fn handle_incoming(&self, incoming: quinn::Incoming) -> Result<()> {
        let connection = incoming.await?;
        let remote_addr = connection.remote_address();
        let conn_id = uuid::Uuid::new_v4().to_string();

        debug!("new connection {} from {}", conn_id, remote_addr);

        // The control stream is the first stream the client opens
        let (send, recv) = connection.accept_bi().await.map_err(|e| {
            BrokerError::connection(format!("failed to accept control stream: {}", e))
        })?;
        let control = Arc::new(FrameStream::new(recv, send));

        let mut group = StreamGroup::new(connection.clone(), control);

        let verifier = Arc::clone(&self.verifier);
        if let Err(e) = group
            .verify_authentication(|auth| verifier.verify(auth))
            .await
        {
            info!("connection {} failed authentication: {}", conn_id, e);
            return Ok(());
        }
        info!("connection {} from {} authenticated", conn_id, remote_addr);

        let connector = Arc::new(Connector::new());
        let result = group
            .run(
                Arc::clone(&connector),
                Arc::clone(&self.builder),
                Arc::clone(&self.handler),
            )
            .await;
        if let Err(e) = result {
            debug!("connection {} control loop ended: {}", conn_id, e);
        }

        // Close whatever the client left open, then drain dispatch tasks
        for stream in connector.snapshot().await {
            if let Err(e) = stream.close().await {
                debug!("failed to close stream {} on teardown: {}", stream.id(), e);
            }
        }
        group.wait().await;

        debug!("connection {} drained", conn_id);
        Ok(())
    }

    /// Close the endpoint and stop serving
    pub async fn shutdown(&mut self) {
        if let Some(endpoint) = self.endpoint.take() {
            endpoint.close(0u32.into(), b"server shutdown");
            info!("broker shutdown complete");
        }
    }

    /// Clone reference for spawning tasks
    fn clone_ref(&self) -> Arc<Self> {
        Arc::new(Self {
            config: self.config.clone(),
            endpoint: self.endpoint.clone(),
            verifier: Arc::clone(&self.verifier),
            builder: Arc::clone(&self.builder),
            handler: Arc::clone(&self.handler),
            active_connections: Arc::clone(&self.active_connections),
        })
    }
}
