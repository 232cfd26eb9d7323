//! Server side: connection supervision, stream registry, and dispatch

pub mod auth;
pub mod broker;
pub mod connector;
pub mod context;
pub mod data_stream;
pub mod metadata;
pub mod stream_group;

pub use auth::{AcceptAll, CredentialVerifier};
pub use broker::{Broker, BrokerConfig};
pub use connector::Connector;
pub use context::{StreamContext, StreamHandler};
pub use data_stream::DataStream;
pub use metadata::{Metadata, MetadataBuilder, PassthroughBuilder};
pub use stream_group::{StreamGroup, ERROR_CODE_REJECTED};
