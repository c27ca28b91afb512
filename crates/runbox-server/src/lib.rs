//! # runbox-server
//!
//! gRPC service surface for the runbox job server.
//!
//! Owns the wire contract (`proto/runbox.proto`), the mutual-TLS
//! transport configuration, peer-identity extraction from client
//! certificates, and the [`service::JobsService`] that translates RPCs
//! into registry operations.

pub mod server;
pub mod service;
pub mod tls;

/// Generated protobuf types for the Jobs service.
#[allow(missing_docs, unreachable_pub, clippy::pedantic, clippy::nursery)]
pub mod proto {
    tonic::include_proto!("runbox");
}
