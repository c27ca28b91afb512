//! gRPC server assembly.

use std::net::SocketAddr;
use std::sync::Arc;

use runbox_runtime::registry::JobRegistry;
use tonic::transport::Server;

use crate::proto::jobs_server::JobsServer;
use crate::service::JobsService;
use crate::tls::TlsMaterial;

/// The listening gRPC server.
pub struct GrpcServer {
    addr: SocketAddr,
    tls: TlsMaterial,
    registry: Arc<JobRegistry>,
}

impl GrpcServer {
    /// Bundles the listen address, TLS material, and registry.
    #[must_use]
    pub fn new(addr: SocketAddr, tls: TlsMaterial, registry: Arc<JobRegistry>) -> Self {
        Self {
            addr,
            tls,
            registry,
        }
    }

    /// Serves the Jobs API until `shutdown` resolves.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS config is rejected or the listener
    /// fails.
    pub async fn run<F>(self, shutdown: F) -> Result<(), tonic::transport::Error>
    where
        F: Future<Output = ()> + Send,
    {
        let service = JobsService::new(self.registry);

        tracing::info!(addr = %self.addr, "starting job server");
        Server::builder()
            .tls_config(self.tls.server_tls_config())?
            .add_service(JobsServer::new(service))
            .serve_with_shutdown(self.addr, shutdown)
            .await
    }
}
