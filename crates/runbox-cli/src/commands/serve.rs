//! The `serve` subcommand: run the job server.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use runbox_common::config::ServerConfig;
use runbox_common::constants::{DEFAULT_CGROUP_ROOT, DEFAULT_LISTEN_ADDR, DEFAULT_LISTEN_PORT};
use runbox_core::cgroup;
use runbox_runtime::registry::JobRegistry;
use runbox_server::server::GrpcServer;
use runbox_server::tls::TlsMaterial;

/// Arguments for `runbox serve`.
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Address to listen on.
    #[arg(long, default_value = DEFAULT_LISTEN_ADDR)]
    pub listen_addr: String,

    /// Port to listen on.
    #[arg(long, default_value_t = DEFAULT_LISTEN_PORT)]
    pub port: u16,

    /// CA certificate used to verify client certificates.
    #[arg(long, default_value = "ssl/ca.crt")]
    pub ca_cert: PathBuf,

    /// Server certificate.
    #[arg(long, default_value = "ssl/server.crt")]
    pub cert: PathBuf,

    /// Server private key.
    #[arg(long, default_value = "ssl/server.key")]
    pub key: PathBuf,

    /// Mount point for the cgroup v2 hierarchy jobs are placed under.
    #[arg(long, default_value = DEFAULT_CGROUP_ROOT)]
    pub cgroup_root: PathBuf,
}

impl From<ServeArgs> for ServerConfig {
    fn from(args: ServeArgs) -> Self {
        Self {
            listen_addr: args.listen_addr,
            listen_port: args.port,
            ca_cert_path: args.ca_cert,
            cert_path: args.cert,
            key_path: args.key,
            cgroup_root: args.cgroup_root,
        }
    }
}

/// Runs the job server until ctrl-c.
///
/// Mounts the cgroup hierarchy on startup and unmounts it again on the
/// way out.
///
/// # Errors
///
/// Returns an error if TLS material cannot be loaded, the hierarchy
/// cannot be mounted, or the listener fails.
pub async fn execute(args: ServeArgs) -> anyhow::Result<()> {
    let config = ServerConfig::from(args);

    let tls = TlsMaterial::load(&config.ca_cert_path, &config.cert_path, &config.key_path).await?;
    cgroup::mount_hierarchy(&config.cgroup_root)?;

    let registry = Arc::new(JobRegistry::new(config.cgroup_root.clone()));
    let addr: SocketAddr = format!("{}:{}", config.listen_addr, config.listen_port).parse()?;

    let result = GrpcServer::new(addr, tls, registry)
        .run(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown signal received");
        })
        .await;

    if let Err(e) = cgroup::unmount_hierarchy(&config.cgroup_root) {
        tracing::warn!(error = %e, "cgroup hierarchy unmount failed");
    }
    result.map_err(Into::into)
}
