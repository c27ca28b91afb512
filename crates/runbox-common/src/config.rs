//! Server configuration model.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Configuration for the job server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to listen on.
    pub listen_addr: String,
    /// Port to listen on.
    pub listen_port: u16,
    /// CA certificate used to verify client certificates.
    pub ca_cert_path: PathBuf,
    /// Server certificate presented to clients.
    pub cert_path: PathBuf,
    /// Server private key.
    pub key_path: PathBuf,
    /// Mount point of the cgroup v2 hierarchy that jobs are placed under.
    pub cgroup_root: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: crate::constants::DEFAULT_LISTEN_ADDR.to_string(),
            listen_port: crate::constants::DEFAULT_LISTEN_PORT,
            ca_cert_path: PathBuf::from("ssl/ca.crt"),
            cert_path: PathBuf::from("ssl/server.crt"),
            key_path: PathBuf::from("ssl/server.key"),
            cgroup_root: PathBuf::from(crate::constants::DEFAULT_CGROUP_ROOT),
        }
    }
}
