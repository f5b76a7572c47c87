//! Server configuration.

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use capfs_proto::{DEFAULT_PORT, MAX_COMMAND_LINE, MAX_CONTENT_LINE, READ_CHUNK_SIZE};
use serde::Deserialize;

/// Session and listener configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address
    pub listen_addr: SocketAddr,
    /// Maximum concurrent sessions; further connections are closed at once
    pub max_clients: usize,
    /// Maximum command line length in bytes
    pub max_command_line: usize,
    /// Maximum content piece ingested at once during `write`
    pub max_content_line: usize,
    /// Maximum bytes per chunk when streaming `read`
    pub chunk_size: usize,
    /// Pause before streaming a non-empty `read`, in milliseconds
    pub read_delay_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_PORT)),
            max_clients: 10,
            max_command_line: MAX_COMMAND_LINE,
            max_content_line: MAX_CONTENT_LINE,
            chunk_size: READ_CHUNK_SIZE,
            read_delay_ms: 0,
        }
    }
}

impl ServerConfig {
    /// Configuration listening on an ephemeral loopback port.
    pub fn loopback() -> Self {
        Self {
            listen_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, 0)),
            ..Default::default()
        }
    }

    /// Returns the read delay.
    pub fn read_delay(&self) -> Duration {
        Duration::from_millis(self.read_delay_ms)
    }
}
