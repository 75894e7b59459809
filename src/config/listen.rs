//! HTTP listener configuration.

use serde::Deserialize;
use std::net::SocketAddr;

/// HTTP listener configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ListenConfig {
    /// Address to bind to (e.g., "0.0.0.0:8080").
    pub address: SocketAddr,
}
