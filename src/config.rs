//! Cluster configuration.
//!
//! Addresses and home directories are fixed deployment inputs. They come from
//! an optional JSON file; anything absent falls back to the defaults below.

use crate::error::{FsError, FsResult};
use crate::paths::ROOT_TOKEN;
use crate::routing::{FileClass, NodeRole, RoutingTable};

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NodeEndpoint {
    pub addr: SocketAddr,
    /// Home directory; a leading `~` is expanded.
    pub home: String,
}

impl NodeEndpoint {
    fn new(port: u16, home: &str) -> Self {
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], port)),
            home: home.to_string(),
        }
    }

    pub fn home_dir(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.home).into_owned())
    }
}

/// How the gateway talks to backend nodes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PeerOptions {
    pub connect_timeout_ms: u64,
    pub connect_attempts: usize,
}

impl PeerOptions {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

impl Default for PeerOptions {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 2_000,
            connect_attempts: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClusterConfig {
    pub root_token: String,
    pub gateway: NodeEndpoint,
    pub document: NodeEndpoint,
    pub text: NodeEndpoint,
    pub archive: NodeEndpoint,
    pub peer: PeerOptions,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            root_token: ROOT_TOKEN.to_string(),
            gateway: NodeEndpoint::new(8080, "~/S1"),
            document: NodeEndpoint::new(8081, "~/S2"),
            text: NodeEndpoint::new(8082, "~/S3"),
            archive: NodeEndpoint::new(8083, "~/S4"),
            peer: PeerOptions::default(),
        }
    }
}

impl ClusterConfig {
    /// Loads the JSON file at `path`, or the defaults when no path is given.
    pub fn load(path: Option<&Path>) -> FsResult<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let raw = std::fs::read_to_string(path)?;
        let config: ClusterConfig = serde_json::from_str(&raw).map_err(|e| {
            FsError::Validation(format!("invalid config {}: {}", path.display(), e))
        })?;
        config.validate()?;

        tracing::info!("Loaded cluster config from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> FsResult<()> {
        if self.root_token.is_empty() || self.root_token.contains('/') {
            return Err(FsError::Validation(format!(
                "root token must be a single non-empty component, got {:?}",
                self.root_token
            )));
        }
        if self.peer.connect_attempts == 0 {
            return Err(FsError::Validation(
                "peer.connect_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn endpoint(&self, role: NodeRole) -> &NodeEndpoint {
        match role {
            NodeRole::Gateway | NodeRole::Store(FileClass::SourceCode) => &self.gateway,
            NodeRole::Store(FileClass::Document) => &self.document,
            NodeRole::Store(FileClass::Text) => &self.text,
            NodeRole::Store(FileClass::Archive) => &self.archive,
        }
    }

    pub fn endpoint_mut(&mut self, role: NodeRole) -> &mut NodeEndpoint {
        match role {
            NodeRole::Gateway | NodeRole::Store(FileClass::SourceCode) => &mut self.gateway,
            NodeRole::Store(FileClass::Document) => &mut self.document,
            NodeRole::Store(FileClass::Text) => &mut self.text,
            NodeRole::Store(FileClass::Archive) => &mut self.archive,
        }
    }

    pub fn routing_table(&self) -> RoutingTable {
        RoutingTable::new(self.document.addr, self.text.addr, self.archive.addr)
    }
}
