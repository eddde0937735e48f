//! In-process cluster used by end-to-end tests.
//!
//! Binds a gateway and the three Store nodes to ephemeral loopback ports, each
//! with its own scratch home directory.

use crate::config::PeerOptions;
use crate::gateway::Gateway;
use crate::paths::{PathResolver, ROOT_TOKEN};
use crate::routing::{FileClass, NodeRole, RoutingTable};
use crate::session::{ConnectionHandler, SessionManager};
use crate::storage::StorageNode;

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

pub struct TestCluster {
    pub gateway_addr: SocketAddr,
    homes: BTreeMap<FileClass, TempDir>,
    tasks: Vec<JoinHandle<()>>,
}

impl TestCluster {
    pub async fn start() -> Self {
        Self::start_without(&[]).await
    }

    /// Starts the cluster with the Store nodes for `down` unreachable.
    pub async fn start_without(down: &[FileClass]) -> Self {
        Self::build(down, None).await
    }

    /// Starts the cluster with `class` routed to `addr` instead of a real Store node.
    pub async fn start_with_node(class: FileClass, addr: SocketAddr) -> Self {
        Self::build(&[], Some((class, addr))).await
    }

    async fn build(down: &[FileClass], replaced: Option<(FileClass, SocketAddr)>) -> Self {
        let mut homes = BTreeMap::new();
        let mut addrs = BTreeMap::new();
        let mut tasks = Vec::new();

        for class in [FileClass::Document, FileClass::Text, FileClass::Archive] {
            let home = tempfile::tempdir().unwrap();
            if let Some((_, addr)) = replaced.filter(|(swapped, _)| *swapped == class) {
                addrs.insert(class, addr);
                homes.insert(class, home);
                continue;
            }

            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            addrs.insert(class, listener.local_addr().unwrap());

            if down.contains(&class) {
                // Nothing listens on the port once the listener is gone.
                drop(listener);
            } else {
                let node = StorageNode::new(
                    NodeRole::Store(class),
                    PathResolver::new(home.path(), ROOT_TOKEN),
                );
                tasks.push(serve(node, listener));
            }
            homes.insert(class, home);
        }

        let gateway_home = tempfile::tempdir().unwrap();
        let gateway = Gateway::new(
            StorageNode::new(
                NodeRole::Gateway,
                PathResolver::new(gateway_home.path(), ROOT_TOKEN),
            ),
            RoutingTable::new(
                addrs[&FileClass::Document],
                addrs[&FileClass::Text],
                addrs[&FileClass::Archive],
            ),
            PeerOptions {
                connect_timeout_ms: 500,
                connect_attempts: 1,
            },
        );
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let gateway_addr = listener.local_addr().unwrap();
        tasks.push(serve(gateway, listener));
        homes.insert(FileClass::SourceCode, gateway_home);

        Self {
            gateway_addr,
            homes,
            tasks,
        }
    }

    /// Home directory of the node owning `class`.
    pub fn home(&self, class: FileClass) -> &Path {
        self.homes[&class].path()
    }
}

impl Drop for TestCluster {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

fn serve<H: ConnectionHandler>(handler: H, listener: TcpListener) -> JoinHandle<()> {
    let manager = SessionManager::new(Arc::new(handler));
    tokio::spawn(async move {
        let _ = manager.serve(listener, std::future::pending()).await;
    })
}
