use anyhow::Context;
use clap::{Parser, Subcommand};
use distributed_fs::config::ClusterConfig;
use distributed_fs::gateway::Gateway;
use distributed_fs::paths::PathResolver;
use distributed_fs::routing::{FileClass, NodeRole};
use distributed_fs::session::{ConnectionHandler, SessionManager};
use distributed_fs::storage::StorageNode;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Distributed file store node
#[derive(Parser, Debug)]
#[command(name = "distributed-fs")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to a JSON cluster configuration file
    #[arg(short, long, env = "DFS_CONFIG")]
    config: Option<PathBuf>,

    /// Override the bind address of this node
    #[arg(long, global = true)]
    bind: Option<SocketAddr>,

    /// Override the home directory of this node
    #[arg(long, global = true)]
    home: Option<String>,

    #[command(subcommand)]
    role: Role,
}

#[derive(Subcommand, Debug)]
enum Role {
    /// Client-facing gateway; stores .c files itself
    Gateway,
    /// Backend node for one file class
    Store {
        /// pdf, txt or zip
        #[arg(long)]
        class: FileClass,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    // 1. Configuration:
    let mut config =
        ClusterConfig::load(args.config.as_deref()).context("failed to load cluster config")?;

    let role = match args.role {
        Role::Gateway => NodeRole::Gateway,
        Role::Store { class } => {
            anyhow::ensure!(
                class != FileClass::SourceCode,
                ".c files are stored by the gateway; start a store for pdf, txt or zip"
            );
            NodeRole::Store(class)
        }
    };

    let endpoint = config.endpoint_mut(role);
    if let Some(bind) = args.bind {
        endpoint.addr = bind;
    }
    if let Some(home) = args.home {
        endpoint.home = home;
    }
    let bind_addr = endpoint.addr;
    let home = endpoint.home_dir();

    tracing::info!("Starting {} node on {}", role, bind_addr);

    // 2. Listener:
    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind to {}", bind_addr))?;

    // 3. Local storage + serve until Ctrl+C:
    match role {
        NodeRole::Gateway => {
            let gateway = Gateway::from_config(&config);
            init_home(gateway.local(), &home).await?;
            for node in config.routing_table().remote_nodes() {
                tracing::info!("  - .{} files -> {}", node.class, node.addr);
            }
            serve(gateway, listener).await
        }
        NodeRole::Store(_) => {
            let node = StorageNode::new(role, PathResolver::new(&home, config.root_token.clone()));
            init_home(&node, &home).await?;
            serve(node, listener).await
        }
    }
}

async fn init_home(node: &StorageNode, home: &Path) -> anyhow::Result<()> {
    node.init()
        .await
        .with_context(|| format!("failed to create home directory {}", home.display()))
}

async fn serve<H: ConnectionHandler>(
    handler: H,
    listener: tokio::net::TcpListener,
) -> anyhow::Result<()> {
    let manager = SessionManager::new(Arc::new(handler));
    tracing::info!("Press Ctrl+C to shutdown");
    manager
        .serve(listener, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for Ctrl+C: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await?;

    tracing::info!("Node stopped");
    Ok(())
}
