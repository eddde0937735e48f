//! Accept Loop & Session Supervision
//!
//! Every accepted connection runs in its own task on a `JoinSet`. The accept loop
//! reaps finished tasks as it goes, so a long-lived node never accumulates dead
//! workers, and a slow session never delays the next accept.

use super::types::{SessionId, SessionInfo};
use crate::error::FsResult;

use dashmap::DashMap;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinSet;
use tracing::Instrument;

const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Serves one accepted connection until the peer leaves.
///
/// Implemented by the gateway (client sessions) and by every storage node
/// (gateway sub-request connections).
pub trait ConnectionHandler: Send + Sync + 'static {
    fn handle(
        self: Arc<Self>,
        stream: TcpStream,
        session: SessionInfo,
    ) -> impl Future<Output = FsResult<()>> + Send;
}

pub struct SessionManager<H> {
    handler: Arc<H>,
    sessions: Arc<DashMap<SessionId, SessionInfo>>,
}

impl<H: ConnectionHandler> SessionManager<H> {
    pub fn new(handler: Arc<H>) -> Self {
        Self {
            handler,
            sessions: Arc::new(DashMap::new()),
        }
    }

    pub fn active_sessions(&self) -> usize {
        self.sessions.len()
    }

    /// Snapshot of the live sessions, oldest first.
    pub fn sessions(&self) -> Vec<SessionInfo> {
        let mut sessions: Vec<SessionInfo> = self
            .sessions
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        sessions.sort_by_key(|s| s.started_at);
        sessions
    }

    /// Accepts connections until `shutdown` resolves, then aborts the
    /// sessions still running.
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> FsResult<()>
    where
        F: Future<Output = ()>,
    {
        let local_addr = listener.local_addr()?;
        tracing::info!("Accepting connections on {}", local_addr);

        let mut workers = JoinSet::new();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("Shutdown requested, no longer accepting on {}", local_addr);
                    break;
                }

                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => self.spawn_session(&mut workers, stream, peer),
                    Err(e) => {
                        tracing::error!("Accept failed on {}: {}", local_addr, e);
                        tokio::time::sleep(ACCEPT_BACKOFF).await;
                    }
                },

                Some(joined) = workers.join_next(), if !workers.is_empty() => {
                    if let Err(e) = joined
                        && e.is_panic()
                    {
                        tracing::error!("Session worker panicked: {}", e);
                    }
                }
            }
        }

        let outstanding = workers.len();
        workers.shutdown().await;
        if outstanding > 0 {
            tracing::info!("Aborted {} running sessions", outstanding);
        }
        Ok(())
    }

    fn spawn_session(&self, workers: &mut JoinSet<()>, stream: TcpStream, peer: SocketAddr) {
        if let Err(e) = stream.set_nodelay(true) {
            tracing::warn!("Failed to set TCP_NODELAY for {}: {}", peer, e);
        }

        let info = SessionInfo::new(peer);
        let span = tracing::info_span!("session", id = %info.id, peer = %peer);
        self.sessions.insert(info.id.clone(), info.clone());

        let guard = SessionGuard {
            id: info.id.clone(),
            sessions: self.sessions.clone(),
        };
        let handler = self.handler.clone();

        workers.spawn(
            async move {
                let _guard = guard;
                tracing::info!("Session accepted");
                match handler.handle(stream, info).await {
                    Ok(()) => tracing::info!("Session closed"),
                    Err(e) => tracing::warn!("Session ended: {}", e),
                }
            }
            .instrument(span),
        );
    }
}

/// Drops the registry entry however the worker ends: return, panic or abort.
struct SessionGuard {
    id: SessionId,
    sessions: Arc<DashMap<SessionId, SessionInfo>>,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.sessions.remove(&self.id);
    }
}
