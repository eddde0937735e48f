use std::fmt;
use std::net::SocketAddr;
use std::time::Instant;

/// Random per-connection identifier, used only to correlate log lines.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One accepted connection as seen by the session registry.
#[derive(Debug, Clone)]
pub struct SessionInfo {
    pub id: SessionId,
    pub peer: SocketAddr,
    pub started_at: Instant,
}

impl SessionInfo {
    pub fn new(peer: SocketAddr) -> Self {
        Self {
            id: SessionId::new(),
            peer,
            started_at: Instant::now(),
        }
    }
}
