//! Error taxonomy shared by every node role.

use std::net::SocketAddr;
use thiserror::Error;

/// Failures raised while parsing, routing or executing file operations.
#[derive(Debug, Error)]
pub enum FsError {
    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("unknown command: {0}")]
    UnknownCommand(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("truncated transfer: expected {expected} bytes, received {received}")]
    TruncatedTransfer { expected: u64, received: u64 },

    #[error("peer unreachable: {addr}: {reason}")]
    PeerUnreachable { addr: SocketAddr, reason: String },

    #[error("remote error: {0}")]
    Remote(String),
}

impl FsError {
    /// Short reason carried in an `ERROR:<reason>` status frame.
    pub fn wire_reason(&self) -> String {
        match self {
            FsError::Protocol(msg) => format!("ProtocolError: {}", msg),
            FsError::Validation(msg) => format!("ValidationError: {}", msg),
            FsError::UnknownCommand(_) => "UNKNOWN_COMMAND".to_string(),
            FsError::NotFound(_) => "NotFound".to_string(),
            FsError::Io(e) => format!("IOError: {}", e.kind()),
            FsError::TruncatedTransfer { .. } => "TruncatedTransfer".to_string(),
            FsError::PeerUnreachable { .. } => "PeerUnreachable".to_string(),
            FsError::Remote(reason) => reason.clone(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        match self {
            FsError::NotFound(_) => true,
            FsError::Remote(reason) => reason.starts_with("NotFound"),
            _ => false,
        }
    }
}

/// Result type for file store operations.
pub type FsResult<T> = std::result::Result<T, FsError>;
