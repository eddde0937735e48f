//! Storage Node Sub-Protocol
//!
//! Defines the command words and request headers exchanged between the gateway and
//! a backend Store node. Every sub-request starts with one command word (a text
//! field) followed by the fields listed on each variant; every reply starts with a
//! status field.

use crate::error::{FsError, FsResult};
use crate::framing::{read_size, read_text, write_size, write_text};

use std::fmt;
use std::str::FromStr;
use tokio::io::{AsyncRead, AsyncWrite};

// --- Command Words ---

/// Store a file: path, filename, size, payload -> status.
pub const CMD_UPLOAD: &str = "UPLOAD";
/// Fetch a file: path -> status [+ size + payload].
pub const CMD_DOWNLOAD: &str = "DOWNLOAD";
/// Remove a file: path -> status.
pub const CMD_DELETE: &str = "DELETE";
/// Archive every file of the node's class: -> status [+ size + payload].
pub const CMD_TAR: &str = "TAR";
/// List a directory: path -> status [+ size + listing].
pub const CMD_LIST: &str = "LIST";
/// End the connection.
pub const CMD_QUIT: &str = "QUIT";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeCommand {
    Upload,
    Download,
    Delete,
    Tar,
    List,
    Quit,
}

impl NodeCommand {
    pub fn as_str(self) -> &'static str {
        match self {
            NodeCommand::Upload => CMD_UPLOAD,
            NodeCommand::Download => CMD_DOWNLOAD,
            NodeCommand::Delete => CMD_DELETE,
            NodeCommand::Tar => CMD_TAR,
            NodeCommand::List => CMD_LIST,
            NodeCommand::Quit => CMD_QUIT,
        }
    }
}

impl fmt::Display for NodeCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeCommand {
    type Err = FsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            CMD_UPLOAD => Ok(NodeCommand::Upload),
            CMD_DOWNLOAD => Ok(NodeCommand::Download),
            CMD_DELETE => Ok(NodeCommand::Delete),
            CMD_TAR => Ok(NodeCommand::Tar),
            CMD_LIST => Ok(NodeCommand::List),
            CMD_QUIT => Ok(NodeCommand::Quit),
            other => Err(FsError::UnknownCommand(other.to_string())),
        }
    }
}

// --- Request Headers ---

/// Fields that precede the payload of an `UPLOAD`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadHeader {
    /// Destination directory, usually a virtual path rooted at the token.
    pub path: String,
    /// Bare file name written inside `path`.
    pub filename: String,
    /// Number of payload bytes that follow.
    pub size: u64,
}

impl UploadHeader {
    pub async fn write_to<W>(&self, writer: &mut W) -> FsResult<()>
    where
        W: AsyncWrite + Unpin,
    {
        write_text(writer, &self.path).await?;
        write_text(writer, &self.filename).await?;
        write_size(writer, self.size).await
    }

    pub async fn read_from<R>(reader: &mut R) -> FsResult<Self>
    where
        R: AsyncRead + Unpin,
    {
        let path = read_text(reader).await?;
        let filename = read_text(reader).await?;
        let size = read_size(reader).await?;
        Ok(Self {
            path,
            filename,
            size,
        })
    }
}
