use super::protocol::{NodeCommand, UploadHeader};
use crate::config::PeerOptions;
use crate::error::{FsError, FsResult};
use crate::framing::{read_listing, read_size, read_status, recv_payload, send_payload, write_text};
use crate::routing::NodeDescriptor;

use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

/// Gateway-side handle on one backend Store node.
///
/// Each call opens its own connection and ends it with `QUIT`.
#[derive(Debug, Clone)]
pub struct NodeClient {
    node: NodeDescriptor,
    options: PeerOptions,
}

impl NodeClient {
    pub fn new(node: NodeDescriptor, options: PeerOptions) -> Self {
        Self { node, options }
    }

    pub fn node(&self) -> &NodeDescriptor {
        &self.node
    }

    /// Connects with a bounded timeout, retrying with exponential backoff.
    pub async fn connect(&self) -> FsResult<NodeConnection> {
        let attempts = self.options.connect_attempts.max(1);
        let timeout = self.options.connect_timeout();
        let mut delay_ms = 150u64;
        let mut last_error = String::new();

        for attempt in 0..attempts {
            match tokio::time::timeout(timeout, TcpStream::connect(self.node.addr)).await {
                Ok(Ok(stream)) => {
                    if let Err(e) = stream.set_nodelay(true) {
                        tracing::debug!("Failed to set TCP_NODELAY for {}: {}", self.node.addr, e);
                    }
                    return Ok(NodeConnection { stream });
                }
                Ok(Err(e)) => last_error = e.to_string(),
                Err(_) => last_error = format!("connect timed out after {:?}", timeout),
            }

            if attempt + 1 < attempts {
                tracing::debug!(
                    "Connect to .{} node at {} failed (attempt {}/{}): {}",
                    self.node.class,
                    self.node.addr,
                    attempt + 1,
                    attempts,
                    last_error
                );
                let jitter = rand::random::<u64>() % 50;
                tokio::time::sleep(Duration::from_millis(delay_ms + jitter)).await;
                delay_ms = (delay_ms * 2).min(1200);
            }
        }

        Err(FsError::PeerUnreachable {
            addr: self.node.addr,
            reason: last_error,
        })
    }

    pub async fn upload<R>(
        &self,
        dir: &str,
        filename: &str,
        size: u64,
        source: &mut R,
    ) -> FsResult<()>
    where
        R: AsyncRead + Unpin,
    {
        let mut conn = self.connect().await?;
        let result = conn.upload(dir, filename, size, source).await;
        conn.quit().await;
        result
    }

    /// Fetches `path` into `sink`. Returns the number of bytes written.
    pub async fn download<W>(&self, path: &str, sink: &mut W) -> FsResult<u64>
    where
        W: AsyncWrite + Unpin,
    {
        let mut conn = self.connect().await?;
        let result = conn.download(path, sink).await;
        conn.quit().await;
        result
    }

    pub async fn delete(&self, path: &str) -> FsResult<()> {
        let mut conn = self.connect().await?;
        let result = conn.delete(path).await;
        conn.quit().await;
        result
    }

    pub async fn archive<W>(&self, sink: &mut W) -> FsResult<u64>
    where
        W: AsyncWrite + Unpin,
    {
        let mut conn = self.connect().await?;
        let result = conn.archive(sink).await;
        conn.quit().await;
        result
    }

    pub async fn list(&self, path: &str) -> FsResult<String> {
        let mut conn = self.connect().await?;
        let result = conn.list(path).await;
        conn.quit().await;
        result
    }
}

/// An open sub-protocol connection. Requests on it run strictly in sequence.
pub struct NodeConnection {
    stream: TcpStream,
}

impl NodeConnection {
    pub async fn upload<R>(
        &mut self,
        dir: &str,
        filename: &str,
        size: u64,
        source: &mut R,
    ) -> FsResult<()>
    where
        R: AsyncRead + Unpin,
    {
        write_text(&mut self.stream, NodeCommand::Upload.as_str()).await?;
        UploadHeader {
            path: dir.to_string(),
            filename: filename.to_string(),
            size,
        }
        .write_to(&mut self.stream)
        .await?;
        send_payload(&mut self.stream, source, size).await?;

        read_status(&mut self.stream).await?.into_result()
    }

    pub async fn download<W>(&mut self, path: &str, sink: &mut W) -> FsResult<u64>
    where
        W: AsyncWrite + Unpin,
    {
        write_text(&mut self.stream, NodeCommand::Download.as_str()).await?;
        write_text(&mut self.stream, path).await?;

        read_status(&mut self.stream).await?.into_result()?;
        let size = read_size(&mut self.stream).await?;
        recv_payload(&mut self.stream, sink, size).await
    }

    pub async fn delete(&mut self, path: &str) -> FsResult<()> {
        write_text(&mut self.stream, NodeCommand::Delete.as_str()).await?;
        write_text(&mut self.stream, path).await?;

        read_status(&mut self.stream).await?.into_result()
    }

    pub async fn archive<W>(&mut self, sink: &mut W) -> FsResult<u64>
    where
        W: AsyncWrite + Unpin,
    {
        write_text(&mut self.stream, NodeCommand::Tar.as_str()).await?;

        read_status(&mut self.stream).await?.into_result()?;
        let size = read_size(&mut self.stream).await?;
        recv_payload(&mut self.stream, sink, size).await
    }

    pub async fn list(&mut self, path: &str) -> FsResult<String> {
        write_text(&mut self.stream, NodeCommand::List.as_str()).await?;
        write_text(&mut self.stream, path).await?;

        read_status(&mut self.stream).await?.into_result()?;
        read_listing(&mut self.stream).await
    }

    /// Sends `QUIT` and closes. Failures here only matter to the log.
    pub async fn quit(mut self) {
        if let Err(e) = write_text(&mut self.stream, NodeCommand::Quit.as_str()).await {
            tracing::debug!("QUIT not delivered: {}", e);
        }
    }
}
