use super::protocol::{NodeCommand, UploadHeader};
use super::service::{StorageNode, format_listing};
use crate::error::{FsError, FsResult};
use crate::framing::{
    Status, read_text, read_text_opt, send_payload, write_listing, write_size, write_status,
};
use crate::session::{ConnectionHandler, SessionInfo};

use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

impl ConnectionHandler for StorageNode {
    async fn handle(self: Arc<Self>, mut stream: TcpStream, _session: SessionInfo) -> FsResult<()> {
        serve_connection(&self, &mut stream).await
    }
}

/// Executes sub-requests from one connection, in order, until `QUIT` or close.
pub async fn serve_connection<S>(node: &StorageNode, stream: &mut S) -> FsResult<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    loop {
        let word = match read_text_opt(stream).await {
            Ok(Some(word)) => word,
            Ok(None) => return Ok(()),
            Err(e @ FsError::Protocol(_)) => {
                tracing::warn!("Malformed sub-request: {}", e);
                write_status(stream, &Status::from_error(&e)).await?;
                continue;
            }
            Err(e) => return Err(e),
        };

        let command = match word.parse::<NodeCommand>() {
            Ok(command) => command,
            Err(e) => {
                tracing::warn!("Rejected sub-request {:?}", word);
                write_status(stream, &Status::from_error(&e)).await?;
                continue;
            }
        };

        tracing::debug!("{} sub-request", command);
        match command {
            NodeCommand::Upload => handle_upload(node, stream).await?,
            NodeCommand::Download => handle_download(node, stream).await?,
            NodeCommand::Delete => handle_delete(node, stream).await?,
            NodeCommand::Tar => handle_tar(node, stream).await?,
            NodeCommand::List => handle_list(node, stream).await?,
            NodeCommand::Quit => return Ok(()),
        }
    }
}

async fn handle_upload<S>(node: &StorageNode, stream: &mut S) -> FsResult<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let header = UploadHeader::read_from(stream).await?;

    let status = match node
        .store(&header.path, &header.filename, header.size, stream)
        .await
    {
        Ok(target) => {
            tracing::info!("Stored {} ({} bytes)", target.display(), header.size);
            Status::Ok
        }
        // The sender is gone; nobody is left to read a status.
        Err(e @ FsError::TruncatedTransfer { .. }) => return Err(e),
        Err(e) => {
            tracing::error!("Failed to store {} in {}: {}", header.filename, header.path, e);
            Status::from_error(&e)
        }
    };

    write_status(stream, &status).await
}

async fn handle_download<S>(node: &StorageNode, stream: &mut S) -> FsResult<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let path = read_text(stream).await?;

    match node.open(&path).await {
        Ok((mut file, size)) => {
            write_status(stream, &Status::Ok).await?;
            write_size(stream, size).await?;
            send_payload(stream, &mut file, size).await?;
            tracing::info!("Sent {} ({} bytes)", path, size);
            Ok(())
        }
        Err(e) => {
            tracing::warn!("Cannot send {}: {}", path, e);
            write_status(stream, &Status::from_error(&e)).await
        }
    }
}

async fn handle_delete<S>(node: &StorageNode, stream: &mut S) -> FsResult<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let path = read_text(stream).await?;

    let status = match node.delete(&path).await {
        Ok(()) => {
            tracing::info!("Deleted {}", path);
            Status::Ok
        }
        Err(e) => {
            tracing::warn!("Cannot delete {}: {}", path, e);
            Status::from_error(&e)
        }
    };

    write_status(stream, &status).await
}

async fn handle_tar<S>(node: &StorageNode, stream: &mut S) -> FsResult<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    match node.archive().await {
        Ok((mut file, size)) => {
            write_status(stream, &Status::Ok).await?;
            write_size(stream, size).await?;
            send_payload(stream, &mut file, size).await?;
            tracing::info!("Sent .{} archive ({} bytes)", node.class(), size);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Failed to build .{} archive: {}", node.class(), e);
            write_status(stream, &Status::from_error(&e)).await
        }
    }
}

async fn handle_list<S>(node: &StorageNode, stream: &mut S) -> FsResult<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let path = read_text(stream).await?;

    match node.list(&path).await {
        Ok(names) => {
            write_status(stream, &Status::Ok).await?;
            write_listing(stream, &format_listing(&names)).await?;
            tracing::debug!("Listed {} .{} files in {}", names.len(), node.class(), path);
            Ok(())
        }
        Err(e) => {
            tracing::warn!("Cannot list {}: {}", path, e);
            write_status(stream, &Status::from_error(&e)).await
        }
    }
}
