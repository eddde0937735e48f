//! Gateway Dispatcher
//!
//! Executes one accepted client command. Each file reference is classified by
//! extension and routed: SourceCode is served by the embedded local store, every
//! other class by its backend Store node.
//!
//! ## Failure Policy
//! A failing Store node degrades only its own contribution: a per-item `ERROR`
//! status, or nothing added to a listing. The only error returned from
//! [`Gateway::dispatch`] is a failure on the client stream itself.
//!
//! ## Staging
//! Bytes are never relayed straight from one socket into another. Uploads are
//! staged from the client before being forwarded, and downloads and archives are
//! staged from their source before the client sees a status, so a source failing
//! mid-transfer becomes a clean per-item `ERROR` rather than a broken stream.

use super::command::CommandRequest;
use crate::config::{ClusterConfig, PeerOptions};
use crate::error::{FsError, FsResult};
use crate::framing::{
    Status, discard_payload, read_size, recv_payload_draining, send_payload, write_listing,
    write_size, write_status, write_text,
};
use crate::paths::PathResolver;
use crate::routing::{FileClass, NodeDescriptor, NodeRole, RoutingTable, Target};
use crate::storage::{NodeClient, StorageNode, format_listing};

use std::io::SeekFrom;
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncSeekExt, AsyncWrite};

// --- Completion Markers ---

pub const UPLOAD_COMPLETE: &str = "UPLOAD_COMPLETE";
pub const DOWNLOAD_COMPLETE: &str = "DOWNLOAD_COMPLETE";
pub const DELETE_COMPLETE: &str = "DELETE_COMPLETE";
pub const TAR_COMPLETE: &str = "TAR_COMPLETE";

pub struct Gateway {
    local: StorageNode,
    routes: RoutingTable,
    peer: PeerOptions,
}

impl Gateway {
    pub fn new(local: StorageNode, routes: RoutingTable, peer: PeerOptions) -> Self {
        Self {
            local,
            routes,
            peer,
        }
    }

    pub fn from_config(config: &ClusterConfig) -> Self {
        let resolver = PathResolver::new(config.gateway.home_dir(), config.root_token.clone());
        Self::new(
            StorageNode::new(NodeRole::Gateway, resolver),
            config.routing_table(),
            config.peer.clone(),
        )
    }

    /// The embedded SourceCode store.
    pub fn local(&self) -> &StorageNode {
        &self.local
    }

    pub fn token(&self) -> &str {
        self.local.resolver().token()
    }

    fn remote(&self, node: NodeDescriptor) -> NodeClient {
        NodeClient::new(node, self.peer.clone())
    }

    /// Runs the command-specific exchange that follows an accepted command.
    pub async fn dispatch<S>(&self, request: &CommandRequest, stream: &mut S) -> FsResult<()>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        match request {
            CommandRequest::Upload { files, destination } => {
                self.store_many(files, destination, stream).await
            }
            CommandRequest::Download { paths } => self.fetch_many(paths, stream).await,
            CommandRequest::Remove { paths } => self.delete_many(paths, stream).await,
            CommandRequest::Archive { class } => self.archive_by_class(*class, stream).await,
            CommandRequest::List { path } => self.list_namespace(path, stream).await,
            CommandRequest::Quit => Ok(()),
        }
    }

    // ============================================================
    // STORE
    // ============================================================

    async fn store_many<S>(
        &self,
        files: &[String],
        destination: &str,
        stream: &mut S,
    ) -> FsResult<()>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        for file in files {
            let size = read_size(stream).await?;

            let (mut staged, ack) = match stage_from_client(stream, size).await {
                Ok(staged) => (Some(staged), Status::Ok),
                // The client stopped mid-payload; nothing more can be read.
                Err(e @ FsError::TruncatedTransfer { .. }) => return Err(e),
                Err(e) => {
                    tracing::error!("Failed to stage {} ({} bytes): {}", file, size, e);
                    (None, Status::from_error(&e))
                }
            };
            write_status(stream, &ack).await?;

            if let Some(staged) = staged.as_mut() {
                match self.forward_upload(file, destination, size, staged).await {
                    Ok(()) => tracing::info!("Stored {} in {}", file, destination),
                    Err(e) => tracing::error!("Failed to store {} in {}: {}", file, destination, e),
                }
            }
        }

        write_text(stream, UPLOAD_COMPLETE).await
    }

    async fn forward_upload(
        &self,
        file: &str,
        destination: &str,
        size: u64,
        staged: &mut File,
    ) -> FsResult<()> {
        let filename = basename(file)?;
        let class = FileClass::from_filename(filename)?;
        staged.seek(SeekFrom::Start(0)).await?;

        match self.routes.target(class) {
            Target::Local => {
                self.local.store(destination, filename, size, staged).await?;
            }
            Target::Remote(node) => {
                self.remote(node).upload(destination, filename, size, staged).await?;
            }
        }
        Ok(())
    }

    // ============================================================
    // FETCH
    // ============================================================

    async fn fetch_many<S>(&self, paths: &[String], stream: &mut S) -> FsResult<()>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        for path in paths {
            match self.fetch_staged(path).await {
                Ok((mut staged, size)) => {
                    write_status(stream, &Status::Ok).await?;
                    write_size(stream, size).await?;
                    send_payload(stream, &mut staged, size).await?;
                    tracing::info!("Sent {} ({} bytes)", path, size);
                }
                Err(e) => {
                    tracing::warn!("Cannot fetch {}: {}", path, e);
                    write_status(stream, &Status::from_error(&e)).await?;
                }
            }
        }

        write_text(stream, DOWNLOAD_COMPLETE).await
    }

    async fn fetch_staged(&self, path: &str) -> FsResult<(File, u64)> {
        let class = FileClass::from_filename(path)?;
        let mut staged = File::from_std(tempfile::tempfile()?);

        let size = match self.routes.target(class) {
            Target::Local => {
                let (mut source, size) = self.local.open(path).await?;
                send_payload(&mut staged, &mut source, size).await?;
                size
            }
            Target::Remote(node) => self.remote(node).download(path, &mut staged).await?,
        };

        staged.seek(SeekFrom::Start(0)).await?;
        Ok((staged, size))
    }

    // ============================================================
    // DELETE
    // ============================================================

    async fn delete_many<S>(&self, paths: &[String], stream: &mut S) -> FsResult<()>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        for path in paths {
            let status = match self.delete_one(path).await {
                Ok(()) => {
                    tracing::info!("Deleted {}", path);
                    Status::Ok
                }
                Err(e) => {
                    tracing::warn!("Cannot delete {}: {}", path, e);
                    Status::from_error(&e)
                }
            };
            write_status(stream, &status).await?;
        }

        write_text(stream, DELETE_COMPLETE).await
    }

    async fn delete_one(&self, path: &str) -> FsResult<()> {
        let class = FileClass::from_filename(path)?;
        match self.routes.target(class) {
            Target::Local => self.local.delete(path).await,
            Target::Remote(node) => self.remote(node).delete(path).await,
        }
    }

    // ============================================================
    // ARCHIVE
    // ============================================================

    async fn archive_by_class<S>(&self, class: FileClass, stream: &mut S) -> FsResult<()>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        match self.archive_staged(class).await {
            Ok((mut staged, size)) => {
                write_status(stream, &Status::Ok).await?;
                write_size(stream, size).await?;
                send_payload(stream, &mut staged, size).await?;
                tracing::info!("Sent {} ({} bytes)", class.archive_name(), size);
            }
            Err(e) => {
                tracing::warn!("Cannot archive .{} files: {}", class, e);
                write_status(stream, &Status::from_error(&e)).await?;
            }
        }

        write_text(stream, TAR_COMPLETE).await
    }

    async fn archive_staged(&self, class: FileClass) -> FsResult<(File, u64)> {
        match self.routes.target(class) {
            Target::Local => self.local.archive().await,
            Target::Remote(node) => {
                let mut staged = File::from_std(tempfile::tempfile()?);
                let size = self.remote(node).archive(&mut staged).await?;
                staged.seek(SeekFrom::Start(0)).await?;
                Ok((staged, size))
            }
        }
    }

    // ============================================================
    // LIST
    // ============================================================

    async fn list_namespace<S>(&self, path: &str, stream: &mut S) -> FsResult<()>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let mut listing = String::new();

        match self.local.list(path).await {
            Ok(names) => listing.push_str(&format_listing(&names)),
            Err(e) => {
                tracing::debug!("No local .{} listing for {}: {}", FileClass::SourceCode, path, e)
            }
        }

        for node in self.routes.remote_nodes() {
            let class = node.class;
            match self.remote(node).list(path).await {
                Ok(part) => listing.push_str(&part),
                Err(e) if e.is_not_found() => {
                    tracing::debug!("No .{} listing for {}", class, path)
                }
                Err(e) => tracing::warn!("Skipping .{} listing for {}: {}", class, path, e),
            }
        }

        write_listing(stream, &listing).await
    }
}

/// Receives a client payload into an anonymous temp file.
async fn stage_from_client<S>(stream: &mut S, size: u64) -> FsResult<File>
where
    S: AsyncRead + Unpin,
{
    let mut staged = match tempfile::tempfile() {
        Ok(file) => File::from_std(file),
        Err(e) => {
            discard_payload(stream, size).await?;
            return Err(e.into());
        }
    };

    recv_payload_draining(stream, &mut staged, size).await?;
    Ok(staged)
}

fn basename(file: &str) -> FsResult<&str> {
    Path::new(file)
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| FsError::Validation(format!("'{}' has no file name", file)))
}
