use super::validate::validate_request;
use crate::error::{FsError, FsResult};
use crate::framing::{
    Status, discard_payload, read_listing, read_size, read_status, read_text,
    recv_payload_draining, send_payload, write_size, write_text,
};
use crate::gateway::{
    CommandRequest, DELETE_COMPLETE, DOWNLOAD_COMPLETE, TAR_COMPLETE, UPLOAD_COMPLETE,
};
use crate::routing::FileClass;

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::net::TcpStream;

/// Result of one file inside a multi-file command.
#[derive(Debug)]
pub struct ItemReport<T> {
    pub name: String,
    pub outcome: FsResult<T>,
}

/// A client session with the gateway.
pub struct GatewayClient {
    stream: TcpStream,
    token: String,
}

impl GatewayClient {
    pub async fn connect(addr: SocketAddr, token: impl Into<String>) -> FsResult<Self> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|e| FsError::PeerUnreachable {
                addr,
                reason: e.to_string(),
            })?;
        stream.set_nodelay(true)?;

        Ok(Self {
            stream,
            token: token.into(),
        })
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// Sends the command line and waits for the gateway to accept it.
    async fn send_command(&mut self, request: &CommandRequest) -> FsResult<()> {
        validate_request(request, &self.token)?;
        write_text(&mut self.stream, &request.to_string()).await?;
        read_status(&mut self.stream).await?.into_result()
    }

    async fn expect_marker(&mut self, marker: &str) -> FsResult<()> {
        let got = read_text(&mut self.stream).await?;
        if got != marker {
            return Err(FsError::Protocol(format!(
                "expected {}, got {:?}",
                marker, got
            )));
        }
        Ok(())
    }

    /// Uploads local files into `destination` (a path rooted at the token).
    pub async fn upload(
        &mut self,
        files: &[String],
        destination: &str,
    ) -> FsResult<Vec<ItemReport<()>>> {
        let request = CommandRequest::Upload {
            files: files.to_vec(),
            destination: destination.to_string(),
        };
        validate_request(&request, &self.token)?;

        // Open everything up front: once accepted, the gateway expects every payload.
        let mut sources = Vec::with_capacity(files.len());
        for file in files {
            let (source, size) = open_upload_source(file).await?;
            sources.push((file, source, size));
        }
        self.send_command(&request).await?;

        let mut reports = Vec::with_capacity(files.len());
        for (file, mut source, size) in sources {
            write_size(&mut self.stream, size).await?;
            send_payload(&mut self.stream, &mut source, size).await?;
            let outcome = read_status(&mut self.stream).await?.into_result();

            tracing::debug!("Uploaded {} ({} bytes)", file, size);
            reports.push(ItemReport {
                name: file.clone(),
                outcome,
            });
        }

        self.expect_marker(UPLOAD_COMPLETE).await?;
        Ok(reports)
    }

    /// Downloads each path into `out_dir`, saved under its base name.
    pub async fn download(
        &mut self,
        paths: &[String],
        out_dir: &Path,
    ) -> FsResult<Vec<ItemReport<PathBuf>>> {
        let request = CommandRequest::Download {
            paths: paths.to_vec(),
        };
        self.send_command(&request).await?;

        let mut reports = Vec::with_capacity(paths.len());
        for path in paths {
            let outcome = match read_status(&mut self.stream).await? {
                Status::Ok => {
                    let size = read_size(&mut self.stream).await?;
                    let target = out_dir.join(base_name(path));
                    self.save_payload(&target, size).await.map(|_| target)
                }
                Status::Error(reason) => Err(FsError::Remote(reason)),
            };
            reports.push(ItemReport {
                name: path.clone(),
                outcome,
            });
        }

        self.expect_marker(DOWNLOAD_COMPLETE).await?;
        Ok(reports)
    }

    pub async fn remove(&mut self, paths: &[String]) -> FsResult<Vec<ItemReport<()>>> {
        let request = CommandRequest::Remove {
            paths: paths.to_vec(),
        };
        self.send_command(&request).await?;

        let mut reports = Vec::with_capacity(paths.len());
        for path in paths {
            let outcome = read_status(&mut self.stream).await?.into_result();
            reports.push(ItemReport {
                name: path.clone(),
                outcome,
            });
        }

        self.expect_marker(DELETE_COMPLETE).await?;
        Ok(reports)
    }

    /// Fetches the archive of `class` and saves it as its archive name in `out_dir`.
    pub async fn download_tar(&mut self, class: FileClass, out_dir: &Path) -> FsResult<PathBuf> {
        self.send_command(&CommandRequest::Archive { class }).await?;

        let outcome = match read_status(&mut self.stream).await? {
            Status::Ok => {
                let size = read_size(&mut self.stream).await?;
                let target = out_dir.join(class.archive_name());
                self.save_payload(&target, size).await.map(|_| target)
            }
            Status::Error(reason) => Err(FsError::Remote(reason)),
        };

        self.expect_marker(TAR_COMPLETE).await?;
        outcome
    }

    /// Names of every file under `path`, grouped by class.
    pub async fn list(&mut self, path: &str) -> FsResult<Vec<String>> {
        let request = CommandRequest::List {
            path: path.to_string(),
        };
        self.send_command(&request).await?;

        let listing = read_listing(&mut self.stream).await?;
        Ok(listing.lines().map(str::to_string).collect())
    }

    pub async fn quit(mut self) -> FsResult<()> {
        write_text(&mut self.stream, &CommandRequest::Quit.to_string()).await
    }

    /// Writes the incoming payload to `target`. A local failure still drains
    /// the payload so the session stays usable.
    async fn save_payload(&mut self, target: &Path, size: u64) -> FsResult<()> {
        let mut file = match File::create(target).await {
            Ok(file) => file,
            Err(e) => {
                discard_payload(&mut self.stream, size).await?;
                return Err(e.into());
            }
        };
        recv_payload_draining(&mut self.stream, &mut file, size).await?;
        Ok(())
    }
}

fn base_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Opens a local file for upload.
///
/// Nothing has been sent yet when this fails, so the error is a refused
/// request rather than a broken session.
pub async fn open_upload_source(file: &str) -> FsResult<(File, u64)> {
    let unreadable =
        |e: std::io::Error| FsError::Validation(format!("cannot read '{}': {}", file, e));
    let source = File::open(file).await.map_err(unreadable)?;
    let size = source.metadata().await.map_err(unreadable)?.len();
    Ok((source, size))
}
