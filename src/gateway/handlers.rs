use super::command::CommandRequest;
use super::dispatcher::Gateway;
use crate::error::{FsError, FsResult};
use crate::framing::{Status, read_text_opt, write_status};
use crate::session::{ConnectionHandler, SessionInfo};

use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

impl ConnectionHandler for Gateway {
    async fn handle(self: Arc<Self>, mut stream: TcpStream, _session: SessionInfo) -> FsResult<()> {
        self.serve_client(&mut stream).await
    }
}

impl Gateway {
    /// Reads commands from one client until `quit` or disconnect.
    ///
    /// Every command is answered with an acceptance status first; the command's
    /// own exchange follows only after `OK`.
    pub async fn serve_client<S>(&self, stream: &mut S) -> FsResult<()>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        loop {
            let line = match read_text_opt(stream).await {
                Ok(Some(line)) => line,
                Ok(None) => {
                    tracing::info!("Client disconnected");
                    return Ok(());
                }
                Err(e @ FsError::Protocol(_)) => {
                    tracing::warn!("Malformed command frame: {}", e);
                    write_status(stream, &Status::from_error(&e)).await?;
                    continue;
                }
                Err(e) => return Err(e),
            };

            let request = match CommandRequest::parse(&line, self.token()) {
                Ok(CommandRequest::Quit) => {
                    tracing::info!("Client quit");
                    return Ok(());
                }
                Ok(request) => request,
                Err(e) => {
                    tracing::warn!("Refused {:?}: {}", line, e);
                    write_status(stream, &Status::from_error(&e)).await?;
                    continue;
                }
            };

            tracing::info!("Executing {}", request);
            write_status(stream, &Status::Ok).await?;
            self.dispatch(&request, stream).await?;
        }
    }
}
