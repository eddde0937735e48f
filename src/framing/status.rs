use super::codec::{read_text, write_text};
use crate::error::{FsError, FsResult};

use std::fmt;
use std::str::FromStr;
use tokio::io::{AsyncRead, AsyncWrite};

const OK: &str = "OK";
const ERROR: &str = "ERROR";

/// Outcome tag sent after a command or sub-request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Ok,
    Error(String),
}

impl Status {
    pub fn error(reason: impl Into<String>) -> Self {
        Status::Error(reason.into())
    }

    pub fn from_error(err: &FsError) -> Self {
        Status::Error(err.wire_reason())
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Status::Ok)
    }

    /// Turns an `ERROR:<reason>` into [`FsError::Remote`].
    pub fn into_result(self) -> FsResult<()> {
        match self {
            Status::Ok => Ok(()),
            Status::Error(reason) => Err(FsError::Remote(reason)),
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Ok => f.write_str(OK),
            Status::Error(reason) => write!(f, "{}:{}", ERROR, reason),
        }
    }
}

impl FromStr for Status {
    type Err = FsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == OK {
            return Ok(Status::Ok);
        }
        if s == ERROR {
            return Ok(Status::error(""));
        }

        match s.strip_prefix(ERROR).and_then(|rest| rest.strip_prefix(':')) {
            Some(reason) => Ok(Status::error(reason)),
            None => Err(FsError::Protocol(format!("unexpected status frame: {:?}", s))),
        }
    }
}

pub async fn write_status<W>(writer: &mut W, status: &Status) -> FsResult<()>
where
    W: AsyncWrite + Unpin,
{
    write_text(writer, &status.to_string()).await
}

pub async fn read_status<R>(reader: &mut R) -> FsResult<Status>
where
    R: AsyncRead + Unpin,
{
    read_text(reader).await?.parse()
}
