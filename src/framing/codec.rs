use super::{BUFFER_SIZE, MAX_LISTING_LEN, MAX_TEXT_LEN};
use crate::error::{FsError, FsResult};

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

const TEXT_HEADER_LEN: usize = 4;

pub async fn write_text<W>(writer: &mut W, text: &str) -> FsResult<()>
where
    W: AsyncWrite + Unpin,
{
    let bytes = text.as_bytes();
    if bytes.len() > MAX_TEXT_LEN {
        return Err(FsError::Protocol(format!(
            "text field of {} bytes exceeds limit of {}",
            bytes.len(),
            MAX_TEXT_LEN
        )));
    }

    let mut frame = Vec::with_capacity(TEXT_HEADER_LEN + bytes.len());
    frame.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
    frame.extend_from_slice(bytes);

    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(())
}

/// Reads one text field. Returns `Ok(None)` when the peer closed the stream
/// cleanly before the first byte of the field.
pub async fn read_text_opt<R>(reader: &mut R) -> FsResult<Option<String>>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; TEXT_HEADER_LEN];
    let mut filled = 0;
    while filled < header.len() {
        let n = reader.read(&mut header[filled..]).await?;
        if n == 0 {
            if filled == 0 {
                return Ok(None);
            }
            return Err(FsError::TruncatedTransfer {
                expected: TEXT_HEADER_LEN as u64,
                received: filled as u64,
            });
        }
        filled += n;
    }

    let len = u32::from_be_bytes(header) as usize;
    if len > MAX_TEXT_LEN {
        // Skip the body so the stream stays on a field boundary.
        discard_payload(reader, len as u64).await?;
        return Err(FsError::Protocol(format!(
            "text field of {} bytes exceeds limit of {}",
            len, MAX_TEXT_LEN
        )));
    }

    let mut body = vec![0u8; len];
    read_full(reader, &mut body).await?;

    String::from_utf8(body)
        .map(Some)
        .map_err(|_| FsError::Protocol("text field is not valid UTF-8".to_string()))
}

/// Reads one text field; end of stream is a truncation here.
pub async fn read_text<R>(reader: &mut R) -> FsResult<String>
where
    R: AsyncRead + Unpin,
{
    read_text_opt(reader)
        .await?
        .ok_or(FsError::TruncatedTransfer {
            expected: TEXT_HEADER_LEN as u64,
            received: 0,
        })
}

pub async fn write_size<W>(writer: &mut W, size: u64) -> FsResult<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(&size.to_be_bytes()).await?;
    Ok(())
}

pub async fn read_size<R>(reader: &mut R) -> FsResult<u64>
where
    R: AsyncRead + Unpin,
{
    let mut buf = [0u8; 8];
    read_full(reader, &mut buf).await?;
    Ok(u64::from_be_bytes(buf))
}

/// Copies exactly `size` bytes from `source` onto `writer`.
///
/// A source that runs dry early (e.g. a file truncated underneath us) is
/// reported as a truncated transfer.
pub async fn send_payload<W, S>(writer: &mut W, source: &mut S, size: u64) -> FsResult<()>
where
    W: AsyncWrite + Unpin,
    S: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; BUFFER_SIZE];
    let mut sent = 0u64;

    while sent < size {
        let want = (size - sent).min(BUFFER_SIZE as u64) as usize;
        let n = source.read(&mut buf[..want]).await?;
        if n == 0 {
            return Err(FsError::TruncatedTransfer {
                expected: size,
                received: sent,
            });
        }
        writer.write_all(&buf[..n]).await?;
        sent += n as u64;
    }

    writer.flush().await?;
    Ok(())
}

/// Reads exactly `size` payload bytes from `reader` into `sink`.
pub async fn recv_payload<R, S>(reader: &mut R, sink: &mut S, size: u64) -> FsResult<u64>
where
    R: AsyncRead + Unpin,
    S: AsyncWrite + Unpin,
{
    let mut buf = vec![0u8; BUFFER_SIZE];
    let mut received = 0u64;

    while received < size {
        let want = (size - received).min(BUFFER_SIZE as u64) as usize;
        let n = reader.read(&mut buf[..want]).await?;
        if n == 0 {
            tracing::debug!("Peer closed after {} of {} payload bytes", received, size);
            return Err(FsError::TruncatedTransfer {
                expected: size,
                received,
            });
        }
        sink.write_all(&buf[..n]).await?;
        received += n as u64;
    }

    sink.flush().await?;
    Ok(received)
}

/// Like [`recv_payload`], but a failing sink does not stop the transfer.
///
/// The remaining bytes are still consumed so the stream stays on a field
/// boundary; the first sink error is returned once the payload is drained.
/// Reader failures are returned immediately.
pub async fn recv_payload_draining<R, S>(reader: &mut R, sink: &mut S, size: u64) -> FsResult<u64>
where
    R: AsyncRead + Unpin,
    S: AsyncWrite + Unpin,
{
    let mut buf = vec![0u8; BUFFER_SIZE];
    let mut received = 0u64;
    let mut sink_error: Option<std::io::Error> = None;

    while received < size {
        let want = (size - received).min(BUFFER_SIZE as u64) as usize;
        let n = reader.read(&mut buf[..want]).await?;
        if n == 0 {
            return Err(FsError::TruncatedTransfer {
                expected: size,
                received,
            });
        }
        if sink_error.is_none()
            && let Err(e) = sink.write_all(&buf[..n]).await
        {
            tracing::warn!(
                "Sink failed after {} bytes, draining remaining payload: {}",
                received,
                e
            );
            sink_error = Some(e);
        }
        received += n as u64;
    }

    if sink_error.is_none()
        && let Err(e) = sink.flush().await
    {
        sink_error = Some(e);
    }

    match sink_error {
        Some(e) => Err(FsError::Io(e)),
        None => Ok(received),
    }
}

/// Consumes and drops `size` payload bytes.
pub async fn discard_payload<R>(reader: &mut R, size: u64) -> FsResult<()>
where
    R: AsyncRead + Unpin,
{
    recv_payload(reader, &mut tokio::io::sink(), size).await?;
    Ok(())
}

/// Writes `size` followed by the bytes of `data`.
pub async fn write_sized<W>(writer: &mut W, data: &[u8]) -> FsResult<()>
where
    W: AsyncWrite + Unpin,
{
    let size = data.len() as u64;
    write_size(writer, size).await?;
    let mut source = data;
    send_payload(writer, &mut source, size).await
}

/// Reads a `size` + payload pair into memory, refusing payloads above `limit`.
pub async fn read_sized<R>(reader: &mut R, limit: u64) -> FsResult<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let size = read_size(reader).await?;
    if size > limit {
        discard_payload(reader, size).await?;
        return Err(FsError::Protocol(format!(
            "payload of {} bytes exceeds limit of {}",
            size, limit
        )));
    }

    let mut data = Vec::with_capacity(size as usize);
    recv_payload(reader, &mut data, size).await?;
    Ok(data)
}

pub async fn write_listing<W>(writer: &mut W, listing: &str) -> FsResult<()>
where
    W: AsyncWrite + Unpin,
{
    write_sized(writer, listing.as_bytes()).await
}

pub async fn read_listing<R>(reader: &mut R) -> FsResult<String>
where
    R: AsyncRead + Unpin,
{
    let data = read_sized(reader, MAX_LISTING_LEN).await?;
    String::from_utf8(data).map_err(|_| FsError::Protocol("listing is not valid UTF-8".to_string()))
}

async fn read_full<R>(reader: &mut R, buf: &mut [u8]) -> FsResult<()>
where
    R: AsyncRead + Unpin,
{
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..]).await?;
        if n == 0 {
            return Err(FsError::TruncatedTransfer {
                expected: buf.len() as u64,
                received: filled as u64,
            });
        }
        filled += n;
    }
    Ok(())
}
