//! Framing Layer
//!
//! Every message exchanged between a client, the gateway and the storage nodes is a
//! sequence of self-delimited fields. A reader reconstructs exact field boundaries no
//! matter how the transport fragments or coalesces bytes.
//!
//! ## Field Encodings
//! - **text**: `u32` big-endian byte length followed by UTF-8 bytes (bounded by [`MAX_TEXT_LEN`]).
//! - **size**: `u64` big-endian byte count announcing a payload.
//! - **payload**: exactly `size` raw bytes, moved in [`BUFFER_SIZE`] chunks.
//! - **status**: a text field holding `OK` or `ERROR:<reason>`.
//!
//! A peer closing the stream before a payload is complete surfaces as
//! [`FsError::TruncatedTransfer`](crate::error::FsError::TruncatedTransfer).

pub mod codec;
pub mod status;

pub use codec::*;
pub use status::{Status, read_status, write_status};

/// Chunk size used when moving payload bytes.
pub const BUFFER_SIZE: usize = 1024;

/// Upper bound for a single text field (command lines, paths, filenames).
pub const MAX_TEXT_LEN: usize = 4096;

/// Upper bound for a directory listing transferred as a payload.
pub const MAX_LISTING_LEN: u64 = 16 * 1024 * 1024;
