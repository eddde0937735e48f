//! Storage Node Service
//!
//! Executes file operations against one node's home directory. The same service
//! runs on each backend Store node and, for SourceCode, inside the gateway.
//!
//! ## Core Concepts
//! - **Ownership**: A node stores exactly one `FileClass`; it refuses other names.
//! - **Atomic stores**: Payloads land in a hidden sibling file and are renamed into
//!   place, so an interrupted upload leaves nothing behind.
//! - **Sub-protocol**: `UPLOAD`, `DOWNLOAD`, `DELETE`, `TAR`, `LIST` and `QUIT`
//!   words sent by the gateway over a framed TCP connection (`handlers`).
//! - **Access**: `NodeClient` is the gateway's side of that connection, with a
//!   bounded connect timeout and retries.

pub mod archive;
pub mod client;
pub mod handlers;
pub mod protocol;
pub mod service;

pub use client::{NodeClient, NodeConnection};
pub use protocol::{NodeCommand, UploadHeader};
pub use service::{StorageNode, format_listing, validate_filename};
