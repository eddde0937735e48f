//! Gateway Node
//!
//! The single entry point for clients. Parses and validates each command line,
//! answers with an acceptance status, then routes the work by file class and
//! aggregates the results back into one client-facing response.
//!
//! ## Client Exchanges (after `OK`)
//! - `uploadf`: per file, client sends size + payload, gateway acks; then `UPLOAD_COMPLETE`.
//! - `downlf`: per path, status [+ size + payload]; then `DOWNLOAD_COMPLETE`.
//! - `removef`: per path, status; then `DELETE_COMPLETE`.
//! - `downltar`: status [+ size + payload]; then `TAR_COMPLETE`.
//! - `dispfnames`: size + listing (SourceCode, Document, Text, Archive order).

pub mod command;
pub mod dispatcher;
pub mod handlers;

pub use command::CommandRequest;
pub use dispatcher::{DELETE_COMPLETE, DOWNLOAD_COMPLETE, Gateway, TAR_COMPLETE, UPLOAD_COMPLETE};

#[cfg(test)]
mod tests;
