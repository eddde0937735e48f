//! Distributed File Store Library
//!
//! This library crate defines the core modules of the distributed file store. It
//! serves as the foundation for the node binary (`main.rs`) and the `dfs-client`
//! command-line front end.
//!
//! ## Architecture Modules
//! A gateway accepts client sessions and routes each file by its type to one of
//! three backend Store nodes, keeping `.c` files itself:
//!
//! - **`framing`**: Self-delimited text / size / payload / status fields over a byte
//!   stream. Every other module speaks through it.
//! - **`paths`**: Translates client-visible paths rooted at `~S1` into each node's
//!   own home directory.
//! - **`routing`**: File classification by extension and the class -> node table.
//! - **`storage`**: The Store node service (store, fetch, delete, archive, list), its
//!   sub-protocol, and the gateway-side client for it.
//! - **`gateway`**: Command parsing and the dispatcher that proxies, stages and
//!   aggregates results across nodes.
//! - **`session`**: Accept loop running one supervised task per connection.
//! - **`client`**: Client side of the gateway protocol.
//! - **`config`**: Cluster addresses, home directories and peer options.

pub mod client;
pub mod config;
pub mod error;
pub mod framing;
pub mod gateway;
pub mod paths;
pub mod routing;
pub mod session;
pub mod storage;

#[cfg(test)]
pub(crate) mod testing;
