//! Session Management
//!
//! Accepts TCP connections and runs each one as an isolated worker task.
//!
//! ## Lifecycle
//! `Accepted -> (read command -> dispatch -> respond)* -> Closed`
//!
//! What happens inside a session is up to the [`ConnectionHandler`]: the gateway
//! speaks the client command protocol, storage nodes speak the sub-protocol.
//! Sessions share nothing but the storage trees underneath them.

pub mod manager;
pub mod types;

pub use manager::{ConnectionHandler, SessionManager};
pub use types::{SessionId, SessionInfo};
