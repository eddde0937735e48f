//! Classification & Routing
//!
//! Maps each file reference to the node that owns it. A file's class is derived
//! from its extension; the routing table maps the class to either the gateway
//! itself (SourceCode) or one backend Store node.

pub mod table;
pub mod types;

pub use table::RoutingTable;
pub use types::{FileClass, NodeDescriptor, NodeRole, Target};
