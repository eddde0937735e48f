//! Path Resolver
//!
//! Clients address files through *virtual paths* rooted at a symbolic token
//! (`~S1`, "the gateway's home area"). Each node translates a virtual path against its
//! own home directory before touching the filesystem, so the same virtual path lands
//! in a different physical tree on every node.

pub mod resolver;

pub use resolver::{PathResolver, ROOT_TOKEN, ensure_parent_dirs, resolve, strip_root};
