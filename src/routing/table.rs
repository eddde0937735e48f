use super::types::{FileClass, NodeDescriptor, Target};

use std::collections::BTreeMap;
use std::net::SocketAddr;

/// Declarative FileClass -> node mapping consulted for every routed file.
///
/// SourceCode is always served by the gateway itself; every other class has
/// exactly one backend node.
#[derive(Debug, Clone)]
pub struct RoutingTable {
    remotes: BTreeMap<FileClass, NodeDescriptor>,
}

impl RoutingTable {
    pub fn new(document: SocketAddr, text: SocketAddr, archive: SocketAddr) -> Self {
        let mut remotes = BTreeMap::new();
        for (class, addr) in [
            (FileClass::Document, document),
            (FileClass::Text, text),
            (FileClass::Archive, archive),
        ] {
            remotes.insert(class, NodeDescriptor { class, addr });
        }
        Self { remotes }
    }

    pub fn target(&self, class: FileClass) -> Target {
        match self.remotes.get(&class) {
            Some(node) => Target::Remote(node.clone()),
            None => Target::Local,
        }
    }

    /// Backend nodes in listing order: Document, Text, Archive.
    pub fn remote_nodes(&self) -> Vec<NodeDescriptor> {
        // BTreeMap iterates in FileClass declaration order.
        self.remotes.values().cloned().collect()
    }
}
