use crate::error::{FsError, FsResult};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;
use std::path::Path;
use std::str::FromStr;

/// Classification of a stored object, derived from its extension.
///
/// Fixed at creation: changing the class of a file means deleting it and
/// storing it again under a new name.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FileClass {
    SourceCode,
    Document,
    Text,
    Archive,
}

impl FileClass {
    /// Every class, in the order listings are concatenated.
    pub const ALL: [FileClass; 4] = [
        FileClass::SourceCode,
        FileClass::Document,
        FileClass::Text,
        FileClass::Archive,
    ];

    pub fn extension(self) -> &'static str {
        match self {
            FileClass::SourceCode => "c",
            FileClass::Document => "pdf",
            FileClass::Text => "txt",
            FileClass::Archive => "zip",
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|class| class.extension() == ext)
    }

    /// Classifies a file name or path by its final extension.
    pub fn from_filename(name: &str) -> FsResult<Self> {
        Path::new(name)
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
            .ok_or_else(|| {
                FsError::Validation(format!(
                    "'{}' is not a supported type (.c, .pdf, .txt, .zip)",
                    name
                ))
            })
    }

    /// Parses the dotted form used by archive requests (`.c`, `.pdf`, ...).
    pub fn from_type_token(token: &str) -> Option<Self> {
        token.strip_prefix('.').and_then(Self::from_extension)
    }

    pub fn type_token(self) -> String {
        format!(".{}", self.extension())
    }

    pub fn matches(self, name: &str) -> bool {
        matches!(Self::from_filename(name), Ok(class) if class == self)
    }

    /// Name under which a client saves the archive of this class.
    pub fn archive_name(self) -> &'static str {
        match self {
            FileClass::SourceCode => "cfiles.tar",
            FileClass::Document => "pdf.tar",
            FileClass::Text => "text.tar",
            FileClass::Archive => "zip.tar",
        }
    }
}

impl fmt::Display for FileClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for FileClass {
    type Err = FsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let ext = s.strip_prefix('.').unwrap_or(s);
        Self::from_extension(ext)
            .ok_or_else(|| FsError::Validation(format!("unknown file class: {}", s)))
    }
}

/// What a node is responsible for in the cluster.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum NodeRole {
    /// Front node: routes every command and stores SourceCode itself.
    Gateway,
    /// Backend node owning exactly one class.
    Store(FileClass),
}

impl NodeRole {
    pub fn owned_class(self) -> FileClass {
        match self {
            NodeRole::Gateway => FileClass::SourceCode,
            NodeRole::Store(class) => class,
        }
    }
}

impl fmt::Display for NodeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeRole::Gateway => f.write_str("gateway"),
            NodeRole::Store(class) => write!(f, "store[{}]", class),
        }
    }
}

/// Address of a backend node and the class it serves.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NodeDescriptor {
    pub class: FileClass,
    pub addr: SocketAddr,
}

/// Where an operation on a given class is executed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Local,
    Remote(NodeDescriptor),
}
