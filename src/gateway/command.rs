use crate::error::{FsError, FsResult};
use crate::paths::strip_root;
use crate::routing::FileClass;

use std::fmt;

// --- Client Command Words ---

pub const CMD_UPLOAD: &str = "uploadf";
pub const CMD_DOWNLOAD: &str = "downlf";
pub const CMD_REMOVE: &str = "removef";
pub const CMD_ARCHIVE: &str = "downltar";
pub const CMD_LIST: &str = "dispfnames";
pub const CMD_QUIT: &str = "quit";

pub const MAX_UPLOAD_FILES: usize = 3;
pub const MAX_TRANSFER_PATHS: usize = 2;

/// A parsed and validated client command.
///
/// Both the CLI and the gateway build these from the same command line, so a
/// command the CLI accepts is never refused by the gateway for its syntax.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandRequest {
    /// `uploadf f1 [f2 [f3]] dest`
    Upload {
        files: Vec<String>,
        destination: String,
    },
    /// `downlf p1 [p2]`
    Download { paths: Vec<String> },
    /// `removef p1 [p2]`
    Remove { paths: Vec<String> },
    /// `downltar .c|.pdf|.txt`
    Archive { class: FileClass },
    /// `dispfnames path`
    List { path: String },
    Quit,
}

impl CommandRequest {
    /// Parses one command line; `token` is the namespace root (`~S1`).
    pub fn parse(line: &str, token: &str) -> FsResult<Self> {
        let mut words = line.split_whitespace();
        let Some(name) = words.next() else {
            return Err(FsError::Protocol("empty command".to_string()));
        };
        let args: Vec<&str> = words.collect();

        match name {
            CMD_UPLOAD => parse_upload(&args, token),
            CMD_DOWNLOAD => Ok(CommandRequest::Download {
                paths: parse_paths(CMD_DOWNLOAD, &args)?,
            }),
            CMD_REMOVE => Ok(CommandRequest::Remove {
                paths: parse_paths(CMD_REMOVE, &args)?,
            }),
            CMD_ARCHIVE => parse_archive(&args),
            CMD_LIST => match args.as_slice() {
                [path] => Ok(CommandRequest::List {
                    path: rooted(CMD_LIST, path, token)?,
                }),
                _ => Err(FsError::Validation(format!(
                    "{} requires 1 argument (pathname)",
                    CMD_LIST
                ))),
            },
            CMD_QUIT if args.is_empty() => Ok(CommandRequest::Quit),
            CMD_QUIT => Err(FsError::Validation(format!("{} takes no arguments", CMD_QUIT))),
            other => Err(FsError::UnknownCommand(other.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            CommandRequest::Upload { .. } => CMD_UPLOAD,
            CommandRequest::Download { .. } => CMD_DOWNLOAD,
            CommandRequest::Remove { .. } => CMD_REMOVE,
            CommandRequest::Archive { .. } => CMD_ARCHIVE,
            CommandRequest::List { .. } => CMD_LIST,
            CommandRequest::Quit => CMD_QUIT,
        }
    }
}

/// Canonical command line, as sent on the wire.
impl fmt::Display for CommandRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())?;
        match self {
            CommandRequest::Upload { files, destination } => {
                for file in files {
                    write!(f, " {}", file)?;
                }
                write!(f, " {}", destination)
            }
            CommandRequest::Download { paths } | CommandRequest::Remove { paths } => {
                for path in paths {
                    write!(f, " {}", path)?;
                }
                Ok(())
            }
            CommandRequest::Archive { class } => write!(f, " {}", class.type_token()),
            CommandRequest::List { path } => write!(f, " {}", path),
            CommandRequest::Quit => Ok(()),
        }
    }
}

fn parse_upload(args: &[&str], token: &str) -> FsResult<CommandRequest> {
    let Some((destination, files)) = args.split_last() else {
        return Err(upload_arity());
    };
    if files.is_empty() || files.len() > MAX_UPLOAD_FILES {
        return Err(upload_arity());
    }

    for file in files {
        FileClass::from_filename(file)?;
    }

    Ok(CommandRequest::Upload {
        files: files.iter().map(|f| f.to_string()).collect(),
        destination: rooted(CMD_UPLOAD, destination, token)?,
    })
}

fn upload_arity() -> FsError {
    FsError::Validation(format!(
        "{} requires 2-{} arguments (1-{} filenames + destination_path)",
        CMD_UPLOAD,
        MAX_UPLOAD_FILES + 1,
        MAX_UPLOAD_FILES
    ))
}

fn parse_paths(command: &str, args: &[&str]) -> FsResult<Vec<String>> {
    if args.is_empty() || args.len() > MAX_TRANSFER_PATHS {
        return Err(FsError::Validation(format!(
            "{} requires 1-{} arguments (filenames)",
            command, MAX_TRANSFER_PATHS
        )));
    }

    for path in args {
        FileClass::from_filename(path)?;
    }
    Ok(args.iter().map(|p| p.to_string()).collect())
}

fn parse_archive(args: &[&str]) -> FsResult<CommandRequest> {
    let [token] = args else {
        return Err(FsError::Validation(format!(
            "{} requires 1 argument (filetype)",
            CMD_ARCHIVE
        )));
    };

    match FileClass::from_type_token(token) {
        Some(FileClass::Archive) | None => Err(FsError::Validation(format!(
            "{} only supports .c, .pdf, and .txt filetypes",
            CMD_ARCHIVE
        ))),
        Some(class) => Ok(CommandRequest::Archive { class }),
    }
}

fn rooted(command: &str, path: &str, token: &str) -> FsResult<String> {
    if strip_root(path, token).is_none() {
        return Err(FsError::Validation(format!(
            "{} pathname must start with {}",
            command, token
        )));
    }
    Ok(path.to_string())
}
