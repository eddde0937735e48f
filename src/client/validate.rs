use crate::error::{FsError, FsResult};
use crate::gateway::CommandRequest;

use std::path::Path;

/// Parses a command line the way the gateway will, plus the checks only the
/// client can make (local files must exist for `uploadf`).
pub fn validate_command(line: &str, token: &str) -> FsResult<CommandRequest> {
    let request = CommandRequest::parse(line, token)?;
    check_local_files(&request)?;
    Ok(request)
}

/// Ensures a request built in code survives the trip through a command line.
///
/// Arguments containing whitespace would be split apart by the gateway, so
/// the canonical line must parse back to the same request.
pub fn validate_request(request: &CommandRequest, token: &str) -> FsResult<()> {
    let line = request.to_string();
    let reparsed = CommandRequest::parse(&line, token)?;
    if &reparsed != request {
        return Err(FsError::Validation(format!(
            "arguments of {:?} must not contain whitespace",
            line
        )));
    }
    check_local_files(request)
}

fn check_local_files(request: &CommandRequest) -> FsResult<()> {
    if let CommandRequest::Upload { files, .. } = request {
        for file in files {
            if !Path::new(file).is_file() {
                return Err(FsError::Validation(format!(
                    "File '{}' does not exist in current directory",
                    file
                )));
            }
        }
    }
    Ok(())
}
