use crate::routing::FileClass;

use std::fs::File;
use std::io::{self, ErrorKind, Seek, SeekFrom};
use std::path::Path;
use walkdir::WalkDir;

/// Writes a tar of every `class` file under `root` into an anonymous temp file.
///
/// Entries are named relative to `root` and appended in file-name order. The
/// returned handle is rewound to the start. Blocking; call from
/// `spawn_blocking`.
pub fn build_archive(root: &Path, class: FileClass) -> io::Result<File> {
    if !root.is_dir() {
        return Err(io::Error::new(
            ErrorKind::NotFound,
            format!("{} is not a directory", root.display()),
        ));
    }

    let mut builder = tar::Builder::new(tempfile::tempfile()?);
    let mut count = 0usize;

    for entry in WalkDir::new(root).follow_links(false).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("Skipping unreadable entry while archiving: {}", e);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(name) = entry.file_name().to_str() else {
            continue;
        };
        if !class.matches(name) {
            continue;
        }

        let relative = entry
            .path()
            .strip_prefix(root)
            .map_err(io::Error::other)?;
        match builder.append_path_with_name(entry.path(), relative) {
            Ok(()) => count += 1,
            // Removed between the walk and the read.
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::warn!("{} vanished while archiving", entry.path().display());
            }
            Err(e) => return Err(e),
        }
    }

    let mut file = builder.into_inner()?;
    file.seek(SeekFrom::Start(0))?;

    tracing::debug!(
        "Archived {} .{} files under {}",
        count,
        class,
        root.display()
    );
    Ok(file)
}
