use super::archive;
use crate::error::{FsError, FsResult};
use crate::framing::{discard_payload, recv_payload_draining};
use crate::paths::{PathResolver, ensure_parent_dirs};
use crate::routing::{FileClass, NodeRole};

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::AsyncRead;

/// Local file operations of one node, confined to its home directory.
///
/// The gateway embeds one of these for SourceCode; each backend Store node
/// runs one for its own class.
#[derive(Debug, Clone)]
pub struct StorageNode {
    role: NodeRole,
    resolver: PathResolver,
}

impl StorageNode {
    pub fn new(role: NodeRole, resolver: PathResolver) -> Self {
        Self { role, resolver }
    }

    /// Creates the home directory if it does not exist yet.
    pub async fn init(&self) -> FsResult<()> {
        tokio::fs::create_dir_all(self.resolver.home()).await?;
        tracing::info!(
            "{} storing .{} files under {}",
            self.role,
            self.class(),
            self.resolver.home().display()
        );
        Ok(())
    }

    pub fn class(&self) -> FileClass {
        self.role.owned_class()
    }

    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    /// Physical path a `filename` stored under directory `dir` would take.
    pub fn target_path(&self, dir: &str, filename: &str) -> FsResult<PathBuf> {
        validate_filename(filename)?;
        if !self.class().matches(filename) {
            return Err(FsError::Validation(format!(
                "{} does not store '{}'",
                self.role, filename
            )));
        }
        Ok(self.resolver.resolve_within(dir)?.join(filename))
    }

    /// Writes the next `size` bytes of `source` to `<dir>/<filename>`.
    ///
    /// The payload is staged in a hidden sibling file and renamed into place,
    /// so a failed or truncated transfer never leaves a partial file behind.
    /// The payload is always consumed in full unless the source itself fails.
    pub async fn store<R>(
        &self,
        dir: &str,
        filename: &str,
        size: u64,
        source: &mut R,
    ) -> FsResult<PathBuf>
    where
        R: AsyncRead + Unpin,
    {
        let (target, staged) = match self.prepare_store(dir, filename).await {
            Ok(prepared) => prepared,
            Err(e) => {
                discard_payload(source, size).await?;
                return Err(e);
            }
        };

        let (file, temp_path) = staged.into_parts();
        let mut file = File::from_std(file);
        // On error the temp path is dropped here and the staging file removed.
        recv_payload_draining(source, &mut file, size).await?;
        drop(file);

        temp_path.persist(&target).map_err(|e| FsError::Io(e.error))?;

        tracing::debug!("Stored {} ({} bytes)", target.display(), size);
        Ok(target)
    }

    async fn prepare_store(
        &self,
        dir: &str,
        filename: &str,
    ) -> FsResult<(PathBuf, tempfile::NamedTempFile)> {
        let target = self.target_path(dir, filename)?;
        ensure_parent_dirs(&target).await?;

        let parent = target
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.resolver.home().to_path_buf());
        let staged = tempfile::Builder::new()
            .prefix(".incoming-")
            .tempfile_in(&parent)?;

        Ok((target, staged))
    }

    /// Opens a stored file for streaming. Returns the handle and its length.
    pub async fn open(&self, path: &str) -> FsResult<(File, u64)> {
        let physical = self.resolver.resolve_within(path)?;
        let file = File::open(&physical)
            .await
            .map_err(|e| not_found_or_io(e, path))?;

        let meta = file.metadata().await?;
        if !meta.is_file() {
            return Err(FsError::NotFound(path.to_string()));
        }
        Ok((file, meta.len()))
    }

    pub async fn delete(&self, path: &str) -> FsResult<()> {
        let physical = self.resolver.resolve_within(path)?;
        tokio::fs::remove_file(&physical)
            .await
            .map_err(|e| not_found_or_io(e, path))?;

        tracing::debug!("Removed {}", physical.display());
        Ok(())
    }

    /// Builds a tar of every file of this node's class under its home.
    ///
    /// The archive is written to an anonymous temporary file first so its
    /// exact size is known before anything goes on the wire.
    pub async fn archive(&self) -> FsResult<(File, u64)> {
        let home = self.resolver.home().to_path_buf();
        let class = self.class();

        let file = tokio::task::spawn_blocking(move || archive::build_archive(&home, class))
            .await
            .map_err(|e| {
                FsError::Io(std::io::Error::other(format!("archive task failed: {}", e)))
            })??;

        let len = file.metadata()?.len();
        Ok((File::from_std(file), len))
    }

    /// Names of the regular files of this node's class directly inside `path`, sorted.
    pub async fn list(&self, path: &str) -> FsResult<Vec<String>> {
        let dir = self.resolver.resolve_within(path)?;
        let mut entries = tokio::fs::read_dir(&dir)
            .await
            .map_err(|e| not_found_or_io(e, path))?;

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            if self.class().matches(&name) {
                names.push(name);
            }
        }

        names.sort();
        Ok(names)
    }
}

/// One name per line, each terminated by `\n`.
pub fn format_listing(names: &[String]) -> String {
    names.iter().map(|name| format!("{}\n", name)).collect()
}

/// A stored name must be a single path component.
pub fn validate_filename(filename: &str) -> FsResult<()> {
    if filename.is_empty()
        || filename == "."
        || filename == ".."
        || filename.contains(['/', '\\', '\0'])
    {
        return Err(FsError::Protocol(format!(
            "invalid file name {:?}",
            filename
        )));
    }
    Ok(())
}

fn not_found_or_io(e: std::io::Error, path: &str) -> FsError {
    if e.kind() == ErrorKind::NotFound {
        FsError::NotFound(path.to_string())
    } else {
        FsError::Io(e)
    }
}
