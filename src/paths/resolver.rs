use crate::error::{FsError, FsResult};

use std::path::{Component, Path, PathBuf};

/// Default symbolic root of the client-visible namespace.
pub const ROOT_TOKEN: &str = "~S1";

/// Returns the remainder of `path` after the root token, without leading
/// separators, or `None` when the path is not rooted at `token`.
pub fn strip_root<'a>(path: &'a str, token: &str) -> Option<&'a str> {
    let rest = path.strip_prefix(token)?;
    if rest.is_empty() {
        return Some(rest);
    }
    if rest.starts_with('/') {
        Some(rest.trim_start_matches('/'))
    } else {
        None
    }
}

/// Replaces the root token with `home`. Paths without the token are returned
/// unchanged.
pub fn resolve(virtual_path: &str, home: &Path, token: &str) -> PathBuf {
    match strip_root(virtual_path, token) {
        Some("") => home.to_path_buf(),
        Some(rest) => home.join(rest),
        None => PathBuf::from(virtual_path),
    }
}

/// Creates every missing ancestor directory of `path`.
pub async fn ensure_parent_dirs(path: &Path) -> FsResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent).await?;
    }
    Ok(())
}

/// A node's view of the namespace: its home directory plus the root token.
#[derive(Debug, Clone)]
pub struct PathResolver {
    home: PathBuf,
    token: String,
}

impl PathResolver {
    pub fn new(home: impl Into<PathBuf>, token: impl Into<String>) -> Self {
        Self {
            home: home.into(),
            token: token.into(),
        }
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn resolve(&self, virtual_path: &str) -> PathBuf {
        resolve(virtual_path, &self.home, &self.token)
    }

    /// Resolves and refuses anything that would land outside the home directory.
    pub fn resolve_within(&self, virtual_path: &str) -> FsResult<PathBuf> {
        if Path::new(virtual_path)
            .components()
            .any(|c| matches!(c, Component::ParentDir))
        {
            return Err(FsError::Validation(format!(
                "parent directory references are not allowed: {}",
                virtual_path
            )));
        }

        let physical = self.resolve(virtual_path);
        if !physical.starts_with(&self.home) {
            return Err(FsError::Validation(format!(
                "{} is outside the node home directory",
                virtual_path
            )));
        }

        Ok(physical)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_replaces_token() {
        let home = Path::new("/home/alice/S1");

        assert_eq!(
            resolve("~S1/projects/a.c", home, ROOT_TOKEN),
            PathBuf::from("/home/alice/S1/projects/a.c")
        );
        assert_eq!(resolve("~S1", home, ROOT_TOKEN), home.to_path_buf());
        assert_eq!(resolve("~S1/", home, ROOT_TOKEN), home.to_path_buf());
    }

    #[test]
    fn test_resolve_leaves_unrooted_paths_alone() {
        let home = Path::new("/home/alice/S1");

        assert_eq!(
            resolve("/var/data/a.c", home, ROOT_TOKEN),
            PathBuf::from("/var/data/a.c")
        );
        // The token must be a whole leading component.
        assert_eq!(
            resolve("~S10/a.c", home, ROOT_TOKEN),
            PathBuf::from("~S10/a.c")
        );
    }

    #[test]
    fn test_resolve_is_pure() {
        let home = Path::new("/srv/S3");
        let first = resolve("~S1/docs/notes.txt", home, ROOT_TOKEN);
        let second = resolve("~S1/docs/notes.txt", home, ROOT_TOKEN);
        assert_eq!(first, second);
    }

    #[test]
    fn test_same_virtual_path_differs_per_node() {
        let gateway = PathResolver::new("/srv/S1", ROOT_TOKEN);
        let text_node = PathResolver::new("/srv/S3", ROOT_TOKEN);

        let a = gateway.resolve("~S1/docs/notes.txt");
        let b = text_node.resolve("~S1/docs/notes.txt");

        assert_ne!(a, b);
        assert!(a.ends_with("docs/notes.txt"));
        assert!(b.ends_with("docs/notes.txt"));
    }

    #[test]
    fn test_resolve_within_rejects_escapes() {
        let resolver = PathResolver::new("/srv/S2", ROOT_TOKEN);

        assert!(resolver.resolve_within("~S1/reports/q1.pdf").is_ok());
        assert!(resolver.resolve_within("/srv/S2/reports/q1.pdf").is_ok());
        assert!(matches!(
            resolver.resolve_within("~S1/../etc/passwd"),
            Err(FsError::Validation(_))
        ));
        assert!(matches!(
            resolver.resolve_within("/etc/passwd"),
            Err(FsError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_ensure_parent_dirs_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("a/b/c/file.c");

        ensure_parent_dirs(&target).await.unwrap();
        ensure_parent_dirs(&target).await.unwrap();

        assert!(dir.path().join("a/b/c").is_dir());
        assert!(!target.exists());
    }
}
