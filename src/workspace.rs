use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::Path;
use tokio::fs;
use tracing::{debug, warn};

use crate::error::{Result, MediaRpcError};

/// Filesystem effects performed around an invocation plan
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Workspace: Send + Sync {
    /// Whether a caller-supplied input path exists
    fn exists(&self, path: &Path) -> bool;

    async fn create_dir_all(&self, path: &Path) -> Result<()>;

    async fn write_file(&self, path: &Path, contents: &str) -> Result<()>;

    /// Move a file, copying and deleting when a rename is not possible
    async fn relocate(&self, from: &Path, to: &Path) -> Result<()>;

    /// Remove a file; a file that is already gone is not an error
    async fn remove_file(&self, path: &Path) -> Result<()>;
}

/// Workspace on the local filesystem
#[derive(Debug, Clone, Default)]
pub struct LocalWorkspace;

impl LocalWorkspace {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Workspace for LocalWorkspace {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    async fn create_dir_all(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path).await?;
        Ok(())
    }

    async fn write_file(&self, path: &Path, contents: &str) -> Result<()> {
        fs::write(path, contents).await.map_err(|e| {
            MediaRpcError::Staging(format!("Failed to write {}: {}", path.display(), e))
        })
    }

    async fn relocate(&self, from: &Path, to: &Path) -> Result<()> {
        match fs::rename(from, to).await {
            Ok(()) => Ok(()),
            Err(e) => {
                // rename cannot cross filesystems
                debug!("Rename {} -> {} failed ({}), copying instead", from.display(), to.display(), e);
                copy_then_remove(from, to).await
            }
        }
    }

    async fn remove_file(&self, path: &Path) -> Result<()> {
        match fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Copy `from` to `to`, then remove `from`. Once the copy lands the move
/// counts as done; a leftover source is only logged.
async fn copy_then_remove(from: &Path, to: &Path) -> Result<()> {
    fs::copy(from, to).await.map_err(|e| {
        MediaRpcError::Staging(format!("Failed to move {} to {}: {}", from.display(), to.display(), e))
    })?;
    if let Err(e) = fs::remove_file(from).await {
        warn!("Copied {} but could not remove it: {}", from.display(), e);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;

    #[tokio::test]
    async fn test_relocate_moves_content() {
        let temp = assert_fs::TempDir::new().unwrap();
        let from = temp.child("clip.srt");
        from.write_str("1\n00:00:00,000 --> 00:00:01,000\nhi\n").unwrap();
        let to = temp.child("renamed.srt");

        LocalWorkspace::new().relocate(from.path(), to.path()).await.unwrap();

        assert!(!from.path().exists());
        to.assert("1\n00:00:00,000 --> 00:00:01,000\nhi\n");
    }

    #[tokio::test]
    async fn test_copy_fallback_moves_content() {
        let temp = assert_fs::TempDir::new().unwrap();
        let from = temp.child("transcript.vtt");
        from.write_str("WEBVTT\n").unwrap();
        let to = temp.child("out.vtt");

        copy_then_remove(from.path(), to.path()).await.unwrap();

        assert!(!from.path().exists());
        to.assert("WEBVTT\n");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_copy_fallback_tolerates_undeletable_source() {
        use std::os::unix::fs::PermissionsExt;

        let temp = assert_fs::TempDir::new().unwrap();
        let locked = temp.child("locked");
        locked.create_dir_all().unwrap();
        let from = locked.child("transcript.srt");
        from.write_str("1\n").unwrap();
        std::fs::set_permissions(locked.path(), std::fs::Permissions::from_mode(0o555)).unwrap();

        // privileged users can still delete; nothing to observe then
        let marker = locked.path().join(".writable");
        let privileged = std::fs::write(&marker, "").is_ok();

        let to = temp.child("out.srt");
        let result = copy_then_remove(from.path(), to.path()).await;
        std::fs::set_permissions(locked.path(), std::fs::Permissions::from_mode(0o755)).unwrap();

        assert!(result.is_ok());
        to.assert("1\n");
        if !privileged {
            assert!(from.path().exists());
        }
    }

    #[tokio::test]
    async fn test_relocate_missing_source_fails() {
        let temp = assert_fs::TempDir::new().unwrap();
        let result = LocalWorkspace::new()
            .relocate(&temp.path().join("nope.srt"), &temp.path().join("x.srt"))
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_remove_missing_file_is_ok() {
        let temp = assert_fs::TempDir::new().unwrap();
        let workspace = LocalWorkspace::new();
        workspace.remove_file(&temp.path().join("gone.log")).await.unwrap();

        let file = temp.child("present.log");
        file.touch().unwrap();
        workspace.remove_file(file.path()).await.unwrap();
        assert!(!file.path().exists());
    }

    #[tokio::test]
    async fn test_write_and_exists() {
        let temp = assert_fs::TempDir::new().unwrap();
        let workspace = LocalWorkspace::new();
        let path = temp.path().join("list.txt");
        assert!(!workspace.exists(&path));
        workspace.write_file(&path, "file 'a.mp4'\n").await.unwrap();
        assert!(workspace.exists(&path));
        temp.child("list.txt").assert("file 'a.mp4'\n");
    }
}
