use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::StoreError;
use crate::store_traits::{RemotePath, RemoteStore, StoreResult};

/// Remote store backed by a directory on the local filesystem.
///
/// Layout: `<root>/<remote path without leading slash>`. A root of `/` makes
/// remote paths coincide with local absolute paths.
#[derive(Debug, Clone)]
pub struct LocalFileStore {
    root: PathBuf,
}

impl LocalFileStore {
    /// Create a store rooted at `root`. Creates the directory if needed.
    pub fn new(root: impl AsRef<Path>) -> StoreResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Directory every remote path is resolved under.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_path(&self, path: &RemotePath) -> PathBuf {
        self.root.join(path.as_str().trim_start_matches('/'))
    }
}

fn not_found_or_io(path: &RemotePath, err: io::Error) -> StoreError {
    if err.kind() == io::ErrorKind::NotFound {
        StoreError::NotFound {
            path: path.to_string(),
        }
    } else {
        StoreError::Io(err)
    }
}

#[async_trait]
impl RemoteStore for LocalFileStore {
    async fn exists(&self, path: &RemotePath) -> StoreResult<bool> {
        match tokio::fs::metadata(self.object_path(path)).await {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    async fn delete(&self, path: &RemotePath) -> StoreResult<()> {
        let object = self.object_path(path);
        debug!(object = %object.display(), "deleting object");
        tokio::fs::remove_file(&object)
            .await
            .map_err(|e| not_found_or_io(path, e))
    }

    async fn copy_from_local(&self, local: &Path, remote: &RemotePath) -> StoreResult<()> {
        let target = self.object_path(remote);
        let local = local.to_path_buf();
        let remote = remote.clone();
        debug!(local = %local.display(), object = %target.display(), "uploading object");

        tokio::task::spawn_blocking(move || -> StoreResult<()> {
            let dir = target
                .parent()
                .ok_or_else(|| StoreError::InvalidPath {
                    path: remote.to_string(),
                    reason: "path has no parent directory".to_string(),
                })?
                .to_path_buf();
            fs::create_dir_all(&dir)?;

            // Stage next to the target so the final step is a rename that
            // refuses to clobber an existing object.
            let mut src = fs::File::open(&local)?;
            let mut tmp = NamedTempFile::new_in(&dir)?;
            io::copy(&mut src, tmp.as_file_mut())?;
            tmp.as_file().sync_all()?;
            tmp.persist_noclobber(&target).map_err(|e| {
                if e.error.kind() == io::ErrorKind::AlreadyExists {
                    StoreError::AlreadyExists {
                        path: remote.to_string(),
                    }
                } else {
                    StoreError::Io(e.error)
                }
            })?;
            Ok(())
        })
        .await
        .map_err(|e| StoreError::Backend(format!("upload task failed: {e}")))?
    }

    async fn copy_to_local(&self, remote: &RemotePath, local: &Path) -> StoreResult<()> {
        let object = self.object_path(remote);
        debug!(object = %object.display(), local = %local.display(), "downloading object");
        tokio::fs::copy(&object, local)
            .await
            .map(|_| ())
            .map_err(|e| not_found_or_io(remote, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_store() -> (tempfile::TempDir, LocalFileStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalFileStore::new(dir.path()).unwrap();
        (dir, store)
    }

    fn write_local(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    #[tokio::test]
    async fn upload_then_download() {
        let (dir, store) = make_store();
        let local = write_local(dir.path(), "staging.json", "{\"a\":1}");
        let remote = store.resolve_path("/tmp/verdict.json").unwrap();

        store.copy_from_local(&local, &remote).await.unwrap();
        assert!(store.exists(&remote).await.unwrap());
        assert!(dir.path().join("tmp/verdict.json").is_file());

        let out = dir.path().join("out.json");
        store.copy_to_local(&remote, &out).await.unwrap();
        assert_eq!(fs::read_to_string(out).unwrap(), "{\"a\":1}");
    }

    #[tokio::test]
    async fn upload_onto_existing_object_fails() {
        let (dir, store) = make_store();
        let local = write_local(dir.path(), "staging.json", "one");
        let remote = store.resolve_path("verdict.json").unwrap();

        store.copy_from_local(&local, &remote).await.unwrap();
        let err = store.copy_from_local(&local, &remote).await.unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists { .. }));
    }

    #[tokio::test]
    async fn delete_then_upload_replaces_content() {
        let (dir, store) = make_store();
        let remote = store.resolve_path("verdict.json").unwrap();

        let first = write_local(dir.path(), "first.json", "first");
        store.copy_from_local(&first, &remote).await.unwrap();
        store.delete(&remote).await.unwrap();
        assert!(!store.exists(&remote).await.unwrap());

        let second = write_local(dir.path(), "second.json", "second");
        store.copy_from_local(&second, &remote).await.unwrap();

        let out = dir.path().join("out.json");
        store.copy_to_local(&remote, &out).await.unwrap();
        assert_eq!(fs::read_to_string(out).unwrap(), "second");
    }

    #[tokio::test]
    async fn missing_object_reports_not_found() {
        let (dir, store) = make_store();
        let remote = store.resolve_path("/nowhere/verdict.json").unwrap();

        assert!(!store.exists(&remote).await.unwrap());

        let err = store.delete(&remote).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));

        let err = store
            .copy_to_local(&remote, &dir.path().join("out.json"))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn directory_is_not_an_object() {
        let (dir, store) = make_store();
        fs::create_dir_all(dir.path().join("tmp/sub")).unwrap();
        let remote = store.resolve_path("/tmp/sub").unwrap();
        assert!(!store.exists(&remote).await.unwrap());
    }
}
