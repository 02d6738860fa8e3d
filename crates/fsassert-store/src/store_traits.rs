//! Storage trait definitions for fsassert
//!
//! `RemoteStore` is the only surface the recorder and the reader use to reach
//! the durable store. Implementations are assumed to support whole-object
//! replacement only: uploading onto an existing object is an error, so
//! callers that republish must delete first.

use std::path::Path;

use async_trait::async_trait;

use crate::error::StoreError;

/// Result type for store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Store-addressable handle for a remote path.
///
/// The inner field is private so a handle can only come from
/// [`RemotePath::parse`] or a store's `resolve_path`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RemotePath(String);

impl RemotePath {
    /// Validate a raw path string.
    ///
    /// Rejects blank paths, paths ending in `/` and paths containing a `..`
    /// component.
    pub fn parse(path: &str) -> StoreResult<Self> {
        let invalid = |reason: &str| StoreError::InvalidPath {
            path: path.to_string(),
            reason: reason.to_string(),
        };

        if path.trim().is_empty() {
            return Err(invalid("path is blank"));
        }
        if path.ends_with('/') {
            return Err(invalid("path names a directory"));
        }
        if path.split('/').any(|component| component == "..") {
            return Err(invalid("path escapes its root"));
        }
        Ok(RemotePath(path.to_string()))
    }

    /// Return the path string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RemotePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Whole-object remote store.
///
/// Guarantees:
/// - `copy_from_local` fails with `StoreError::AlreadyExists` when the target
///   object is present.
/// - `copy_to_local` returns `StoreError::NotFound` when the object is absent.
/// - `delete` of an absent object returns `StoreError::NotFound`.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Turn a path string into a handle addressable by this store.
    fn resolve_path(&self, path: &str) -> StoreResult<RemotePath> {
        RemotePath::parse(path)
    }

    /// Check whether an object exists at `path`.
    async fn exists(&self, path: &RemotePath) -> StoreResult<bool>;

    /// Delete the object at `path`.
    async fn delete(&self, path: &RemotePath) -> StoreResult<()>;

    /// Upload the local file as a new object at `remote`.
    async fn copy_from_local(&self, local: &Path, remote: &RemotePath) -> StoreResult<()>;

    /// Download the object at `remote` into the local file, replacing it.
    async fn copy_to_local(&self, remote: &RemotePath, local: &Path) -> StoreResult<()>;
}
