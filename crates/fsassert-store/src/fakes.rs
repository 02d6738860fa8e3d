//! In-memory fake for the store trait (testing only)
//!
//! `MemoryStore` satisfies the `RemoteStore` contract without touching the
//! filesystem, records every operation it serves, and can be told to fail
//! individual operation kinds.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::store_traits::*;

/// A single operation served by a [`MemoryStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOp {
    Exists(String),
    Delete(String),
    Upload(String),
    Download(String),
}

#[derive(Debug, Default)]
struct Faults {
    deletes: bool,
    uploads: bool,
    downloads: bool,
}

/// In-memory whole-object store backed by a `HashMap<path, bytes>`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: Mutex<HashMap<String, Vec<u8>>>,
    ops: Mutex<Vec<StoreOp>>,
    faults: Mutex<Faults>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place an object directly, bypassing the upload contract.
    pub fn put_object(&self, path: &str, data: impl Into<Vec<u8>>) {
        self.objects
            .lock()
            .unwrap()
            .insert(path.to_string(), data.into());
    }

    /// Current bytes stored at `path`.
    pub fn object(&self, path: &str) -> Option<Vec<u8>> {
        self.objects.lock().unwrap().get(path).cloned()
    }

    /// Every operation served so far, in order.
    pub fn operations(&self) -> Vec<StoreOp> {
        self.ops.lock().unwrap().clone()
    }

    pub fn clear_operations(&self) {
        self.ops.lock().unwrap().clear();
    }

    pub fn set_fail_deletes(&self, fail: bool) {
        self.faults.lock().unwrap().deletes = fail;
    }

    pub fn set_fail_uploads(&self, fail: bool) {
        self.faults.lock().unwrap().uploads = fail;
    }

    pub fn set_fail_downloads(&self, fail: bool) {
        self.faults.lock().unwrap().downloads = fail;
    }

    fn log(&self, op: StoreOp) {
        self.ops.lock().unwrap().push(op);
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn exists(&self, path: &RemotePath) -> StoreResult<bool> {
        self.log(StoreOp::Exists(path.to_string()));
        Ok(self.objects.lock().unwrap().contains_key(path.as_str()))
    }

    async fn delete(&self, path: &RemotePath) -> StoreResult<()> {
        self.log(StoreOp::Delete(path.to_string()));
        if self.faults.lock().unwrap().deletes {
            return Err(StoreError::Backend("injected delete failure".into()));
        }
        self.objects
            .lock()
            .unwrap()
            .remove(path.as_str())
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound {
                path: path.to_string(),
            })
    }

    async fn copy_from_local(&self, local: &Path, remote: &RemotePath) -> StoreResult<()> {
        self.log(StoreOp::Upload(remote.to_string()));
        if self.faults.lock().unwrap().uploads {
            return Err(StoreError::Backend("injected upload failure".into()));
        }
        let data = tokio::fs::read(local).await?;
        let mut objects = self.objects.lock().unwrap();
        if objects.contains_key(remote.as_str()) {
            return Err(StoreError::AlreadyExists {
                path: remote.to_string(),
            });
        }
        objects.insert(remote.to_string(), data);
        Ok(())
    }

    async fn copy_to_local(&self, remote: &RemotePath, local: &Path) -> StoreResult<()> {
        self.log(StoreOp::Download(remote.to_string()));
        if self.faults.lock().unwrap().downloads {
            return Err(StoreError::Backend("injected download failure".into()));
        }
        let data = self
            .objects
            .lock()
            .unwrap()
            .get(remote.as_str())
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                path: remote.to_string(),
            })?;
        tokio::fs::write(local, data).await?;
        Ok(())
    }
}
