//! Durable publication of the staging file to the remote store.
//!
//! The store replaces whole objects only. The first publish of a run uploads
//! directly; every later publish deletes the remote object and uploads again.
//! Between those two steps the object is briefly absent, which readers have
//! to tolerate.

use std::path::Path;
use std::sync::Arc;

use fsassert_store::{RemotePath, RemoteStore};
use tracing::debug;

use crate::error::Result;

/// Write side of the verdict file for a single remote path.
pub struct DurablePublisher {
    store: Arc<dyn RemoteStore>,
    target: RemotePath,
    written_once: bool,
}

impl DurablePublisher {
    pub fn new(store: Arc<dyn RemoteStore>, target: RemotePath) -> Self {
        Self {
            store,
            target,
            written_once: false,
        }
    }

    /// Remote path this publisher owns.
    pub fn target(&self) -> &RemotePath {
        &self.target
    }

    /// Whether at least one upload has completed.
    pub fn has_published(&self) -> bool {
        self.written_once
    }

    /// Publish `local` as the new content of the remote object.
    pub async fn publish(&mut self, local: &Path) -> Result<()> {
        if self.written_once {
            debug!(remote = %self.target, "deleting previous verdict");
            self.store.delete(&self.target).await?;
            // Object is gone; until an upload lands there is nothing to delete.
            self.written_once = false;
        }

        debug!(local = %local.display(), remote = %self.target, "uploading verdict");
        self.store.copy_from_local(local, &self.target).await?;
        self.written_once = true;
        Ok(())
    }
}
