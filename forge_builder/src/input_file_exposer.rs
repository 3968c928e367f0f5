/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use forge_blobstore::BlobAccess;
use forge_cas::ContentAddressableStorage;
use forge_core::digest::FileDigest;
use forge_core::error::Result;
use forge_core::instance::InstanceName;
use tokio::io::AsyncWriteExt;

/// Strategy for placing one CAS file at a filesystem path with the right
/// mode, separated out of the input-tree traversal so the materialization
/// mechanism can be swapped: streamed copies for plain stores, hardlinks
/// for a pooled one.
#[async_trait]
pub trait InputFileExposer: Send + Sync + 'static {
    /// Materializes the blob at `path` with mode 0555 (executable) or
    /// 0444. `path` must not exist yet; create-exclusive semantics
    /// guarantee nothing is clobbered within one execution.
    async fn expose(
        &self,
        instance: &InstanceName,
        digest: &FileDigest,
        path: &Path,
        is_executable: bool,
    ) -> Result<()>;
}

/// The default strategy: open create-exclusive and stream the bytes out of
/// a blob store.
pub struct BlobAccessInputFileExposer {
    blob_access: Arc<dyn BlobAccess>,
}

impl BlobAccessInputFileExposer {
    pub fn new(blob_access: Arc<dyn BlobAccess>) -> Self {
        Self { blob_access }
    }
}

#[async_trait]
impl InputFileExposer for BlobAccessInputFileExposer {
    async fn expose(
        &self,
        instance: &InstanceName,
        digest: &FileDigest,
        path: &Path,
        is_executable: bool,
    ) -> Result<()> {
        let data = self.blob_access.get(instance, &digest.coerce()).await?;

        let mode = if is_executable { 0o555 } else { 0o444 };
        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .mode(mode)
            .open(path)
            .await?;

        if let Err(e) = file.write_all(&data).await.and(file.flush().await) {
            drop(file);
            let _ = tokio::fs::remove_file(path).await;
            return Err(e.into());
        }
        Ok(())
    }
}

/// Adapts a typed CAS to the exposer seam. Wiring the hardlinking store in
/// here is what turns input staging into hardlinks from the pool.
pub struct CasInputFileExposer {
    storage: Arc<dyn ContentAddressableStorage>,
}

impl CasInputFileExposer {
    pub fn new(storage: Arc<dyn ContentAddressableStorage>) -> Self {
        Self { storage }
    }
}

#[async_trait]
impl InputFileExposer for CasInputFileExposer {
    async fn expose(
        &self,
        instance: &InstanceName,
        digest: &FileDigest,
        path: &Path,
        is_executable: bool,
    ) -> Result<()> {
        self.storage
            .get_file(instance, digest, path, is_executable)
            .await
    }
}
