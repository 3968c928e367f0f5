/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

use std::collections::HashMap;

use async_trait::async_trait;
use bytes::Bytes;
use forge_core::digest::BlobDigest;
use forge_core::error::Error;
use forge_core::error::Result;
use forge_core::instance::InstanceName;
use parking_lot::Mutex;

use crate::BlobAccess;

/// An in-process blob store: a locked map from (instance, digest) to bytes.
///
/// Puts are last-writer-wins; because the key is the content hash, any two
/// writers agree on the value, so the race is benign. There is no eviction.
/// Intended for tests and small caches.
#[derive(Default)]
pub struct MemoryBlobAccess {
    blobs: Mutex<HashMap<(InstanceName, BlobDigest), Bytes>>,
}

impl MemoryBlobAccess {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BlobAccess for MemoryBlobAccess {
    async fn get(&self, instance: &InstanceName, digest: &BlobDigest) -> Result<Bytes> {
        // Cloning under the lock means a reader observes the full value or
        // nothing, never a partial write.
        self.blobs
            .lock()
            .get(&(instance.clone(), *digest))
            .cloned()
            .ok_or_else(|| Error::not_found(format!("blob {} not found", digest)))
    }

    async fn put(&self, instance: &InstanceName, digest: &BlobDigest, data: Bytes) -> Result<()> {
        self.blobs
            .lock()
            .insert((instance.clone(), *digest), data);
        Ok(())
    }

    async fn find_missing(
        &self,
        instance: &InstanceName,
        digests: &[BlobDigest],
    ) -> Result<Vec<BlobDigest>> {
        let blobs = self.blobs.lock();
        Ok(digests
            .iter()
            .filter(|d| !blobs.contains_key(&(instance.clone(), **d)))
            .copied()
            .collect())
    }
}
