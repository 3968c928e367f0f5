/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

use std::num::NonZeroUsize;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use forge_core::digest::ActionDigest;
use forge_core::digest::CommandDigest;
use forge_core::digest::DirectoryDigest;
use forge_core::digest::FileDigest;
use forge_core::digest::TreeDigest;
use forge_core::error::Result;
use forge_core::instance::InstanceName;
use forge_proto::build::bazel::remote::execution::v2::Action;
use forge_proto::build::bazel::remote::execution::v2::Command;
use forge_proto::build::bazel::remote::execution::v2::Directory;
use forge_proto::build::bazel::remote::execution::v2::Tree;
use lru::LruCache;
use parking_lot::Mutex;

use crate::ContentAddressableStorage;

/// A decorator that keeps recently used, already-deserialized `Directory`
/// messages in memory.
///
/// Input trees revisit the same directories constantly; what this cache
/// amortizes is the fetch and decode, not memory, which is why capacity is
/// a message count rather than bytes. Entries are immutable and keyed by
/// content digest, so staleness is impossible. Eviction is strict LRU, and
/// a hit counts as a use.
pub struct DirectoryCachingContentAddressableStorage {
    inner: Arc<dyn ContentAddressableStorage>,
    cache: Mutex<LruCache<DirectoryDigest, Directory>>,
}

impl DirectoryCachingContentAddressableStorage {
    pub fn new(inner: Arc<dyn ContentAddressableStorage>, capacity: NonZeroUsize) -> Self {
        Self {
            inner,
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }
}

#[async_trait]
impl ContentAddressableStorage for DirectoryCachingContentAddressableStorage {
    async fn get_action(&self, instance: &InstanceName, digest: &ActionDigest) -> Result<Action> {
        self.inner.get_action(instance, digest).await
    }

    async fn get_command(
        &self,
        instance: &InstanceName,
        digest: &CommandDigest,
    ) -> Result<Command> {
        self.inner.get_command(instance, digest).await
    }

    async fn get_directory(
        &self,
        instance: &InstanceName,
        digest: &DirectoryDigest,
    ) -> Result<Directory> {
        if let Some(directory) = self.cache.lock().get(digest) {
            return Ok(directory.clone());
        }
        let directory = self.inner.get_directory(instance, digest).await?;
        self.cache.lock().put(*digest, directory.clone());
        Ok(directory)
    }

    async fn get_file(
        &self,
        instance: &InstanceName,
        digest: &FileDigest,
        path: &Path,
        is_executable: bool,
    ) -> Result<()> {
        self.inner
            .get_file(instance, digest, path, is_executable)
            .await
    }

    async fn put_file(
        &self,
        instance: &InstanceName,
        path: &Path,
    ) -> Result<(FileDigest, bool)> {
        self.inner.put_file(instance, path).await
    }

    async fn put_tree(&self, instance: &InstanceName, tree: &Tree) -> Result<TreeDigest> {
        self.inner.put_tree(instance, tree).await
    }
}
