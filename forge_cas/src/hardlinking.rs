/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

use std::os::unix::fs::MetadataExt;
use std::path::Path;
use std::path::PathBuf;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
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

#[derive(Clone, PartialEq, Eq, Hash)]
struct PoolKey {
    digest: FileDigest,
    executable: bool,
}

struct PoolState {
    /// Value is the entry's size in bytes. Unbounded because eviction is
    /// driven by the (count, bytes) budget below, not by the map itself.
    entries: LruCache<PoolKey, u64>,
    total_size_bytes: u64,
}

/// A file-materialization accelerator.
///
/// Files fetched through `get_file` land once in a pool directory, named by
/// their digest, and are materialized into staging paths by hardlink.
/// Content is immutable by digest, so every link is as good as a copy. Mode
/// bits live on the inode, not the link, so a digest wanted both ways gets
/// two pool entries: `<hex>` (0444) and `<hex>+x` (0555).
///
/// Capacity is a soft budget of (max file count, max total bytes). Eviction
/// walks the pool least-recently-used first and only removes entries whose
/// link count is one; an entry still linked into some build directory is
/// never taken away. If everything is in use the pool simply runs over
/// budget.
///
/// All pool mutation (insert, evict, hardlink) happens under one lock; the
/// download itself does not.
pub struct HardlinkingContentAddressableStorage {
    inner: Arc<dyn ContentAddressableStorage>,
    pool: PathBuf,
    max_files: usize,
    max_size_bytes: u64,
    state: Mutex<PoolState>,
    next_temp_id: AtomicU64,
}

impl HardlinkingContentAddressableStorage {
    pub fn new(
        inner: Arc<dyn ContentAddressableStorage>,
        pool: PathBuf,
        max_files: usize,
        max_size_bytes: u64,
    ) -> Result<Self> {
        std::fs::create_dir_all(&pool)?;
        Ok(Self {
            inner,
            pool,
            max_files,
            max_size_bytes,
            state: Mutex::new(PoolState {
                entries: LruCache::unbounded(),
                total_size_bytes: 0,
            }),
            next_temp_id: AtomicU64::new(0),
        })
    }

    fn pool_path(&self, key: &PoolKey) -> PathBuf {
        let mut name = key.digest.hash_hex();
        if key.executable {
            name.push_str("+x");
        }
        self.pool.join(name)
    }

    /// Makes room for an entry of `incoming` bytes. Caller holds the lock.
    fn evict_for(&self, state: &mut PoolState, incoming: u64) {
        while state.entries.len() >= self.max_files
            || state.total_size_bytes + incoming > self.max_size_bytes
        {
            let victim = state.entries.iter().rev().find_map(|(key, size)| {
                match std::fs::metadata(self.pool_path(key)) {
                    Ok(m) if m.nlink() == 1 => Some((key.clone(), *size)),
                    _ => None,
                }
            });
            match victim {
                Some((key, size)) => {
                    tracing::debug!(digest = %key.digest, "evicting pooled file");
                    let _ = std::fs::remove_file(self.pool_path(&key));
                    state.entries.pop(&key);
                    state.total_size_bytes -= size;
                }
                // Every entry still has a live link; the budget is a soft
                // hint, so admit the newcomer anyway.
                None => break,
            }
        }
    }
}

#[async_trait]
impl ContentAddressableStorage for HardlinkingContentAddressableStorage {
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
        self.inner.get_directory(instance, digest).await
    }

    async fn get_file(
        &self,
        instance: &InstanceName,
        digest: &FileDigest,
        path: &Path,
        is_executable: bool,
    ) -> Result<()> {
        let key = PoolKey {
            digest: *digest,
            executable: is_executable,
        };
        let pool_path = self.pool_path(&key);

        {
            let mut state = self.state.lock();
            if state.entries.get(&key).is_some() {
                std::fs::hard_link(&pool_path, path)?;
                return Ok(());
            }
        }

        // Not pooled yet: download next to the pool under a temporary name,
        // so the rename into place is atomic and a concurrent get never
        // observes a half-written pool entry.
        let temp = self.pool.join(format!(
            "tmp.{}",
            self.next_temp_id.fetch_add(1, Ordering::Relaxed)
        ));
        self.inner
            .get_file(instance, digest, &temp, is_executable)
            .await?;

        let mut state = self.state.lock();
        self.evict_for(&mut state, digest.size());
        std::fs::rename(&temp, &pool_path)?;
        // Two concurrent misses both download; only account the entry once.
        if state.entries.put(key, digest.size()).is_none() {
            state.total_size_bytes += digest.size();
        }
        std::fs::hard_link(&pool_path, path)?;
        Ok(())
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

#[cfg(test)]
mod tests {
    use std::os::unix::fs::PermissionsExt;

    use forge_blobstore::BlobAccess;
    use forge_blobstore::MemoryBlobAccess;

    use super::*;
    use crate::BlobAccessContentAddressableStorage;

    struct Fixture {
        instance: InstanceName,
        blob_access: Arc<MemoryBlobAccess>,
        storage: HardlinkingContentAddressableStorage,
        _dir: tempfile::TempDir,
        staging: PathBuf,
        pool: PathBuf,
    }

    fn fixture(max_files: usize, max_size_bytes: u64) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let pool = dir.path().join("pool");
        let staging = dir.path().join("staging");
        std::fs::create_dir(&staging).unwrap();

        let blob_access = Arc::new(MemoryBlobAccess::new());
        let inner = Arc::new(BlobAccessContentAddressableStorage::new(
            blob_access.clone(),
        ));
        let storage = HardlinkingContentAddressableStorage::new(
            inner,
            pool.clone(),
            max_files,
            max_size_bytes,
        )
        .unwrap();

        Fixture {
            instance: InstanceName::default(),
            blob_access,
            storage,
            _dir: dir,
            staging,
            pool,
        }
    }

    async fn store_blob(f: &Fixture, data: &[u8]) -> FileDigest {
        let digest = FileDigest::from_bytes(data);
        f.blob_access
            .put(&f.instance, &digest.coerce(), data.to_vec().into())
            .await
            .unwrap();
        digest
    }

    #[tokio::test]
    async fn test_materializes_by_hardlink_from_the_pool() {
        let f = fixture(10, 1 << 20);
        let digest = store_blob(&f, b"hello").await;

        let a = f.staging.join("a");
        let b = f.staging.join("b");
        f.storage
            .get_file(&f.instance, &digest, &a, false)
            .await
            .unwrap();
        f.storage
            .get_file(&f.instance, &digest, &b, false)
            .await
            .unwrap();

        assert_eq!(b"hello".to_vec(), std::fs::read(&a).unwrap());
        // Pool entry plus two materializations share one inode.
        assert_eq!(3, std::fs::metadata(&a).unwrap().nlink());
        assert_eq!(
            std::fs::metadata(&a).unwrap().ino(),
            std::fs::metadata(&b).unwrap().ino()
        );
    }

    #[tokio::test]
    async fn test_modes_get_separate_pool_entries() {
        let f = fixture(10, 1 << 20);
        let digest = store_blob(&f, b"#!/bin/sh\n").await;

        let plain = f.staging.join("plain");
        let exe = f.staging.join("exe");
        f.storage
            .get_file(&f.instance, &digest, &plain, false)
            .await
            .unwrap();
        f.storage
            .get_file(&f.instance, &digest, &exe, true)
            .await
            .unwrap();

        assert_eq!(
            0o444,
            std::fs::metadata(&plain).unwrap().permissions().mode() & 0o777
        );
        assert_eq!(
            0o555,
            std::fs::metadata(&exe).unwrap().permissions().mode() & 0o777
        );
        assert!(f.pool.join(digest.hash_hex()).exists());
        assert!(f.pool.join(format!("{}+x", digest.hash_hex())).exists());
    }

    #[tokio::test]
    async fn test_unreferenced_entries_are_evicted_at_capacity() {
        let f = fixture(1, 1 << 20);
        let first = store_blob(&f, b"first").await;
        let second = store_blob(&f, b"second").await;

        let a = f.staging.join("a");
        f.storage
            .get_file(&f.instance, &first, &a, false)
            .await
            .unwrap();
        // Drop the only live link so the pool entry becomes evictable.
        std::fs::remove_file(&a).unwrap();

        f.storage
            .get_file(&f.instance, &second, &f.staging.join("b"), false)
            .await
            .unwrap();

        assert!(!f.pool.join(first.hash_hex()).exists());
        assert!(f.pool.join(second.hash_hex()).exists());
    }

    #[tokio::test]
    async fn test_capacity_is_soft_when_all_entries_are_live() {
        let f = fixture(1, 1 << 20);
        let first = store_blob(&f, b"first").await;
        let second = store_blob(&f, b"second").await;

        // Keep the first materialization alive so its entry is pinned.
        f.storage
            .get_file(&f.instance, &first, &f.staging.join("a"), false)
            .await
            .unwrap();
        f.storage
            .get_file(&f.instance, &second, &f.staging.join("b"), false)
            .await
            .unwrap();

        assert!(f.pool.join(first.hash_hex()).exists());
        assert!(f.pool.join(second.hash_hex()).exists());
    }

    #[tokio::test]
    async fn test_byte_budget_drives_eviction_too() {
        let f = fixture(100, 10);
        let first = store_blob(&f, b"aaaaaaaa").await; // 8 bytes
        let second = store_blob(&f, b"bbbbbbbb").await;

        let a = f.staging.join("a");
        f.storage
            .get_file(&f.instance, &first, &a, false)
            .await
            .unwrap();
        std::fs::remove_file(&a).unwrap();

        f.storage
            .get_file(&f.instance, &second, &f.staging.join("b"), false)
            .await
            .unwrap();

        assert!(!f.pool.join(first.hash_hex()).exists());
        assert!(f.pool.join(second.hash_hex()).exists());
    }
}
