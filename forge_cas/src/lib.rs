/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

//! The typed view of the content-addressable store.
//!
//! Where 'BlobAccess' moves raw bytes, this crate moves the protocol
//! messages and files the executor actually works with. Implementations
//! compose by decoration, just like the blob layer underneath:
//! `Hardlinking(Caching(BlobAccess(...)))` is assembled at startup and used
//! as one store.

mod blob_access;
mod caching;
mod hardlinking;

use std::path::Path;

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

pub use crate::blob_access::BlobAccessContentAddressableStorage;
pub use crate::caching::DirectoryCachingContentAddressableStorage;
pub use crate::hardlinking::HardlinkingContentAddressableStorage;

/// Typed get/put over a content-addressable store.
///
/// Message getters fail with `NotFound` when the blob is absent and
/// `DataLoss` when it does not decode. File transfer is atomic: after
/// `get_file` either `path` holds the full blob with the requested mode, or
/// it does not exist.
#[async_trait]
pub trait ContentAddressableStorage: Send + Sync + 'static {
    async fn get_action(&self, instance: &InstanceName, digest: &ActionDigest) -> Result<Action>;

    async fn get_command(&self, instance: &InstanceName, digest: &CommandDigest)
        -> Result<Command>;

    async fn get_directory(
        &self,
        instance: &InstanceName,
        digest: &DirectoryDigest,
    ) -> Result<Directory>;

    /// Places the blob at `path` with mode 0555 (executable) or 0444. The
    /// path must not exist yet.
    async fn get_file(
        &self,
        instance: &InstanceName,
        digest: &FileDigest,
        path: &Path,
        is_executable: bool,
    ) -> Result<()>;

    /// Reads the file at `path`, uploads it if the store does not have it
    /// yet, and returns its digest along with whether it is executable.
    async fn put_file(
        &self,
        instance: &InstanceName,
        path: &Path,
    ) -> Result<(FileDigest, bool)>;

    /// Serializes and uploads a `Tree` message, returning its digest.
    async fn put_tree(&self, instance: &InstanceName, tree: &Tree) -> Result<TreeDigest>;
}
