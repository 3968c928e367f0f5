/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use forge_blobstore::BlobAccess;
use forge_core::digest::ActionDigest;
use forge_core::digest::CasDigest;
use forge_core::digest::CommandDigest;
use forge_core::digest::DirectoryDigest;
use forge_core::digest::FileDigest;
use forge_core::digest::TreeDigest;
use forge_core::error::Error;
use forge_core::error::Result;
use forge_core::instance::InstanceName;
use forge_proto::build::bazel::remote::execution::v2::Action;
use forge_proto::build::bazel::remote::execution::v2::Command;
use forge_proto::build::bazel::remote::execution::v2::Directory;
use forge_proto::build::bazel::remote::execution::v2::Tree;
use prost::Message;
use tokio::io::AsyncWriteExt;

use crate::ContentAddressableStorage;

/// The baseline 'ContentAddressableStorage': every operation is expressed
/// directly over a 'BlobAccess'.
pub struct BlobAccessContentAddressableStorage {
    blob_access: Arc<dyn BlobAccess>,
}

impl BlobAccessContentAddressableStorage {
    pub fn new(blob_access: Arc<dyn BlobAccess>) -> Self {
        Self { blob_access }
    }

    async fn get_message<M: Message + Default, Kind>(
        &self,
        instance: &InstanceName,
        digest: &CasDigest<Kind>,
        what: &str,
    ) -> Result<M> {
        let data = self.blob_access.get(instance, &digest.coerce()).await?;
        M::decode(data).map_err(|e| {
            Error::data_loss(format!("{} {} does not decode", what, digest)).with_source(e)
        })
    }

    async fn put_bytes_if_missing(
        &self,
        instance: &InstanceName,
        digest: &forge_core::digest::BlobDigest,
        data: Vec<u8>,
    ) -> Result<()> {
        let missing = self.blob_access.find_missing(instance, &[*digest]).await?;
        if !missing.is_empty() {
            self.blob_access.put(instance, digest, data.into()).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl ContentAddressableStorage for BlobAccessContentAddressableStorage {
    async fn get_action(&self, instance: &InstanceName, digest: &ActionDigest) -> Result<Action> {
        self.get_message(instance, digest, "action").await
    }

    async fn get_command(
        &self,
        instance: &InstanceName,
        digest: &CommandDigest,
    ) -> Result<Command> {
        self.get_message(instance, digest, "command").await
    }

    async fn get_directory(
        &self,
        instance: &InstanceName,
        digest: &DirectoryDigest,
    ) -> Result<Directory> {
        self.get_message(instance, digest, "directory").await
    }

    async fn get_file(
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

        // Create-exclusive already rules out clobbering; on a failed write
        // also take the partial file with us so the contract stays
        // all-or-nothing.
        if let Err(e) = file.write_all(&data).await {
            drop(file);
            let _ = tokio::fs::remove_file(path).await;
            return Err(e.into());
        }
        Ok(())
    }

    async fn put_file(
        &self,
        instance: &InstanceName,
        path: &Path,
    ) -> Result<(FileDigest, bool)> {
        let data = tokio::fs::read(path).await?;
        let is_executable =
            tokio::fs::metadata(path).await?.permissions().mode() & 0o111 != 0;

        let digest = FileDigest::from_bytes(&data);
        self.put_bytes_if_missing(instance, &digest.coerce(), data)
            .await?;
        Ok((digest, is_executable))
    }

    async fn put_tree(&self, instance: &InstanceName, tree: &Tree) -> Result<TreeDigest> {
        let data = tree.encode_to_vec();
        let digest = TreeDigest::from_bytes(&data);
        self.put_bytes_if_missing(instance, &digest.coerce(), data)
            .await?;
        Ok(digest)
    }
}
