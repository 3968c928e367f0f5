/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

//! The action cache: a digest-keyed mapping from action fingerprints to
//! previously computed action results.
//!
//! Unlike the CAS, the storage key here is the *action* digest, not a digest
//! of the stored result bytes. That breaks the content-addressed invariant
//! on purpose, which is why 'BlobAccessActionCache' takes its own backing
//! store: hand it a store without a validating layer, never the validated
//! CAS chain.

use std::sync::Arc;

use async_trait::async_trait;
use forge_blobstore::BlobAccess;
use forge_core::digest::ActionDigest;
use forge_core::error::Error;
use forge_core::error::Result;
use forge_core::instance::InstanceName;
use forge_proto::build::bazel::remote::execution::v2::ActionResult;
use prost::Message;

/// Digest-keyed storage of action results.
#[async_trait]
pub trait ActionCache: Send + Sync + 'static {
    /// Returns the cached result of executing the action named by
    /// `digest`, or `NotFound`.
    async fn get_action_result(
        &self,
        instance: &InstanceName,
        digest: &ActionDigest,
    ) -> Result<ActionResult>;

    /// Records `result` as the outcome of the action named by `digest`.
    /// Last-writer-wins; concurrent writers for one action digest store
    /// semantically equivalent results, so the race is benign.
    async fn put_action_result(
        &self,
        instance: &InstanceName,
        digest: &ActionDigest,
        result: &ActionResult,
    ) -> Result<()>;
}

/// An 'ActionCache' that reads and writes entries through a 'BlobAccess'
/// based store.
pub struct BlobAccessActionCache {
    blob_access: Arc<dyn BlobAccess>,
}

impl BlobAccessActionCache {
    /// `blob_access` must not validate content hashes; see the module
    /// documentation.
    pub fn new(blob_access: Arc<dyn BlobAccess>) -> Self {
        Self { blob_access }
    }
}

#[async_trait]
impl ActionCache for BlobAccessActionCache {
    async fn get_action_result(
        &self,
        instance: &InstanceName,
        digest: &ActionDigest,
    ) -> Result<ActionResult> {
        let data = self.blob_access.get(instance, &digest.coerce()).await?;
        ActionResult::decode(data).map_err(|e| {
            Error::data_loss(format!("action result for {} does not decode", digest))
                .with_source(e)
        })
    }

    async fn put_action_result(
        &self,
        instance: &InstanceName,
        digest: &ActionDigest,
        result: &ActionResult,
    ) -> Result<()> {
        let data = result.encode_to_vec();
        self.blob_access
            .put(instance, &digest.coerce(), data.into())
            .await
    }
}
