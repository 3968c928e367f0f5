/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use forge_core::digest::BlobDigest;
use forge_core::error::Error;
use forge_core::error::Result;
use forge_core::instance::InstanceName;

use crate::BlobAccess;

/// A decorator that enforces digest integrity on both reads and writes.
///
/// This is the only place in the chain where hashes are recomputed; every
/// other layer trusts its input. Corrupt bytes coming out of the inner
/// store surface as `DataLoss`; a caller declaring a digest its own bytes
/// do not match is an `InvalidArgument`.
///
/// Do not place an action cache behind this decorator: AC entries are
/// keyed by the *action* digest, which by design does not match the stored
/// result bytes.
pub struct ValidatingBlobAccess {
    inner: Arc<dyn BlobAccess>,
}

impl ValidatingBlobAccess {
    pub fn new(inner: Arc<dyn BlobAccess>) -> Self {
        Self { inner }
    }
}

fn check(digest: &BlobDigest, data: &Bytes) -> std::result::Result<(), BlobDigest> {
    let actual = BlobDigest::from_bytes(data);
    if actual == *digest { Ok(()) } else { Err(actual) }
}

#[async_trait]
impl BlobAccess for ValidatingBlobAccess {
    async fn get(&self, instance: &InstanceName, digest: &BlobDigest) -> Result<Bytes> {
        let data = self.inner.get(instance, digest).await?;
        match check(digest, &data) {
            Ok(()) => Ok(data),
            Err(actual) => Err(Error::data_loss(format!(
                "blob requested as {} has digest {}",
                digest, actual
            ))),
        }
    }

    async fn put(&self, instance: &InstanceName, digest: &BlobDigest, data: Bytes) -> Result<()> {
        match check(digest, &data) {
            Ok(()) => self.inner.put(instance, digest, data).await,
            Err(actual) => Err(Error::invalid_argument(format!(
                "blob declared as {} has digest {}",
                digest, actual
            ))),
        }
    }

    async fn find_missing(
        &self,
        instance: &InstanceName,
        digests: &[BlobDigest],
    ) -> Result<Vec<BlobDigest>> {
        self.inner.find_missing(instance, digests).await
    }
}
