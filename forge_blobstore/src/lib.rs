/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

//! The raw blob storage capability.
//!
//! A 'BlobAccess' is the operation set get/put/find_missing over
//! (instance, digest) keys. Implementations compose by decoration: a chain
//! such as `Validating(Memory)` is built once at startup and treated as a
//! single store by every higher layer. Only leaf operations are observable,
//! so the decorators need no common machinery beyond the trait itself.

mod memory;
mod validating;

use async_trait::async_trait;
use bytes::Bytes;
use forge_core::digest::BlobDigest;
use forge_core::error::Result;
use forge_core::instance::InstanceName;

pub use crate::memory::MemoryBlobAccess;
pub use crate::validating::ValidatingBlobAccess;

/// Abstract get/put of a blob by (instance, digest).
///
/// Blobs are byte-addressable units of bounded size, so payloads travel as
/// [`Bytes`] rather than streams.
#[async_trait]
pub trait BlobAccess: Send + Sync + 'static {
    /// Returns the blob stored under `digest`, or `NotFound`. On success
    /// the returned bytes are exactly `digest.size()` long and hash to
    /// `digest.hash()`, provided the chain contains a validating layer.
    async fn get(&self, instance: &InstanceName, digest: &BlobDigest) -> Result<Bytes>;

    /// Stores `data` under `digest`. The declared digest must describe
    /// `data`; implementations may short-circuit the write if they can
    /// establish the blob already exists.
    async fn put(&self, instance: &InstanceName, digest: &BlobDigest, data: Bytes) -> Result<()>;

    /// Returns the subset of `digests` not present in the store, used to
    /// probe before uploading.
    async fn find_missing(
        &self,
        instance: &InstanceName,
        digests: &[BlobDigest],
    ) -> Result<Vec<BlobDigest>>;
}
