/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

use std::cmp::Ordering;
use std::fmt;
use std::hash::Hash;
use std::hash::Hasher;
use std::marker::PhantomData;

use dupe::Dupe;
use once_cell::sync::Lazy;
use sha2::Digest as _;
use sha2::Sha256;
use thiserror::Error;

/// The number of bytes required by a SHA-256 hash.
pub const SHA256_SIZE: usize = 32;

/// A content digest: a SHA-256 hash paired with the exact size of the blob
/// it names. Two blobs are equal iff their digests are equal.
///
/// The `Kind` parameter records what the referenced bytes decode to (an
/// `Action`, a `Directory`, raw file contents, ...) so that a digest fetched
/// for one purpose cannot silently be used for another. It has no runtime
/// representation.
pub struct CasDigest<Kind> {
    hash: [u8; SHA256_SIZE],
    size: u64,
    kind: PhantomData<Kind>,
}

// Manual impls so that `Kind` does not need to implement anything.
impl<Kind> Clone for CasDigest<Kind> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<Kind> Copy for CasDigest<Kind> {}

impl<Kind> Dupe for CasDigest<Kind> {}

impl<Kind> PartialEq for CasDigest<Kind> {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash && self.size == other.size
    }
}

impl<Kind> Eq for CasDigest<Kind> {}

impl<Kind> Hash for CasDigest<Kind> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.hash.hash(state);
        self.size.hash(state);
    }
}

impl<Kind> PartialOrd for CasDigest<Kind> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<Kind> Ord for CasDigest<Kind> {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.hash, self.size).cmp(&(other.hash, other.size))
    }
}

impl<Kind> fmt::Display for CasDigest<Kind> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", hex::encode(self.hash), self.size)
    }
}

impl<Kind> fmt::Debug for CasDigest<Kind> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

static EMPTY_SHA256: Lazy<[u8; SHA256_SIZE]> = Lazy::new(|| Sha256::digest(b"").into());

impl<Kind> CasDigest<Kind> {
    pub fn new(hash: [u8; SHA256_SIZE], size: u64) -> Self {
        Self {
            hash,
            size,
            kind: PhantomData,
        }
    }

    pub fn hash(&self) -> &[u8; SHA256_SIZE] {
        &self.hash
    }

    /// The hash as a lowercase hexadecimal string, the wire representation.
    pub fn hash_hex(&self) -> String {
        hex::encode(self.hash)
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// The well-known digest of the empty blob.
    pub fn empty() -> Self {
        Self::new(*EMPTY_SHA256, 0)
    }

    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self::new(Sha256::digest(bytes).into(), bytes.len() as u64)
    }

    /// The digest of a serialized protocol message. This is how actions,
    /// commands, directories and trees are named.
    pub fn from_message<M: prost::Message>(message: &M) -> Self {
        Self::from_bytes(&message.encode_to_vec())
    }

    /// Reinterprets this digest as naming a different kind of content.
    /// Deliberately explicit: the only sound uses are the boundaries where
    /// typed content meets the untyped blob store.
    pub fn coerce<NewKind>(self) -> CasDigest<NewKind> {
        CasDigest::new(self.hash, self.size)
    }

    pub fn parse(s: &str) -> Result<Self, CasDigestParseError> {
        let (hash, size) = s
            .split_once(':')
            .ok_or(CasDigestParseError::MissingSizeSeparator)?;
        let size = size.parse().map_err(CasDigestParseError::InvalidSize)?;
        Self::from_hex(hash, size)
    }

    fn from_hex(hash: &str, size: u64) -> Result<Self, CasDigestParseError> {
        let mut bytes = [0; SHA256_SIZE];
        hex::decode_to_slice(hash, &mut bytes).map_err(CasDigestParseError::InvalidHash)?;
        Ok(Self::new(bytes, size))
    }

    pub fn to_proto(&self) -> forge_proto::build::bazel::remote::execution::v2::Digest {
        forge_proto::build::bazel::remote::execution::v2::Digest {
            hash: self.hash_hex(),
            size_bytes: self.size as i64,
        }
    }

    /// Parses a wire digest. The hash must be exactly 64 lowercase hex
    /// characters and the size must be non-negative.
    pub fn from_proto(
        digest: &forge_proto::build::bazel::remote::execution::v2::Digest,
    ) -> Result<Self, CasDigestParseError> {
        if digest.size_bytes < 0 {
            return Err(CasDigestParseError::NegativeSize(digest.size_bytes));
        }
        Self::from_hex(&digest.hash, digest.size_bytes as u64)
    }
}

#[derive(Error, Debug)]
pub enum CasDigestParseError {
    #[error("digest is missing a size separator, it should look like `HASH:SIZE`")]
    MissingSizeSeparator,

    #[error("the SHA-256 part of the digest is invalid")]
    InvalidHash(#[source] hex::FromHexError),

    #[error("the size part of the digest is invalid")]
    InvalidSize(#[source] std::num::ParseIntError),

    #[error("the digest has a negative size: {0}")]
    NegativeSize(i64),
}

pub struct ActionDigestKind {
    _private: (),
}

pub struct CommandDigestKind {
    _private: (),
}

pub struct DirectoryDigestKind {
    _private: (),
}

pub struct TreeDigestKind {
    _private: (),
}

pub struct FileDigestKind {
    _private: (),
}

/// Kind for digests handled below the typed facade, where content is just
/// bytes.
pub struct BlobDigestKind {
    _private: (),
}

pub type ActionDigest = CasDigest<ActionDigestKind>;
pub type CommandDigest = CasDigest<CommandDigestKind>;
pub type DirectoryDigest = CasDigest<DirectoryDigestKind>;
pub type TreeDigest = CasDigest<TreeDigestKind>;
pub type FileDigest = CasDigest<FileDigestKind>;
pub type BlobDigest = CasDigest<BlobDigestKind>;
