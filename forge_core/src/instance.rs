/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

use derive_more::Display;

/// An opaque string partitioning the CAS and AC namespaces. All store keys
/// are (instance, digest); different instances never observe each other's
/// blobs. The empty instance name is valid and is the default.
#[derive(Clone, Display, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct InstanceName(String);

impl InstanceName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for InstanceName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}
