/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

//! Execution of build actions on the local system.
//!
//! The executor is a CAS client on both ends of the pipeline: it stages the
//! input Merkle tree out of the store before the command runs and ingests
//! outputs back into it afterwards. The scheduler sitting above decides,
//! based on the `cacheable` flag returned here, whether the result also
//! goes into the action cache.

mod input_file_exposer;
mod local;
mod run;

use async_trait::async_trait;
use forge_proto::build::bazel::remote::execution::v2::ExecuteRequest;
use forge_proto::build::bazel::remote::execution::v2::ExecuteResponse;

pub use crate::input_file_exposer::BlobAccessInputFileExposer;
pub use crate::input_file_exposer::CasInputFileExposer;
pub use crate::input_file_exposer::InputFileExposer;
pub use crate::local::BuildDirectories;
pub use crate::local::Credentials;
pub use crate::local::LocalBuildExecutor;

/// Something that can execute build actions.
#[async_trait]
pub trait BuildExecutor: Send + Sync + 'static {
    /// Executes a build action. Failures to stage, spawn or harvest fold
    /// into the response's `status`; a command that runs and exits non-zero
    /// is a successful execution whose result carries the exit code.
    ///
    /// The returned boolean is true iff the result may be stored in the
    /// action cache: the action permits caching and the exit code is zero.
    async fn execute(&self, request: &ExecuteRequest) -> (ExecuteResponse, bool);
}
