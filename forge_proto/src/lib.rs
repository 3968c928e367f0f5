/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

//! Hand-maintained message definitions for the subset of the Bazel Remote
//! Execution API v2 this backend speaks, plus `google.rpc.Status`.
//!
//! The structs carry the exact field numbers of the published
//! `remote_execution.proto`, so encoded messages are wire-compatible with
//! every other REAPI implementation. Maintaining them by hand keeps protoc
//! out of the build; fields the backend never reads or writes are omitted,
//! which is safe because unknown fields are skipped on decode and absent
//! fields are simply not emitted on encode.

pub mod build {
    pub mod bazel {
        pub mod remote {
            pub mod execution {
                pub mod v2 {
                    include!("build.bazel.remote.execution.v2.rs");
                }
            }
        }
    }
}

pub mod google {
    pub mod rpc {
        include!("google.rpc.rs");
    }
}
