/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

use std::fmt;

use dupe::Dupe;
use thiserror::Error;

use crate::digest::CasDigestParseError;

/// The status codes this backend distinguishes. The discriminants are the
/// corresponding `google.rpc.Code` values, so a `Code` converts losslessly
/// into a wire status.
#[derive(Copy, Clone, Dupe, Debug, PartialEq, Eq)]
pub enum Code {
    /// The caller gave up; the operation was torn down mid-flight.
    Cancelled = 1,
    /// Malformed request: unsafe path, empty argument vector, bad digest.
    InvalidArgument = 3,
    /// An action-level timeout expired.
    DeadlineExceeded = 4,
    /// A blob is absent from the store consulted.
    NotFound = 5,
    /// The filesystem did not look the way the contract requires, e.g. an
    /// unexpected file type encountered while harvesting outputs.
    FailedPrecondition = 9,
    /// A feature that is deliberately rejected, e.g. symlinks in input
    /// roots.
    Unimplemented = 12,
    /// Unclassified failure inside the backend.
    Internal = 13,
    /// Transient I/O failure; retrying may help.
    Unavailable = 14,
    /// Stored bytes do not match their digest, or do not decode.
    DataLoss = 15,
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Code::Cancelled => "CANCELLED",
            Code::InvalidArgument => "INVALID_ARGUMENT",
            Code::DeadlineExceeded => "DEADLINE_EXCEEDED",
            Code::NotFound => "NOT_FOUND",
            Code::FailedPrecondition => "FAILED_PRECONDITION",
            Code::Unimplemented => "UNIMPLEMENTED",
            Code::Internal => "INTERNAL",
            Code::Unavailable => "UNAVAILABLE",
            Code::DataLoss => "DATA_LOSS",
        };
        write!(f, "{}", name)
    }
}

/// The error type used throughout forge: a status code plus a message, with
/// an optional underlying cause.
#[derive(Debug, Error)]
#[error("{code}: {message}")]
pub struct Error {
    code: Code,
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    pub fn new(code: Code, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::new(Code::Cancelled, message)
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(Code::InvalidArgument, message)
    }

    pub fn deadline_exceeded(message: impl Into<String>) -> Self {
        Self::new(Code::DeadlineExceeded, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(Code::NotFound, message)
    }

    pub fn failed_precondition(message: impl Into<String>) -> Self {
        Self::new(Code::FailedPrecondition, message)
    }

    pub fn unimplemented(message: impl Into<String>) -> Self {
        Self::new(Code::Unimplemented, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(Code::Internal, message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(Code::Unavailable, message)
    }

    pub fn data_loss(message: impl Into<String>) -> Self {
        Self::new(Code::DataLoss, message)
    }

    pub fn with_source(
        mut self,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn code(&self) -> Code {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Folds the error into a wire status, for responses that carry their
    /// failure in-band.
    pub fn to_status(&self) -> forge_proto::google::rpc::Status {
        forge_proto::google::rpc::Status {
            code: self.code as i32,
            message: self.to_string(),
            details: Vec::new(),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        let code = match e.kind() {
            std::io::ErrorKind::NotFound => Code::NotFound,
            _ => Code::Unavailable,
        };
        Self::new(code, e.to_string()).with_source(e)
    }
}

impl From<CasDigestParseError> for Error {
    fn from(e: CasDigestParseError) -> Self {
        Self::invalid_argument(e.to_string()).with_source(e)
    }
}
