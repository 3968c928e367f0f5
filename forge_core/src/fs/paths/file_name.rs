/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

use std::borrow::Borrow;
use std::ops::Deref;
use std::path::Path;

use derive_more::Display;
use ref_cast::RefCast;

use crate::error::Error;
use crate::error::Result;

fn verify(file_name: &str) -> Result<()> {
    if file_name.is_empty() {
        Err(Error::invalid_argument("file name is empty"))
    } else if file_name == "." {
        Err(Error::invalid_argument("file name is current directory"))
    } else if file_name == ".." {
        Err(Error::invalid_argument("file name is parent directory"))
    } else if file_name.contains('/') || file_name.contains('\\') {
        // Backslashes are valid in file names on Linux, but accepting them
        // would make the same tree non-representable on other platforms.
        Err(Error::invalid_argument(format!(
            "slashes in file name: `{}`",
            file_name
        )))
    } else {
        Ok(())
    }
}

/// A single directory entry name. Cannot be empty, cannot contain slashes,
/// and cannot be `.` or `..`, so joining it onto a directory path always
/// stays inside that directory.
#[repr(transparent)]
#[derive(Display, Debug, RefCast, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FileName(str);

impl FileName {
    /// Creates a `FileName` if the given string is a safe directory entry
    /// name, otherwise `InvalidArgument`.
    ///
    /// ```
    /// use forge_core::fs::paths::FileName;
    ///
    /// assert!(FileName::new("foo").is_ok());
    /// assert!(FileName::new(".x").is_ok());
    /// assert!(FileName::new("").is_err());
    /// assert!(FileName::new(".").is_err());
    /// assert!(FileName::new("..").is_err());
    /// assert!(FileName::new("foo/bar").is_err());
    /// assert!(FileName::new("foo\\bar").is_err());
    /// ```
    pub fn new<S: ?Sized + AsRef<str>>(s: &S) -> Result<&Self> {
        verify(s.as_ref())?;
        Ok(Self::unchecked_new(s))
    }

    pub fn unchecked_new<S: ?Sized + AsRef<str>>(s: &S) -> &Self {
        FileName::ref_cast(s.as_ref())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn to_buf(&self) -> FileNameBuf {
        FileNameBuf(self.0.to_owned())
    }
}

impl AsRef<Path> for FileName {
    fn as_ref(&self) -> &Path {
        Path::new(&self.0)
    }
}

impl AsRef<str> for FileName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for FileName {
    fn eq(&self, other: &str) -> bool {
        &self.0 == other
    }
}

/// The owned version of 'FileName'.
#[derive(Clone, Display, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FileNameBuf(String);

impl FileNameBuf {
    pub fn new(s: impl Into<String>) -> Result<Self> {
        let s = s.into();
        verify(&s)?;
        Ok(Self(s))
    }

    pub fn unchecked_new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Deref for FileNameBuf {
    type Target = FileName;

    fn deref(&self) -> &FileName {
        FileName::unchecked_new(&self.0)
    }
}

impl Borrow<FileName> for FileNameBuf {
    fn borrow(&self) -> &FileName {
        self
    }
}

impl AsRef<Path> for FileNameBuf {
    fn as_ref(&self) -> &Path {
        Path::new(&self.0)
    }
}
