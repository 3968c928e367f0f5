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
use crate::fs::paths::FileName;

/// A forward pointing, fully normalized relative path. There is no `.` or
/// `..` in this path, it does not begin or end with `/`, and separators are
/// always single. The empty path is valid and denotes the base directory
/// itself.
///
/// This is what the wire protocol's `working_directory` and declared output
/// paths parse into; resolving one against a trusted absolute base can never
/// escape the base.
#[repr(transparent)]
#[derive(Display, Debug, RefCast, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ForwardRelativePath(str);

/// The owned version of 'ForwardRelativePath', like how 'PathBuf' relates
/// to 'Path'.
#[derive(Clone, Display, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ForwardRelativePathBuf(String);

impl ForwardRelativePath {
    /// Creates a 'ForwardRelativePath' if the given string represents a
    /// forward, normalized relative path, otherwise `InvalidArgument`.
    ///
    /// ```
    /// use forge_core::fs::paths::ForwardRelativePath;
    ///
    /// assert!(ForwardRelativePath::new("foo/bar").is_ok());
    /// assert!(ForwardRelativePath::new("").is_ok());
    /// assert!(ForwardRelativePath::new("./bar").is_err());
    /// assert!(ForwardRelativePath::new("normalize/./bar").is_err());
    /// assert!(ForwardRelativePath::new("normalize/../bar").is_err());
    /// assert!(ForwardRelativePath::new("/abs/bar").is_err());
    /// assert!(ForwardRelativePath::new("foo//bar").is_err());
    /// assert!(ForwardRelativePath::new("foo/bar/").is_err());
    /// assert!(ForwardRelativePath::new("..").is_err());
    /// ```
    pub fn new<S: ?Sized + AsRef<str>>(s: &S) -> Result<&Self> {
        let path = s.as_ref();
        if !path.is_empty() {
            for component in path.split('/') {
                FileName::new(component).map_err(|e| {
                    Error::invalid_argument(format!(
                        "`{}` is not a normalized relative path",
                        path
                    ))
                    .with_source(e)
                })?;
            }
        }
        Ok(Self::unchecked_new(path))
    }

    pub fn unchecked_new<S: ?Sized + AsRef<str>>(s: &S) -> &Self {
        ForwardRelativePath::ref_cast(s.as_ref())
    }

    pub fn empty() -> &'static Self {
        ForwardRelativePath::unchecked_new("")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_path(&self) -> &Path {
        Path::new(&self.0)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over the components of the path, in order.
    pub fn iter(&self) -> impl Iterator<Item = &FileName> {
        self.0
            .split('/')
            .filter(|s| !s.is_empty())
            .map(FileName::unchecked_new)
    }

    /// Creates an owned 'ForwardRelativePathBuf' with `path` adjoined to
    /// `self`.
    ///
    /// ```
    /// use forge_core::fs::paths::ForwardRelativePath;
    /// use forge_core::fs::paths::ForwardRelativePathBuf;
    ///
    /// let path = ForwardRelativePath::new("foo/bar").unwrap();
    /// let other = ForwardRelativePath::new("baz").unwrap();
    /// assert_eq!(
    ///     ForwardRelativePathBuf::unchecked_new("foo/bar/baz".to_owned()),
    ///     path.join(other)
    /// );
    /// ```
    pub fn join<P: AsRef<ForwardRelativePath>>(&self, path: P) -> ForwardRelativePathBuf {
        let path = path.as_ref();
        if self.0.is_empty() {
            path.to_buf()
        } else if path.0.is_empty() {
            self.to_buf()
        } else {
            let mut buf = String::with_capacity(self.0.len() + 1 + path.0.len());
            buf.push_str(&self.0);
            buf.push('/');
            buf.push_str(&path.0);
            ForwardRelativePathBuf::unchecked_new(buf)
        }
    }

    /// Returns the path of the parent directory, or `None` for the empty
    /// path.
    pub fn parent(&self) -> Option<&ForwardRelativePath> {
        if self.0.is_empty() {
            return None;
        }
        match self.0.rfind('/') {
            Some(i) => Some(ForwardRelativePath::unchecked_new(&self.0[..i])),
            None => Some(ForwardRelativePath::empty()),
        }
    }

    pub fn to_buf(&self) -> ForwardRelativePathBuf {
        ForwardRelativePathBuf(self.0.to_owned())
    }
}

impl ForwardRelativePathBuf {
    pub fn new(s: impl Into<String>) -> Result<Self> {
        let s = s.into();
        ForwardRelativePath::new(&s)?;
        Ok(Self(s))
    }

    pub fn unchecked_new(s: String) -> Self {
        Self(s)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Deref for ForwardRelativePathBuf {
    type Target = ForwardRelativePath;

    fn deref(&self) -> &ForwardRelativePath {
        ForwardRelativePath::unchecked_new(&self.0)
    }
}

impl Borrow<ForwardRelativePath> for ForwardRelativePathBuf {
    fn borrow(&self) -> &ForwardRelativePath {
        self
    }
}

impl AsRef<ForwardRelativePath> for ForwardRelativePath {
    fn as_ref(&self) -> &ForwardRelativePath {
        self
    }
}

impl AsRef<ForwardRelativePath> for FileName {
    fn as_ref(&self) -> &ForwardRelativePath {
        ForwardRelativePath::unchecked_new(self.as_str())
    }
}

impl AsRef<Path> for ForwardRelativePath {
    fn as_ref(&self) -> &Path {
        self.as_path()
    }
}

impl AsRef<Path> for ForwardRelativePathBuf {
    fn as_ref(&self) -> &Path {
        Path::new(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iter_components() {
        let p = ForwardRelativePath::new("foo/bar/baz").unwrap();
        assert_eq!(
            vec!["foo", "bar", "baz"],
            p.iter().map(|f| f.as_str()).collect::<Vec<_>>()
        );
        assert_eq!(
            0,
            ForwardRelativePath::empty().iter().count()
        );
    }

    #[test]
    fn test_parent() {
        let p = ForwardRelativePath::new("foo/bar/baz").unwrap();
        assert_eq!(Some(ForwardRelativePath::new("foo/bar").unwrap()), p.parent());
        assert_eq!(
            Some(ForwardRelativePath::empty()),
            ForwardRelativePath::new("foo").unwrap().parent()
        );
        assert_eq!(None, ForwardRelativePath::empty().parent());
    }

    #[test]
    fn test_join_empty_sides() {
        let p = ForwardRelativePath::new("foo").unwrap();
        assert_eq!("foo", p.join(ForwardRelativePath::empty()).as_str());
        assert_eq!("foo", ForwardRelativePath::empty().join(p).as_str());
    }
}
