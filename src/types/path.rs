//! Navigation paths inside a stored document.
//!
//! A [`Path`] is relative to a root key and made of string [`Key`]s. Numeric
//! keys stay strings; whether `"3"` addresses an object field or an array
//! element is decided by the container met during traversal.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single path segment.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Key(String);

impl Key {
    /// Create a key.
    #[inline]
    pub fn new(key: impl Into<String>) -> Self {
        Key(key.into())
    }

    /// The key as written.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Interpret the key as an array index.
    ///
    /// Only canonical non-negative integers qualify: `"0"`, `"12"`, but not
    /// `"012"`, `"-1"` or `"+3"`.
    pub fn as_index(&self) -> Option<usize> {
        let s = self.0.as_str();
        if s.is_empty() || (s.len() > 1 && s.starts_with('0')) {
            return None;
        }
        if !s.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        s.parse().ok()
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Key(s)
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key(s.to_owned())
    }
}

impl From<&String> for Key {
    fn from(s: &String) -> Self {
        Key(s.clone())
    }
}

impl From<&Key> for Key {
    fn from(k: &Key) -> Self {
        k.clone()
    }
}

impl From<usize> for Key {
    fn from(i: usize) -> Self {
        Key(i.to_string())
    }
}

impl AsRef<str> for Key {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A location inside a document, relative to its root key.
///
/// Paths only grow while a cursor is being built; terminal operations take
/// their own copy, so sibling cursors never observe each other's segments.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Path(Vec<Key>);

impl Path {
    /// The empty path, addressing the whole document.
    #[inline]
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Build a path from anything that yields keys.
    pub fn from_keys<I, K>(keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<Key>,
    {
        Self(keys.into_iter().map(Into::into).collect())
    }

    /// A new path with `key` appended. `self` is left untouched.
    #[inline]
    pub fn child(&self, key: impl Into<Key>) -> Self {
        let mut keys = Vec::with_capacity(self.0.len() + 1);
        keys.extend(self.0.iter().cloned());
        keys.push(key.into());
        Self(keys)
    }

    /// Get the keys of this path.
    #[inline]
    pub fn keys(&self) -> &[Key] {
        &self.0
    }

    /// Check if this path is empty (root).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Get the number of keys in this path.
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Get the last key.
    #[inline]
    pub fn last(&self) -> Option<&Key> {
        self.0.last()
    }

    /// Iterate over the keys.
    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'_, Key> {
        self.0.iter()
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("<root>");
        }
        for (i, key) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{}", key)?;
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a Path {
    type Item = &'a Key;
    type IntoIter = std::slice::Iter<'a, Key>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
