// ── Hierarchical store paths ──
//
// A path is an ordered list of non-empty key segments. Keys follow the
// realtime-database rules: no `.`, `$`, `#`, `[`, `]`, `/` or control
// characters, so a rendered path always parses back to the same segments.

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

const FORBIDDEN: &[char] = &['.', '$', '#', '[', ']', '/'];

/// Check that `key` is usable as a single path segment.
pub fn validate_key(key: &str) -> Result<(), Error> {
    if key.is_empty() {
        return Err(Error::InvalidPath {
            path: key.to_owned(),
            reason: "empty segment".into(),
        });
    }
    if let Some(c) = key
        .chars()
        .find(|c| FORBIDDEN.contains(c) || c.is_control())
    {
        return Err(Error::InvalidPath {
            path: key.to_owned(),
            reason: format!("forbidden character {c:?}"),
        });
    }
    Ok(())
}

/// Location of a subtree in the store, e.g. `devices/dev-1/current`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StorePath(Vec<String>);

impl StorePath {
    /// The store root.
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Build a path from pre-validated segments.
    pub fn from_segments<I, S>(segments: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        for segment in &segments {
            validate_key(segment)?;
        }
        Ok(Self(segments))
    }

    /// Append a child segment.
    ///
    /// Callers pass constants or identifiers that were validated on
    /// construction; use [`try_child`](Self::try_child) for raw input.
    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment.into());
        Self(segments)
    }

    /// Append a child segment after validating it.
    pub fn try_child(&self, segment: &str) -> Result<Self, Error> {
        validate_key(segment)?;
        Ok(self.child(segment))
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Last segment, if any.
    pub fn key(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    pub fn parent(&self) -> Option<Self> {
        if self.0.is_empty() {
            return None;
        }
        Some(Self(self.0[..self.0.len() - 1].to_vec()))
    }

    /// `true` if `self` equals `other` or contains it.
    pub fn is_ancestor_of(&self, other: &Self) -> bool {
        other.0.len() >= self.0.len() && other.0[..self.0.len()] == self.0[..]
    }

    /// `true` if a write to one of the paths can change the value at the other.
    pub fn overlaps(&self, other: &Self) -> bool {
        self.is_ancestor_of(other) || other.is_ancestor_of(self)
    }
}

impl fmt::Display for StorePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("/"))
    }
}

impl FromStr for StorePath {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim_matches('/');
        if trimmed.is_empty() {
            return Ok(Self::root());
        }
        Self::from_segments(trimmed.split('/'))
    }
}
