//! Tag names and tag paths.

use std::fmt;

use compact_str::CompactString;
use serde::{Deserialize, Serialize};

/// Separator between tags in a tag path such as `//work//urgent//`.
pub const TAG_SEPARATOR: &str = "//";

/// The name of a tag: a directory directly below the home root.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagName(CompactString);

impl TagName {
    /// Create a tag name.
    pub fn new(name: impl Into<CompactString>) -> Self {
        Self(name.into())
    }

    /// The tag name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TagName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TagName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for TagName {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

impl AsRef<str> for TagName {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl PartialEq<str> for TagName {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

/// An ordered list of tags forming a virtual path.
///
/// Order only matters for display; membership queries treat the set as
/// unordered. Duplicates are dropped on insertion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TagSet(Vec<TagName>);

impl TagSet {
    /// Create an empty tag set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a `//tag1//tag2//` path. Empty segments are ignored.
    pub fn parse(text: &str) -> Self {
        text.trim()
            .split(TAG_SEPARATOR)
            .map(|segment| segment.trim_matches('/'))
            .filter(|segment| !segment.is_empty())
            .map(TagName::from)
            .collect()
    }

    /// Whether `text` looks like a tag path rather than a filesystem path.
    pub fn is_tag_path(text: &str) -> bool {
        text.trim_start().starts_with(TAG_SEPARATOR)
    }

    /// Append a tag unless it is already present.
    pub fn push(&mut self, tag: TagName) {
        if !self.contains(&tag) {
            self.0.push(tag);
        }
    }

    /// Return a copy of this set with `tag` appended.
    pub fn with(&self, tag: TagName) -> Self {
        let mut set = self.clone();
        set.push(tag);
        set
    }

    /// Whether `tag` is part of the set.
    pub fn contains(&self, tag: &TagName) -> bool {
        self.0.iter().any(|t| t == tag)
    }

    /// Number of tags.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the set has no tags.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The first tag, which scopes an enumeration.
    pub fn first(&self) -> Option<&TagName> {
        self.0.first()
    }

    /// Iterate over tags in display order.
    pub fn iter(&self) -> std::slice::Iter<'_, TagName> {
        self.0.iter()
    }

    /// Human-readable title, e.g. `work + urgent`.
    pub fn title(&self) -> String {
        self.0
            .iter()
            .map(TagName::as_str)
            .collect::<Vec<_>>()
            .join(" + ")
    }
}

impl FromIterator<TagName> for TagSet {
    fn from_iter<I: IntoIterator<Item = TagName>>(iter: I) -> Self {
        let mut set = Self::new();
        for tag in iter {
            set.push(tag);
        }
        set
    }
}

impl<'a> IntoIterator for &'a TagSet {
    type Item = &'a TagName;
    type IntoIter = std::slice::Iter<'a, TagName>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for TagSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(TAG_SEPARATOR)?;
        for tag in &self.0 {
            write!(f, "{tag}{TAG_SEPARATOR}")?;
        }
        Ok(())
    }
}
