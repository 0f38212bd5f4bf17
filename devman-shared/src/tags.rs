use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const TAG_PREFIX: &str = "tag:";

/// Ensure a tag carries the `tag:` prefix. Already-prefixed tags pass through.
pub fn normalize_tag(tag: &str) -> String {
    let tag = tag.trim();
    if tag.starts_with(TAG_PREFIX) {
        tag.to_string()
    } else {
        format!("{TAG_PREFIX}{tag}")
    }
}

/// Set of normalized tags. Every member carries the `tag:` prefix.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagSet(BTreeSet<String>);

impl TagSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a comma-separated list such as `web, tag:db,,ci`.
    /// Blank entries and entries with an empty name (`tag:`) are dropped.
    pub fn parse(list: &str) -> Self {
        list.split(',').collect()
    }

    /// Insert `tag` normalized. Returns `false` for duplicates and for tags without a name.
    pub fn insert(&mut self, tag: &str) -> bool {
        let tag = normalize_tag(tag);
        if tag[TAG_PREFIX.len()..].trim().is_empty() {
            return false;
        }
        self.0.insert(tag)
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.0.contains(&normalize_tag(tag))
    }

    pub fn union(&self, other: &TagSet) -> TagSet {
        TagSet(self.0.union(&other.0).cloned().collect())
    }

    pub fn difference(&self, other: &TagSet) -> TagSet {
        TagSet(self.0.difference(&other.0).cloned().collect())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Sorted sequence, the shape the registry expects.
    pub fn to_vec(&self) -> Vec<String> {
        self.0.iter().cloned().collect()
    }
}

impl<S: AsRef<str>> FromIterator<S> for TagSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = TagSet::new();
        for tag in iter {
            set.insert(tag.as_ref());
        }
        set
    }
}

impl fmt::Display for TagSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = self.to_vec().join(", ");
        f.write_str(&joined)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagAction {
    Add,
    Remove,
}

impl fmt::Display for TagAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagAction::Add => f.write_str("add"),
            TagAction::Remove => f.write_str("remove"),
        }
    }
}

/// Why a tag change was refused before anything was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TagRejection {
    #[error("device has no tags to remove")]
    NoTags,
    #[error("removing would leave the device without tags")]
    LastTag,
}

impl TagAction {
    /// Compute the replacement tag set for `current` given the `requested` tags.
    ///
    /// Removal never yields an empty set: a device with no tags, a single tag,
    /// or a request covering every current tag is rejected.
    pub fn plan(self, current: &TagSet, requested: &TagSet) -> Result<TagSet, TagRejection> {
        match self {
            TagAction::Add => Ok(current.union(requested)),
            TagAction::Remove => {
                if current.is_empty() {
                    return Err(TagRejection::NoTags);
                }
                if current.len() == 1 {
                    return Err(TagRejection::LastTag);
                }
                let next = current.difference(requested);
                if next.is_empty() {
                    return Err(TagRejection::LastTag);
                }
                Ok(next)
            }
        }
    }

    /// Tags that actually changed between the pre-image and the verified state.
    pub fn delta(self, before: &TagSet, after: &TagSet) -> TagSet {
        match self {
            TagAction::Add => after.difference(before),
            TagAction::Remove => before.difference(after),
        }
    }
}
