pub mod redact;

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use uuid::Uuid;

/// Identifies one invocation of a flow. Used to group snapshots and logs.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct RunId(pub String);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// First eight characters, enough to tell runs apart in file names.
    pub fn short(&self) -> &str {
        let end = self
            .0
            .char_indices()
            .nth(8)
            .map(|(idx, _)| idx)
            .unwrap_or(self.0.len());
        &self.0[..end]
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Predicate used to find DOM elements.
///
/// `Text` matches elements of `tag` whose visible text contains `phrase`.
/// `Attribute` matches elements of `tag` whose attribute `name` contains
/// `contains`.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum AnchorDescriptor {
    Css(String),
    Text { tag: String, phrase: String },
    XPath(String),
    Attribute {
        tag: String,
        name: String,
        contains: String,
    },
}

impl AnchorDescriptor {
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    pub fn text(tag: impl Into<String>, phrase: impl Into<String>) -> Self {
        Self::Text {
            tag: tag.into(),
            phrase: phrase.into(),
        }
    }

    pub fn xpath(expr: impl Into<String>) -> Self {
        Self::XPath(expr.into())
    }

    pub fn attribute(
        tag: impl Into<String>,
        name: impl Into<String>,
        contains: impl Into<String>,
    ) -> Self {
        Self::Attribute {
            tag: tag.into(),
            name: name.into(),
            contains: contains.into(),
        }
    }

    /// CSS rendering for descriptors that have one.
    pub fn to_css(&self) -> Option<String> {
        match self {
            Self::Css(selector) => Some(selector.clone()),
            Self::Attribute {
                tag,
                name,
                contains,
            } => Some(format!("{tag}[{name}*=\"{}\"]", contains.replace('"', "\\\""))),
            Self::Text { .. } | Self::XPath(_) => None,
        }
    }
}

impl fmt::Display for AnchorDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Css(selector) => write!(f, "css:{selector}"),
            Self::Text { tag, phrase } => write!(f, "text:{tag}~'{phrase}'"),
            Self::XPath(expr) => write!(f, "xpath:{expr}"),
            Self::Attribute {
                tag,
                name,
                contains,
            } => write!(f, "attr:{tag}[{name}*='{contains}']"),
        }
    }
}

/// Location of a captured diagnostic image.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SnapshotRef(pub PathBuf);

impl SnapshotRef {
    pub fn path(&self) -> &Path {
        &self.0
    }
}

impl fmt::Display for SnapshotRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

/// Whole milliseconds of `d`, saturating at `u64::MAX`.
pub fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
