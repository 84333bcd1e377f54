use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Highlight colors offered by the floating color picker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HighlightColor {
    /// Records written before colors existed carry no color and mean yellow.
    #[default]
    Yellow,
    Green,
}

impl HighlightColor {
    pub const ALL: [HighlightColor; 2] = [HighlightColor::Yellow, HighlightColor::Green];

    pub fn as_str(&self) -> &'static str {
        match self {
            HighlightColor::Yellow => "yellow",
            HighlightColor::Green => "green",
        }
    }

    /// Presentation class put on the highlight element.
    pub fn css_class(&self) -> &'static str {
        match self {
            HighlightColor::Yellow => "highlight highlight-yellow",
            HighlightColor::Green => "highlight highlight-green",
        }
    }
}

impl fmt::Display for HighlightColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque highlight identity.
///
/// Generated on the client as a random UUID v4; the store may hand back a
/// different string, which is logged but never replaces the local id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HighlightId(String);

impl HighlightId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Fresh 128-bit random identity.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for HighlightId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for HighlightId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Child-index steps from the article root down to a node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnchorPath(Vec<usize>);

impl AnchorPath {
    pub fn new(steps: Vec<usize>) -> Self {
        Self(steps)
    }

    pub fn steps(&self) -> &[usize] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<usize>> for AnchorPath {
    fn from(steps: Vec<usize>) -> Self {
        Self(steps)
    }
}

impl fmt::Display for AnchorPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

/// Storage form of a range: two anchor paths plus their offsets.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HighlightRange {
    pub start_path: AnchorPath,
    pub start_offset: usize,
    pub end_path: AnchorPath,
    pub end_offset: usize,
}

impl HighlightRange {
    pub fn new(
        start_path: impl Into<AnchorPath>,
        start_offset: usize,
        end_path: impl Into<AnchorPath>,
        end_offset: usize,
    ) -> Self {
        Self {
            start_path: start_path.into(),
            start_offset,
            end_path: end_path.into(),
            end_offset,
        }
    }
}

/// A reader's highlight on one post.
///
/// Created once when the reader commits a selection and never mutated
/// afterwards. `text` is a snapshot of the selected words at creation time;
/// replay never re-derives it from the range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Highlight {
    pub id: HighlightId,
    pub article_slug: String,
    pub text: String,
    #[serde(default)]
    pub color: HighlightColor,
    pub range: HighlightRange,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

impl Highlight {
    /// A new highlight stamped with a fresh id and the current time.
    pub fn create(
        article_slug: impl Into<String>,
        text: impl Into<String>,
        color: HighlightColor,
        range: HighlightRange,
    ) -> Self {
        Self {
            id: HighlightId::generate(),
            article_slug: article_slug.into(),
            text: text.into(),
            color,
            range,
            created_at: Utc::now(),
        }
    }
}
