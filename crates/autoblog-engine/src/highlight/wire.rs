//! JSON bodies of the `/interactions` endpoint.
//!
//! | Method | Path | Body | Response |
//! |--------|------|------|----------|
//! | GET  | `/interactions?slug={slug}` | - | [`ListHighlightsResponse`] |
//! | POST | `/interactions` | [`CreateHighlightRequest`] | [`CreateHighlightResponse`] |
//!
//! Failures come back as a non-2xx status with an [`ErrorBody`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Highlight, HighlightColor, HighlightId, HighlightRange};

pub const INTERACTIONS_PATH: &str = "/interactions";

/// A highlight as it travels over the wire. The owning slug is implied by
/// the request rather than repeated per record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HighlightPayload {
    pub id: HighlightId,
    pub text: String,
    pub range: HighlightRange,
    #[serde(default)]
    pub color: HighlightColor,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

impl HighlightPayload {
    pub fn into_highlight(self, article_slug: &str) -> Highlight {
        Highlight {
            id: self.id,
            article_slug: article_slug.to_string(),
            text: self.text,
            color: self.color,
            range: self.range,
            created_at: self.created_at,
        }
    }
}

impl From<&Highlight> for HighlightPayload {
    fn from(highlight: &Highlight) -> Self {
        Self {
            id: highlight.id.clone(),
            text: highlight.text.clone(),
            range: highlight.range.clone(),
            color: highlight.color,
            created_at: highlight.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListHighlightsResponse {
    #[serde(default)]
    pub highlights: Vec<HighlightPayload>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateHighlightRequest {
    pub slug: String,
    pub highlight: HighlightPayload,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateHighlightResponse {
    pub success: bool,
    pub highlight: HighlightPayload,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
