use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::tree::{Article, render_markdown};

/// Average reading speed used for the "min read" estimate.
pub const WORDS_PER_MINUTE: usize = 200;

/// A published post. Highlights refer to it only by `slug`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub slug: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Markdown body.
    pub content: String,
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub is_ai_generated: bool,
}

impl Post {
    /// A post whose slug is derived from its title.
    pub fn new(title: impl Into<String>, content: impl Into<String>, date: DateTime<Utc>) -> Self {
        let title = title.into();
        Self {
            slug: slugify(&title),
            title,
            description: String::new(),
            content: content.into(),
            date,
            tags: Vec::new(),
            is_ai_generated: false,
        }
    }

    pub fn render(&self) -> Article {
        render_markdown(&self.content)
    }

    pub fn reading_time_minutes(&self) -> usize {
        reading_time_minutes(&self.content)
    }
}

/// URL slug for a title: lowercase, whitespace runs become `-`, anything
/// other than ASCII word characters and `-` is dropped, dashes are collapsed and
/// trimmed.
pub fn slugify(text: &str) -> String {
    static WHITESPACE: OnceLock<Regex> = OnceLock::new();
    static NON_WORD: OnceLock<Regex> = OnceLock::new();
    static DASHES: OnceLock<Regex> = OnceLock::new();

    let whitespace = WHITESPACE.get_or_init(|| Regex::new(r"\s+").expect("Invalid whitespace regex"));
    let non_word =
        NON_WORD.get_or_init(|| Regex::new(r"[^A-Za-z0-9_-]+").expect("Invalid non-word regex"));
    let dashes = DASHES.get_or_init(|| Regex::new(r"-{2,}").expect("Invalid dash regex"));

    let lower = text.trim().to_lowercase();
    let dashed = whitespace.replace_all(&lower, "-");
    let cleaned = non_word.replace_all(&dashed, "");
    let collapsed = dashes.replace_all(&cleaned, "-");
    collapsed.trim_matches('-').to_string()
}

/// Whole minutes needed to read `content`, never less than one.
pub fn reading_time_minutes(content: &str) -> usize {
    let words = content.split_whitespace().count();
    words.div_ceil(WORDS_PER_MINUTE).max(1)
}
