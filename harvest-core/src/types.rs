//! The post record written to CSV and the policy for cells a post does not carry.

use serde::{Deserialize, Serialize};

/// Column order of every post CSV produced by the collector.
pub const CSV_HEADER: [&str; 14] = [
    "title",
    "score",
    "upvote_ratio",
    "num_comments",
    "author",
    "subreddit",
    "url",
    "permalink",
    "created_utc",
    "is_self",
    "selftext",
    "flair",
    "domain",
    "search_query",
];

pub const PERMALINK_BASE: &str = "https://reddit.com";
pub const SELFTEXT_LIMIT: usize = 1000;
pub const ELLIPSIS: &str = "...";

/// Author text written for deleted accounts when placeholders are in use.
pub const DELETED_AUTHOR: &str = "[deleted]";
pub const NOT_AVAILABLE: &str = "N/A";

/// How a record renders fields the source post did not provide.
///
/// Popularity collection writes `N/A` (and `[deleted]` for a missing author) while
/// keyword collection leaves the cell empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingValue {
    Placeholder,
    Empty,
}

impl MissingValue {
    fn optional(self) -> String {
        match self {
            MissingValue::Placeholder => NOT_AVAILABLE.to_string(),
            MissingValue::Empty => String::new(),
        }
    }

    fn author(self) -> String {
        match self {
            MissingValue::Placeholder => DELETED_AUTHOR.to_string(),
            MissingValue::Empty => String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostRecord {
    pub title: String,
    pub score: i64,
    pub upvote_ratio: Option<f64>,
    pub num_comments: u64,
    pub author: Option<String>,
    pub subreddit: String,
    pub url: String,
    pub permalink: String,
    pub created_utc: Option<f64>,
    pub is_self: Option<bool>,
    pub selftext: Option<String>,
    pub flair: Option<String>,
    pub domain: Option<String>,
    /// Forum name for popularity fetches, keyword for search fetches.
    pub search_query: String,
}

impl PostRecord {
    /// Renders the record as one CSV row in [`CSV_HEADER`] order.
    pub fn to_row(&self, missing: MissingValue) -> Vec<String> {
        let opt = |value: Option<String>| value.unwrap_or_else(|| missing.optional());

        vec![
            self.title.clone(),
            self.score.to_string(),
            opt(self.upvote_ratio.map(|r| r.to_string())),
            self.num_comments.to_string(),
            self.author.clone().unwrap_or_else(|| missing.author()),
            self.subreddit.clone(),
            self.url.clone(),
            self.permalink.clone(),
            opt(self.created_utc.map(|t| t.to_string())),
            opt(self.is_self.map(|s| s.to_string())),
            opt(self.selftext.as_deref().map(truncate_selftext)),
            opt(self.flair.clone()),
            opt(self.domain.clone()),
            self.search_query.clone(),
        ]
    }
}

pub fn permalink_url(path: &str) -> String {
    format!("{}{}", PERMALINK_BASE, path)
}

/// Cuts body text to [`SELFTEXT_LIMIT`] characters and marks the cut with [`ELLIPSIS`].
pub fn truncate_selftext(text: &str) -> String {
    match text.char_indices().nth(SELFTEXT_LIMIT) {
        Some((cut, _)) => format!("{}{}", &text[..cut], ELLIPSIS),
        None => text.to_string(),
    }
}
