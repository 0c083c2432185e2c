use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Series value meaning "not part of a series"
pub const STANDALONE_SERIES: &str = "Standalone";

pub const CARD_PLACEHOLDER_COVER: &str = "https://placehold.co/150x200?text=Cover+Not+Available";
pub const DETAIL_PLACEHOLDER_COVER: &str =
    "https://placehold.co/300x400?text=Cover+Not+Available";
pub const NO_DESCRIPTION: &str = "No description available.";

const CARD_TITLE_MAX_CHARS: usize = 50;
const CARD_AUTHOR_MAX_CHARS: usize = 30;
const CARD_MAX_GENRES: usize = 3;

/// Catalog item, keyed by ISBN
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Book {
    pub isbn: String,
    pub title: String,
    pub author: String,
    pub year: i32,
    pub publisher: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub series: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl Book {
    /// Series name, `None` for standalone books
    pub fn series_name(&self) -> Option<&str> {
        self.series
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty() && *s != STANDALONE_SERIES)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserRecord {
    pub user_id: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub age: Option<u32>,
}

/// Grid card for one recommended book
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BookCard {
    pub isbn: String,
    pub title: String,
    pub author: String,
    pub genres: Vec<String>,
    pub cover_url: String,
}

impl From<&Book> for BookCard {
    fn from(book: &Book) -> Self {
        Self {
            isbn: book.isbn.clone(),
            title: truncate_with_ellipsis(&book.title, CARD_TITLE_MAX_CHARS),
            author: truncate_with_ellipsis(&book.author, CARD_AUTHOR_MAX_CHARS),
            genres: book.genres.iter().take(CARD_MAX_GENRES).cloned().collect(),
            cover_url: cover_or(book, CARD_PLACEHOLDER_COVER),
        }
    }
}

/// Full record for the detail view, optional fields already resolved
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BookDetail {
    pub isbn: String,
    pub title: String,
    pub author: String,
    pub genres: Vec<String>,
    pub series: Option<String>,
    pub description: String,
    pub has_description: bool,
    pub cover_url: String,
    pub year: i32,
    pub publisher: String,
    pub published: String,
}

impl From<&Book> for BookDetail {
    fn from(book: &Book) -> Self {
        let description = book
            .description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty());

        Self {
            isbn: book.isbn.clone(),
            title: book.title.clone(),
            author: book.author.clone(),
            genres: book.genres.clone(),
            series: book.series_name().map(str::to_string),
            description: description.unwrap_or(NO_DESCRIPTION).to_string(),
            has_description: description.is_some(),
            cover_url: cover_or(book, DETAIL_PLACEHOLDER_COVER),
            year: book.year,
            publisher: book.publisher.clone(),
            published: format!("Published in {} by {}", book.year, book.publisher),
        }
    }
}

fn cover_or(book: &Book, placeholder: &str) -> String {
    book.image_url
        .as_deref()
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .unwrap_or(placeholder)
        .to_string()
}

/// Cut `text` to at most `max_chars` characters, ending in "..." when shortened.
pub fn truncate_with_ellipsis(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let keep = max_chars.saturating_sub(3);
    let mut out: String = text.chars().take(keep).collect();
    out.push_str("...");
    out
}

/// Satisfaction scale offered on the feedback form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rating {
    Excellent,
    Good,
    Fair,
    Bad,
    Horrible,
}

impl Rating {
    pub const ALL: [Rating; 5] = [
        Rating::Excellent,
        Rating::Good,
        Rating::Fair,
        Rating::Bad,
        Rating::Horrible,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Rating::Excellent => "Excellent! Perfect matches!",
            Rating::Good => "Good! Mostly relevant",
            Rating::Fair => "Fair. Got some good suggestions",
            Rating::Bad => "Bad. Not what I wanted",
            Rating::Horrible => "Horrible. Completely off",
        }
    }

    pub fn score(&self) -> u8 {
        match self {
            Rating::Excellent => 5,
            Rating::Good => 4,
            Rating::Fair => 3,
            Rating::Bad => 2,
            Rating::Horrible => 1,
        }
    }

    /// Exact-match lookup; no trimming or case folding.
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.label() == label)
    }
}

/// One appended feedback row. Write-once.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FeedbackRecord {
    pub timestamp: DateTime<Utc>,
    pub identity: String,
    pub rating: u8,
    pub comment: String,
    pub schema_version: String,
}

impl FeedbackRecord {
    /// Cell values in sheet column order.
    pub fn to_row(&self) -> Vec<serde_json::Value> {
        vec![
            serde_json::Value::String(self.timestamp.to_rfc3339_opts(SecondsFormat::Micros, true)),
            serde_json::Value::String(self.identity.clone()),
            serde_json::Value::from(self.rating),
            serde_json::Value::String(self.comment.clone()),
            serde_json::Value::String(self.schema_version.clone()),
        ]
    }
}
