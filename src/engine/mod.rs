//! Blocking search backend contract.
//!
//! A [`SearchEngine`] is synchronous and may produce results lazily. It is
//! shared between worker threads, so implementations must be `Send + Sync`.

use crate::pool::PoolError;
use crate::types::SearchOptions;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;

pub mod searxng;

pub use searxng::{NetworkOptions, SearxngClient};

/// One search hit as a flat mapping of named fields.
pub type Record = Map<String, Value>;

/// Lazily produced search hits. Fetch failures surface as `Err` items.
pub type Records = Box<dyn Iterator<Item = Result<Record, SearchError>> + Send>;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("search backend request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("search backend returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("invalid search backend configuration: {0}")]
    Config(String),
    #[error(transparent)]
    Pool(#[from] PoolError),
    #[error("{0}")]
    Backend(String),
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Text,
    Images,
    Videos,
    News,
    Books,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Text,
        Category::Images,
        Category::Videos,
        Category::News,
        Category::Books,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Text => "text",
            Category::Images => "images",
            Category::Videos => "videos",
            Category::News => "news",
            Category::Books => "books",
        }
    }

    /// Field a record of this category must carry to be returned.
    pub fn mandatory_field(&self) -> &'static str {
        match self {
            Category::Text => "href",
            Category::Images => "image",
            Category::Videos => "content",
            Category::News | Category::Books => "url",
        }
    }

    pub fn accepts(&self, record: &Record) -> bool {
        match record.get(self.mandatory_field()) {
            None | Some(Value::Null) => false,
            Some(Value::String(s)) => !s.is_empty(),
            Some(_) => true,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A synchronous search client with one method per category.
pub trait SearchEngine: Send + Sync + 'static {
    fn text(&self, query: &str, options: &SearchOptions) -> Result<Records, SearchError>;
    fn images(&self, query: &str, options: &SearchOptions) -> Result<Records, SearchError>;
    fn videos(&self, query: &str, options: &SearchOptions) -> Result<Records, SearchError>;
    fn news(&self, query: &str, options: &SearchOptions) -> Result<Records, SearchError>;
    fn books(&self, query: &str, options: &SearchOptions) -> Result<Records, SearchError>;

    fn search(
        &self,
        category: Category,
        query: &str,
        options: &SearchOptions,
    ) -> Result<Records, SearchError> {
        match category {
            Category::Text => self.text(query, options),
            Category::Images => self.images(query, options),
            Category::Videos => self.videos(query, options),
            Category::News => self.news(query, options),
            Category::Books => self.books(query, options),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_mandatory_field_filter() {
        let keep = testing::to_record(&json!({"title": "Rust", "href": "https://rust-lang.org"}));
        let missing = testing::to_record(&json!({"title": "Rust", "body": "no link"}));
        let empty = testing::to_record(&json!({"title": "Rust", "href": ""}));
        let null = testing::to_record(&json!({"title": "Rust", "href": null}));

        assert!(Category::Text.accepts(&keep));
        assert!(!Category::Text.accepts(&missing));
        assert!(!Category::Text.accepts(&empty));
        assert!(!Category::Text.accepts(&null));
    }

    #[test]
    fn test_mandatory_fields_per_category() {
        let image = testing::to_record(&json!({"title": "crab", "url": "https://example.com"}));
        assert!(!Category::Images.accepts(&image), "image url is required, page url is not");
        assert!(Category::News.accepts(&image));
        assert!(Category::Books.accepts(&image));
        assert!(!Category::Videos.accepts(&image));
    }

    #[test]
    fn test_category_names() {
        let names: Vec<_> = Category::ALL.iter().map(Category::to_string).collect();
        assert_eq!(names, ["text", "images", "videos", "news", "books"]);
        assert_eq!(serde_json::to_value(Category::News).unwrap(), json!("news"));
    }
}
