use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Partial article metadata scraped from a listing page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArticleStub {
    pub title: String,
    /// Absolute, canonical article URL.
    pub url: String,
    /// ISO-8601 when the page value could be parsed, otherwise the raw text.
    pub published_at: Option<String>,
    pub comments_count: Option<u32>,
    pub rating: Option<f64>,
}

impl ArticleStub {
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            ..Default::default()
        }
    }
}

/// A fully extracted article, ready to be inserted into storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleRecord {
    pub guid: String,
    pub title: Option<String>,
    pub description: String,
    pub url: String,
    pub published_at: Option<String>,
    pub comments_count: Option<u32>,
    pub rating: Option<f64>,
}

impl ArticleRecord {
    /// Builds a record from a stub with a freshly generated guid. Metadata
    /// starts from the stub's values; scrapers override what the article page
    /// carries.
    pub fn from_stub(stub: &ArticleStub, description: String) -> Self {
        Self {
            guid: Uuid::new_v4().to_string(),
            title: Some(stub.title.clone()).filter(|t| !t.is_empty()),
            description,
            url: stub.url.clone(),
            published_at: stub.published_at.clone(),
            comments_count: stub.comments_count,
            rating: stub.rating,
        }
    }
}

/// A record as persisted by a storage backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredArticle {
    pub id: i64,
    /// Unix seconds, assigned by the store on insert.
    pub created_at: i64,
    #[serde(flatten)]
    pub article: ArticleRecord,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_stub_copies_metadata() {
        let stub = ArticleStub {
            title: "Title".to_string(),
            url: "https://example.com/a".to_string(),
            published_at: Some("2024-03-01T10:00:00".to_string()),
            comments_count: Some(4),
            rating: Some(-2.0),
        };
        let record = ArticleRecord::from_stub(&stub, "Body text".to_string());
        assert_eq!(record.title.as_deref(), Some("Title"));
        assert_eq!(record.url, stub.url);
        assert_eq!(record.published_at, stub.published_at);
        assert_eq!(record.comments_count, Some(4));
        assert_eq!(record.rating, Some(-2.0));
        assert!(Uuid::parse_str(&record.guid).is_ok());
    }

    #[test]
    fn test_from_stub_generates_fresh_guids() {
        let stub = ArticleStub::new("", "https://example.com/a");
        let a = ArticleRecord::from_stub(&stub, "x".to_string());
        let b = ArticleRecord::from_stub(&stub, "x".to_string());
        assert_ne!(a.guid, b.guid);
        assert_eq!(a.title, None);
    }
}
