use async_trait::async_trait;
use std::collections::HashMap;
use crate::Result;

/// Request headers sent along with a fetch
pub type Headers = HashMap<String, String>;

#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetches the document at `url`.
    ///
    /// Network errors and non-success statuses are both reported as `Err`;
    /// callers treat them uniformly as "page unavailable".
    async fn fetch(&self, url: &str, headers: &Headers) -> Result<String>;
}
