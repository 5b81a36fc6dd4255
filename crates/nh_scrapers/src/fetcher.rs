use async_trait::async_trait;
use nh_core::{CrawlConfig, Error, Fetcher, Headers, Result};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// `Fetcher` backed by a shared reqwest client.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &CrawlConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self { client })
    }
}

fn header_map(headers: &Headers) -> Result<HeaderMap> {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| Error::Scraping(format!("Invalid header name {}: {}", name, e)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| Error::Scraping(format!("Invalid header value for {}: {}", name, e)))?;
        map.insert(name, value);
    }
    Ok(map)
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str, headers: &Headers) -> Result<String> {
        debug!(%url, "GET");
        let response = self
            .client
            .get(url)
            .headers(header_map(headers)?)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.text().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_map() {
        let mut headers = Headers::new();
        headers.insert("User-Agent".to_string(), "nh-test".to_string());
        headers.insert("Accept-Language".to_string(), "ru-RU,ru;q=0.9".to_string());
        let map = header_map(&headers).unwrap();
        assert_eq!(map.get("user-agent").unwrap(), "nh-test");
        assert_eq!(map.len(), 2);

        headers.insert("Bad Header".to_string(), "x".to_string());
        assert!(header_map(&headers).is_err());
    }

    #[test]
    fn test_new_client() {
        assert!(HttpFetcher::new(&CrawlConfig::default()).is_ok());
    }
}
