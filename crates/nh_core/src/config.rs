//! Runtime configuration.
//!
//! Everything has a built-in default; a YAML file may override any part of
//! it. Site tables live here so scrapers receive them at construction
//! instead of reading global state.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::path::Path;
use crate::Result;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub crawl: CrawlConfig,
    pub extraction: ExtractionConfig,
    pub cleaner: CleanerConfig,
    pub sources: Vec<SourceConfig>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            crawl: CrawlConfig::default(),
            extraction: ExtractionConfig::default(),
            cleaner: CleanerConfig::default(),
            sources: builtin_sources(),
        }
    }
}

impl Settings {
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&raw)
    }

    pub fn source(&self, name: &str) -> Option<&SourceConfig> {
        self.sources.iter().find(|s| s.name == name)
    }
}

/// Limits and politeness settings for the crawl loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlConfig {
    /// Listing pages consumed per source
    pub max_pages: usize,
    /// Stubs processed per listing page
    pub max_articles_per_page: usize,
    pub requests_per_second: f64,
    pub request_timeout_secs: u64,
    pub user_agents: Vec<String>,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            max_pages: 1,
            max_articles_per_page: 10,
            requests_per_second: 1.0,
            request_timeout_secs: 30,
            user_agents: [
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
                "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36 Edg/120.0.0.0",
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

/// Thresholds shared by all scrapers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Paragraphs shorter than this are ignored in article bodies
    pub min_paragraph_length: usize,
    pub min_description_length: usize,
    pub min_title_length: usize,
    /// Only lines longer than this are candidates for headline removal
    pub min_normalized_line_length: usize,
    pub title_match_min_words: usize,
    pub title_match_threshold: f64,
    /// How many leading lines are checked for a repeated headline
    pub title_match_lines: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            min_paragraph_length: 30,
            min_description_length: 20,
            min_title_length: 5,
            min_normalized_line_length: 20,
            title_match_min_words: 3,
            title_match_threshold: 0.6,
            title_match_lines: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanerConfig {
    /// Media and navigation nodes removed from every fragment before text is collected
    pub remove_selectors: Vec<String>,
    pub block_selector: String,
    pub min_block_length: usize,
    /// A block starting with one of these ends the document
    pub stop_keywords: Vec<String>,
}

impl Default for CleanerConfig {
    fn default() -> Self {
        Self {
            remove_selectors: strings(&[
                "video", "audio", "iframe", "picture", "img", "svg", "figure", "script", "style",
                "noscript", "nav", "ul", "ol",
            ]),
            block_selector: "p, div".to_string(),
            min_block_length: 10,
            stop_keywords: strings(&["теги", "хабы", "источник", "source:"]),
        }
    }
}

/// Everything a scraper needs to know about one site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub name: String,
    /// First listing page
    pub base_url: String,
    /// Suffix appended to `base_url` for page `{i}` (2, 3, ...). Sources
    /// without one are paginated by date instead.
    #[serde(default)]
    pub page_pattern: Option<String>,
    /// Scheme and host used to resolve relative links
    pub domain: String,
    /// Tried in order; the first match is the article body
    #[serde(default)]
    pub article_selectors: Vec<String>,
    #[serde(default = "default_article_block_selector")]
    pub block_selector: String,
    #[serde(default)]
    pub remove_selectors: Vec<String>,
    /// Paragraphs containing one of these are treated as metadata
    #[serde(default)]
    pub meta_keywords: Vec<String>,
    /// Tried in order; the first element containing a number wins
    #[serde(default)]
    pub comment_selectors: Vec<String>,
    #[serde(default)]
    pub rating_selector: Option<String>,
    /// Drop a leading paragraph that repeats the headline
    #[serde(default)]
    pub strip_title_echo: bool,
}

fn default_article_block_selector() -> String {
    "p".to_string()
}

impl SourceConfig {
    pub fn new(name: &str, base_url: &str, page_pattern: Option<&str>, domain: &str) -> Self {
        Self {
            name: name.to_string(),
            base_url: base_url.to_string(),
            page_pattern: page_pattern.map(String::from),
            domain: domain.to_string(),
            article_selectors: Vec::new(),
            block_selector: default_article_block_selector(),
            remove_selectors: Vec::new(),
            meta_keywords: Vec::new(),
            comment_selectors: Vec::new(),
            rating_selector: None,
            strip_title_echo: false,
        }
    }

    /// Listing URLs for the first `pages` pages, newest first.
    pub fn listing_urls(&self, pages: usize, today: NaiveDate) -> Vec<String> {
        match &self.page_pattern {
            Some(pattern) => (1..=pages)
                .map(|i| {
                    if i == 1 {
                        self.base_url.clone()
                    } else {
                        format!("{}{}", self.base_url, pattern.replace("{i}", &i.to_string()))
                    }
                })
                .collect(),
            None => (0..pages)
                .map(|offset| {
                    let day = today - Duration::days(offset as i64);
                    format!("{}{}", self.base_url, day.format("%Y/%m/%d/"))
                })
                .collect(),
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

const BOILERPLATE_SELECTORS: &[&str] = &[
    "nav", "header", "script", "style", "ul", "ol",
    ".tm-article-snippet", ".tm-article-snippet__meta", ".tm-article-snippet__hubs",
    ".tm-article-snippet__footer", ".tm-article-snippet__title",
    ".tm-article-snippet__read-time", ".tm-article-snippet__views-count",
    ".tm-article-snippet__tags", ".tm-article-snippet__hubs-list",
    ".social-share", ".share-buttons", ".article-meta", ".article-header",
    ".breadcrumbs", ".article-tags", ".article-author", ".textMTags", ".textMMat",
    ".list-disc", ".list-decimal", "[class*=\"list\"]",
];

const COMMENT_COUNT_SELECTORS: &[&str] = &[
    "[class*=\"comment\"] [class*=\"count\"]",
    "[class*=\"comment\"] [class*=\"counter\"]",
    "[class*=\"comment\"] [class*=\"num\"]",
    "[data-comments-count]",
    ".comments-count",
    ".comment-count",
    "[class*=\"comments\"]",
];

pub fn builtin_sources() -> Vec<SourceConfig> {
    let mut habr = SourceConfig::new("habr", "https://habr.com/ru/news/", Some("page{i}/"), "https://habr.com");
    habr.article_selectors = strings(&[".tm-article-presenter__content", ".article-formatted-body", "article"]);
    habr.remove_selectors = strings(BOILERPLATE_SELECTORS);
    habr.meta_keywords = strings(&[
        "время на прочтение", "охват и читатели", "теги:", "хабы:", "читатели", "cutcode",
        "час назад", "релиз",
    ]);
    habr.comment_selectors = strings(&[
        "[data-test-id=\"counter-comments\"] .value",
        ".article-comments-counter-link .value",
    ]);
    habr.rating_selector = Some("[data-test-id=\"votes-meter-value\"]".to_string());

    let mut newsvl = SourceConfig::new("newsvl", "https://www.newsvl.ru/", Some("?page={i}"), "https://www.newsvl.ru");
    newsvl.article_selectors = strings(&[".story__text"]);
    newsvl.comment_selectors = strings(COMMENT_COUNT_SELECTORS);
    newsvl.comment_selectors.push(".story__comments-count".to_string());

    let mut ixbt = SourceConfig::new("ixbt", "https://ixbt.games/news", Some("?page={i}"), "https://ixbt.games");
    ixbt.article_selectors = strings(&["article", "[class*=\"article-content\"]", "[class*=\"post-content\"]", "main"]);
    ixbt.remove_selectors = strings(BOILERPLATE_SELECTORS);
    ixbt.comment_selectors = strings(&["[data-comments-count]", "[class*=\"comment\"] [class*=\"count\"]", ".comments-count"]);

    let mut naked = SourceConfig::new("naked-science", "https://naked-science.ru/article/", Some("page/{i}/"), "https://naked-science.ru");
    naked.article_selectors = strings(&[".body", ".content", ".single-post .body", ".single-post .content"]);
    naked.remove_selectors = strings(BOILERPLATE_SELECTORS);
    naked.remove_selectors.extend(strings(&[".ads_single", ".ads", "[class*=\"ads\"]"]));
    naked.comment_selectors = strings(COMMENT_COUNT_SELECTORS);
    naked.comment_selectors.extend(strings(&["[id*=\"comment\"] [class*=\"count\"]", "[id*=\"comment\"] [class*=\"counter\"]"]));
    naked.rating_selector = Some(".index_importance_news".to_string());
    naked.strip_title_echo = true;

    let mut interfax = SourceConfig::new("interfax", "https://www.interfax.ru/world/news/", None, "https://www.interfax.ru");
    interfax.article_selectors = strings(&[".textMTitle", ".articleText", "article"]);
    interfax.block_selector = "p, div".to_string();
    interfax.remove_selectors = strings(BOILERPLATE_SELECTORS);
    interfax.comment_selectors = strings(COMMENT_COUNT_SELECTORS);

    vec![habr, newsvl, ixbt, naked, interfax]
}
