use chrono::NaiveDateTime;
use lazy_static::lazy_static;
use nh_core::{
    ArticleRecord, ArticleStub, CleanerConfig, ExtractionConfig, Result, Scraper, SourceConfig,
};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use super::utils::{self, element_text, selector, DATETIME_FORMAT};
use super::BodyExtractor;

lazy_static! {
    static ref PAGE_DATE: Regex = Regex::new(r#"data_date="(\d{4}-\d{2}-\d{2})""#).unwrap();
    static ref CLOCK: Regex = Regex::new(r"^(\d{2}:\d{2})").unwrap();
}

/// Interfax listings show only the time of day; the date comes from an
/// inline script on the daily page.
#[derive(Debug, Clone)]
pub struct InterfaxScraper {
    config: SourceConfig,
    container: Selector,
    script: Selector,
    item: Selector,
    link: Selector,
    title: Selector,
    time: Selector,
    body: BodyExtractor,
}

impl InterfaxScraper {
    pub fn new(config: SourceConfig, cleaner: &CleanerConfig, extraction: &ExtractionConfig) -> Result<Self> {
        Ok(Self {
            container: selector(".an")?,
            script: selector("script")?,
            item: selector("div[data-id]")?,
            link: selector("a[href]")?,
            title: selector("h3")?,
            time: selector("span")?,
            body: BodyExtractor::new(&config, cleaner, extraction)?,
            config,
        })
    }

    fn page_date(&self, document: &Html) -> Option<String> {
        document.select(&self.script).find_map(|script| {
            let code = script.text().collect::<String>();
            PAGE_DATE.captures(&code).map(|c| c[1].to_string())
        })
    }

    fn published(time: &str, page_date: Option<&str>) -> String {
        let combined = page_date.zip(CLOCK.captures(time)).and_then(|(date, clock)| {
            NaiveDateTime::parse_from_str(&format!("{} {}", date, &clock[1]), "%Y-%m-%d %H:%M").ok()
        });
        match combined {
            Some(dt) => dt.format(DATETIME_FORMAT).to_string(),
            None => time.to_string(),
        }
    }

    fn parse_item(&self, item: ElementRef, page_date: Option<&str>) -> Option<ArticleStub> {
        let link = item.select(&self.link).next()?;
        let url = utils::resolve_url(&self.config.domain, link.value().attr("href")?)?;
        let title = element_text(link.select(&self.title).next()?);
        let mut stub = ArticleStub::new(title, url);

        stub.published_at = item
            .select(&self.time)
            .next()
            .map(|span| Self::published(&element_text(span), page_date));
        Some(stub)
    }
}

impl Scraper for InterfaxScraper {
    fn config(&self) -> &SourceConfig {
        &self.config
    }

    fn parse_listing(&self, document: &str) -> Vec<ArticleStub> {
        let document = Html::parse_document(document);
        let Some(container) = document.select(&self.container).next() else {
            return Vec::new();
        };
        let page_date = self.page_date(&document);

        container
            .select(&self.item)
            .filter_map(|item| {
                let stub = self.parse_item(item, page_date.as_deref());
                if stub.is_none() {
                    debug!(source = %self.config.name, "Skipping listing item without link or headline");
                }
                stub
            })
            .collect()
    }

    fn parse_article(&self, document: &str, stub: &ArticleStub) -> Option<ArticleRecord> {
        let document = Html::parse_document(document);
        self.body.extract(&document, stub)
    }
}
