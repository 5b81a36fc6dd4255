use nh_core::{
    ArticleRecord, ArticleStub, CleanerConfig, Error, ExtractionConfig, Result, Scraper, Settings,
    SourceConfig,
};
use scraper::{Html, Selector};

use crate::cleaner::TextNormalizer;

pub mod habr;
pub mod interfax;
pub mod ixbt;
pub mod nakedscience;
pub mod newsvl;

pub use habr::HabrScraper;
pub use interfax::InterfaxScraper;
pub use ixbt::IxbtScraper;
pub use nakedscience::NakedScienceScraper;
pub use newsvl::NewsVlScraper;

pub type BoxedScraper = Box<dyn Scraper>;

/// Builds the scraper registered for `config.name`.
pub fn build_scraper(config: &SourceConfig, settings: &Settings) -> Result<BoxedScraper> {
    let config = config.clone();
    let cleaner = &settings.cleaner;
    let extraction = &settings.extraction;
    let scraper: BoxedScraper = match config.name.as_str() {
        "habr" => Box::new(HabrScraper::new(config, cleaner, extraction)?),
        "newsvl" => Box::new(NewsVlScraper::new(config, cleaner, extraction)?),
        "ixbt" => Box::new(IxbtScraper::new(config, cleaner, extraction)?),
        "naked-science" => Box::new(NakedScienceScraper::new(config, cleaner, extraction)?),
        "interfax" => Box::new(InterfaxScraper::new(config, cleaner, extraction)?),
        other => return Err(Error::Config(format!("No scraper available for source: {}", other))),
    };
    Ok(scraper)
}

/// Scrapers for every configured source, or only for `only` when given.
pub fn build_scrapers(settings: &Settings, only: Option<&str>) -> Result<Vec<BoxedScraper>> {
    let sources: Vec<&SourceConfig> = match only {
        Some(name) => vec![settings
            .source(name)
            .ok_or_else(|| Error::Config(format!("Unknown source: {}", name)))?],
        None => settings.sources.iter().collect(),
    };
    sources.into_iter().map(|source| build_scraper(source, settings)).collect()
}

/// Article-page extraction shared by all sources: body lookup, cleaning,
/// headline de-duplication and the generic comment/rating overrides.
#[derive(Debug, Clone)]
pub(crate) struct BodyExtractor {
    bodies: Vec<Selector>,
    normalizer: TextNormalizer,
    comments: Vec<Selector>,
    rating: Option<Selector>,
    heading: Selector,
    strip_title_echo: bool,
    extraction: ExtractionConfig,
}

impl BodyExtractor {
    pub fn new(config: &SourceConfig, cleaner: &CleanerConfig, extraction: &ExtractionConfig) -> Result<Self> {
        let normalizer = TextNormalizer::new(cleaner)?
            .with_removals(&config.remove_selectors)?
            .with_block_selector(&config.block_selector)?
            .with_min_block_length(extraction.min_paragraph_length)
            .with_meta_keywords(&config.meta_keywords);

        Ok(Self {
            bodies: utils::selectors(&config.article_selectors)?,
            normalizer,
            comments: utils::selectors(&config.comment_selectors)?,
            rating: config.rating_selector.as_deref().map(utils::selector).transpose()?,
            heading: utils::selector("h1")?,
            strip_title_echo: config.strip_title_echo,
            extraction: extraction.clone(),
        })
    }

    /// Extracts the record, or `None` when the body is missing, has no usable
    /// blocks or is too short.
    pub fn extract(&self, document: &Html, stub: &ArticleStub) -> Option<ArticleRecord> {
        let body = self.bodies.iter().find_map(|s| document.select(s).next())?;
        let blocks = self.normalizer.element_blocks(body);
        if blocks.is_empty() {
            return None;
        }
        let mut description = blocks.into_iter().map(|b| b.text).collect::<Vec<_>>().join("\n");

        let title = if stub.title.is_empty() {
            document
                .select(&self.heading)
                .next()
                .map(utils::element_text)
                .unwrap_or_default()
        } else {
            stub.title.clone()
        };

        if self.strip_title_echo {
            description = utils::strip_title_echo(&title, &description, &self.extraction);
        }
        if description.trim().chars().count() < self.extraction.min_description_length {
            return None;
        }

        let mut record = ArticleRecord::from_stub(stub, description);
        record.title = Some(title).filter(|t| !t.is_empty());
        if let Some(count) = utils::count_from(document, &self.comments) {
            record.comments_count = Some(count);
        }
        if let Some(rating) = self
            .rating
            .as_ref()
            .and_then(|s| document.select(s).next())
            .and_then(|el| utils::first_signed_number(&utils::element_text(el)))
        {
            record.rating = Some(rating);
        }
        Some(record)
    }
}

/// Common utilities for scrapers
pub(crate) mod utils {
    use super::*;
    use chrono::{DateTime, NaiveDate, NaiveDateTime};
    use lazy_static::lazy_static;
    use regex::Regex;
    use scraper::ElementRef;
    use std::collections::HashSet;
    use url::Url;

    lazy_static! {
        static ref DIGITS: Regex = Regex::new(r"\d+").unwrap();
        static ref SIGNED_NUMBER: Regex = Regex::new(r"[-−]?\d+(?:[.,]\d+)?").unwrap();
        static ref URL_DATE: Regex = Regex::new(r"/(\d{4})/(\d{1,2})/(\d{1,2})/").unwrap();
        static ref DMY: Regex =
            Regex::new(r"(\d{1,2})\.(\d{1,2})\.(\d{4})(?:\D+(\d{1,2}):(\d{2}))?").unwrap();
        static ref YMD: Regex =
            Regex::new(r"(\d{4})-(\d{1,2})-(\d{1,2})(?:[T\s]+(\d{1,2}):(\d{2}))?").unwrap();
        static ref WORDY: Regex =
            Regex::new(r"(\d{1,2})\s+([а-яё]+)\.?,?\s+(\d{4})(?:\D+(\d{1,2}):(\d{2}))?").unwrap();
    }

    pub const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

    pub fn selector(css: &str) -> Result<Selector> {
        Selector::parse(css).map_err(|e| Error::Scraping(format!("Invalid selector {:?}: {}", css, e)))
    }

    pub fn selectors(list: &[String]) -> Result<Vec<Selector>> {
        list.iter().map(|css| selector(css)).collect()
    }

    /// Text content with all whitespace runs collapsed to single spaces.
    pub fn element_text(element: ElementRef) -> String {
        element.text().flat_map(str::split_whitespace).collect::<Vec<_>>().join(" ")
    }

    pub fn normalize(text: &str) -> String {
        text.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
    }

    /// Resolves a link against the site domain. Only root-relative,
    /// protocol-relative and absolute http(s) links are accepted.
    pub fn resolve_url(domain: &str, href: &str) -> Option<String> {
        let href = href.trim();
        let absolute = if href.starts_with("http://") || href.starts_with("https://") {
            href.to_string()
        } else if href.starts_with("//") {
            format!("https:{}", href)
        } else if href.starts_with('/') {
            format!("{}{}", domain.trim_end_matches('/'), href)
        } else {
            return None;
        };

        let mut url = Url::parse(&absolute).ok()?;
        if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
            return None;
        }
        url.set_fragment(None);
        Some(url.to_string())
    }

    /// First run of digits in `text`.
    pub fn first_number(text: &str) -> Option<u32> {
        DIGITS.find(text).and_then(|m| m.as_str().parse().ok())
    }

    /// First optionally signed, optionally fractional number in `text`.
    pub fn first_signed_number(text: &str) -> Option<f64> {
        SIGNED_NUMBER
            .find(text)
            .and_then(|m| m.as_str().replace('−', "-").replace(',', ".").parse().ok())
    }

    /// Number found in the first element matched by one of `selectors` that
    /// actually contains digits. A `data-comments-count` attribute wins over
    /// the element text.
    pub fn count_from(document: &Html, selectors: &[Selector]) -> Option<u32> {
        selectors.iter().find_map(|s| {
            let element = document.select(s).next()?;
            element
                .value()
                .attr("data-comments-count")
                .and_then(|v| v.trim().parse().ok())
                .or_else(|| first_number(&element_text(element)))
        })
    }

    pub fn parse_iso_datetime(text: &str) -> Option<String> {
        let text = text.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
            return Some(dt.to_rfc3339());
        }
        ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"]
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
            .or_else(|| {
                NaiveDate::parse_from_str(text, "%Y-%m-%d")
                    .ok()
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
            })
            .map(|dt| dt.format(DATETIME_FORMAT).to_string())
    }

    fn month_number(name: &str) -> Option<u32> {
        const MONTHS: &[(&str, u32)] = &[
            ("январ", 1), ("феврал", 2), ("март", 3), ("апрел", 4), ("ма", 5), ("июн", 6),
            ("июл", 7), ("август", 8), ("сентябр", 9), ("октябр", 10), ("ноябр", 11), ("декабр", 12),
        ];
        MONTHS.iter().find(|(stem, _)| name.starts_with(stem)).map(|(_, n)| *n)
    }

    fn build_datetime(y: &str, m: u32, d: &str, hh: Option<&str>, mm: Option<&str>) -> Option<String> {
        let date = NaiveDate::from_ymd_opt(y.parse().ok()?, m, d.parse().ok()?)?;
        let hour = hh.and_then(|h| h.parse().ok()).unwrap_or(0);
        let minute = mm.and_then(|m| m.parse().ok()).unwrap_or(0);
        Some(date.and_hms_opt(hour, minute, 0)?.format(DATETIME_FORMAT).to_string())
    }

    /// Day-first human dates: `12.03.2024, 14:30`, `2024-03-12 14:30`,
    /// `12 марта 2024, 14:30`. Returns `None` when no full date is present.
    pub fn parse_human_date(text: &str) -> Option<String> {
        let text = text.trim().to_lowercase();
        if let Some(c) = YMD.captures(&text) {
            let month = c[2].parse().ok()?;
            return build_datetime(&c[1], month, &c[3], c.get(4).map(|m| m.as_str()), c.get(5).map(|m| m.as_str()));
        }
        if let Some(c) = DMY.captures(&text) {
            let month = c[2].parse().ok()?;
            return build_datetime(&c[3], month, &c[1], c.get(4).map(|m| m.as_str()), c.get(5).map(|m| m.as_str()));
        }
        if let Some(c) = WORDY.captures(&text) {
            let month = month_number(&c[2])?;
            return build_datetime(&c[3], month, &c[1], c.get(4).map(|m| m.as_str()), c.get(5).map(|m| m.as_str()));
        }
        None
    }

    /// Date encoded as a `/YYYY/M/D/` path segment.
    pub fn date_from_url(url: &str) -> Option<String> {
        let c = URL_DATE.captures(url)?;
        build_datetime(&c[1], c[2].parse().ok()?, &c[3], None, None)
    }

    fn word_set(text: &str) -> HashSet<String> {
        normalize(text)
            .split(' ')
            .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
            .filter(|w| !w.is_empty())
            .map(String::from)
            .collect()
    }

    /// Drops the first of the leading lines that repeats the headline.
    ///
    /// A line matches when it is long enough and shares at least
    /// `min(title_match_min_words, title_match_threshold * |title words|)`
    /// words with the title.
    pub fn strip_title_echo(title: &str, description: &str, config: &ExtractionConfig) -> String {
        let title_words = word_set(title);
        if title_words.is_empty() {
            return description.to_string();
        }
        let floor = (config.title_match_min_words as f64)
            .min(title_words.len() as f64 * config.title_match_threshold);

        let lines: Vec<&str> = description.split('\n').collect();
        let echo = lines.iter().take(config.title_match_lines).position(|line| {
            normalize(line).chars().count() > config.min_normalized_line_length
                && word_set(line).intersection(&title_words).count() as f64 >= floor
        });

        match echo {
            Some(index) => lines
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != index)
                .map(|(_, line)| *line)
                .collect::<Vec<_>>()
                .join("\n")
                .trim()
                .to_string(),
            None => description.to_string(),
        }
    }
}
