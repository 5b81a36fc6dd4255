//! Text extraction from noisy article markup.
//!
//! Media and boilerplate nodes are detached from the tree first, then
//! block-level elements are collected in document order, filtered and
//! deduplicated.

use nh_core::{CleanerConfig, Result};
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;

use crate::scrapers::utils::{element_text, normalize, selector, selectors};

/// A candidate paragraph.
#[derive(Debug, Clone, PartialEq)]
pub struct TextBlock {
    pub text: String,
    /// Whitespace-collapsed, lower-cased; only used for comparisons
    pub normalized: String,
}

impl TextBlock {
    fn new(text: String) -> Self {
        let normalized = normalize(&text);
        Self { text, normalized }
    }
}

#[derive(Debug, Clone)]
pub struct TextNormalizer {
    remove: Vec<Selector>,
    blocks: Selector,
    min_block_length: usize,
    stop_keywords: Vec<String>,
    meta_keywords: Vec<String>,
}

impl TextNormalizer {
    pub fn new(config: &CleanerConfig) -> Result<Self> {
        Ok(Self {
            remove: selectors(&config.remove_selectors)?,
            blocks: selector(&config.block_selector)?,
            min_block_length: config.min_block_length,
            stop_keywords: config.stop_keywords.iter().map(|k| k.to_lowercase()).collect(),
            meta_keywords: Vec::new(),
        })
    }

    /// Additional nodes to strip before collecting text.
    pub fn with_removals(mut self, extra: &[String]) -> Result<Self> {
        self.remove.extend(selectors(extra)?);
        Ok(self)
    }

    pub fn with_block_selector(mut self, css: &str) -> Result<Self> {
        self.blocks = selector(css)?;
        Ok(self)
    }

    pub fn with_min_block_length(mut self, min: usize) -> Self {
        self.min_block_length = min;
        self
    }

    /// Blocks whose text contains one of these keywords are skipped.
    pub fn with_meta_keywords(mut self, keywords: &[String]) -> Self {
        self.meta_keywords = keywords.iter().map(|k| k.to_lowercase()).collect();
        self
    }

    /// Cleaned text of an HTML fragment, one block per line.
    ///
    /// Never empty when the fragment has any non-whitespace text: with no
    /// surviving blocks the flattened fragment text is returned instead.
    /// Article extraction goes through [`Self::element_blocks`], which has no
    /// such fallback.
    pub fn clean(&self, fragment: &str) -> String {
        let html = self.stripped(fragment);
        let root = html.root_element();
        let blocks = self.collect_blocks(root);
        if !blocks.is_empty() {
            return blocks.into_iter().map(|b| b.text).collect::<Vec<_>>().join("\n");
        }

        let flattened = element_text(root);
        if !flattened.is_empty() {
            return flattened;
        }
        element_text(Html::parse_fragment(fragment).root_element())
    }

    /// Surviving blocks inside an element. The element itself is never
    /// removed, even when it matches a removal selector.
    pub fn element_blocks(&self, element: ElementRef) -> Vec<TextBlock> {
        self.blocks(&element.inner_html())
    }

    /// Surviving blocks of a fragment, without the fallback.
    pub fn blocks(&self, fragment: &str) -> Vec<TextBlock> {
        let html = self.stripped(fragment);
        self.collect_blocks(html.root_element())
    }

    fn stripped(&self, fragment: &str) -> Html {
        let mut html = Html::parse_fragment(fragment);
        let doomed: Vec<_> = {
            let root = html.root_element();
            self.remove
                .iter()
                .flat_map(|s| root.select(s).map(|el| el.id()).collect::<Vec<_>>())
                .collect()
        };
        for id in doomed {
            if let Some(mut node) = html.tree.get_mut(id) {
                node.detach();
            }
        }
        html
    }

    fn collect_blocks(&self, root: ElementRef) -> Vec<TextBlock> {
        let mut seen = HashSet::new();
        let mut blocks = Vec::new();

        for element in root.select(&self.blocks) {
            // Wrappers only contribute text that sits outside their nested blocks.
            let text = if self.has_nested_block(element) {
                self.own_text(element)
            } else {
                element_text(element)
            };
            if text.is_empty() {
                continue;
            }
            let block = TextBlock::new(text);

            if self.stop_keywords.iter().any(|k| block.normalized.starts_with(k.as_str())) {
                break;
            }
            if block.text.chars().count() < self.min_block_length {
                continue;
            }
            if self.meta_keywords.iter().any(|k| block.normalized.contains(k.as_str())) {
                continue;
            }
            if !seen.insert(block.normalized.clone()) {
                continue;
            }
            blocks.push(block);
        }

        blocks
    }

    fn has_nested_block(&self, element: ElementRef) -> bool {
        element
            .descendants()
            .skip(1)
            .filter_map(ElementRef::wrap)
            .any(|child| self.blocks.matches(&child))
    }

    fn own_text(&self, element: ElementRef) -> String {
        element
            .descendants()
            .filter(|node| {
                !node
                    .ancestors()
                    .take_while(|ancestor| ancestor.id() != element.id())
                    .filter_map(ElementRef::wrap)
                    .any(|ancestor| self.blocks.matches(&ancestor))
            })
            .filter_map(|node| node.value().as_text())
            .flat_map(|text| text.split_whitespace())
            .collect::<Vec<_>>()
            .join(" ")
    }
}
