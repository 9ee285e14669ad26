// src/services/extractor.rs

//! Availability record extraction.
//!
//! Extraction runs in two tiers. The card tier looks for containers that
//! represent one calendar day or slot and builds one record per container. If
//! no container matches at all, the page tier scans the visible text of the
//! whole page and produces a single coarse record. Extraction never fails:
//! malformed markup is handled by the HTML parser and ends up in the page tier.

use scraper::{ElementRef, Html, Selector};

use crate::error::{AppError, Result};
use crate::models::{AvailabilityRecord, ExtractionConfig, FallbackMode, RecordSet, SlotStatus};
use crate::utils::{normalize_whitespace, strip_phrases};

/// Elements whose text (including descendants) is never part of the page body.
const HIDDEN_ELEMENTS: [&str; 6] = ["head", "title", "script", "style", "noscript", "template"];

/// Attributes of clickable controls that may carry a label.
const ACTION_ATTRS: [&str; 3] = ["value", "title", "aria-label"];

/// Tiered extractor built from an [`ExtractionConfig`].
#[derive(Debug, Clone)]
pub struct RecordExtractor {
    cards: Selector,
    date: Option<Selector>,
    time: Option<Selector>,
    status: Option<Selector>,
    action: Option<Selector>,
    positive: Vec<String>,
    negative: Vec<String>,
    free_classes: Vec<String>,
    /// Status phrases removed from date labels
    label_phrases: Vec<String>,
    fallback_mode: FallbackMode,
}

impl RecordExtractor {
    /// Compile selectors and keyword sets.
    pub fn new(config: &ExtractionConfig) -> Result<Self> {
        let card_list: Vec<&str> = config
            .card_selectors
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .collect();
        if card_list.is_empty() {
            return Err(AppError::validation("extraction.card_selectors is empty"));
        }

        Ok(Self {
            cards: Self::parse_selector(&card_list.join(", "))?,
            date: Self::parse_optional(&config.date_selector)?,
            time: Self::parse_optional(&config.time_selector)?,
            status: Self::parse_optional(&config.status_selector)?,
            action: Self::parse_optional(&config.action_selector)?,
            positive: lowercase_all(&config.positive_keywords),
            negative: lowercase_all(&config.negative_keywords),
            free_classes: lowercase_all(&config.free_classes),
            label_phrases: config
                .negative_keywords
                .iter()
                .chain(&config.positive_keywords)
                .chain(&config.strip_markers)
                .cloned()
                .collect(),
            fallback_mode: config.fallback_mode,
        })
    }

    /// Extract records from raw markup.
    pub fn extract(&self, markup: &str) -> RecordSet {
        let document = Html::parse_document(markup);
        match self.extract_cards(&document) {
            Some(records) => {
                log::debug!("Card tier matched, {} record(s)", records.len());
                records
            }
            None => {
                log::debug!("No card containers found, using page-level fallback");
                vec![self.extract_page_level(&document)]
            }
        }
    }

    /// Card tier. `None` means no container matched.
    fn extract_cards(&self, document: &Html) -> Option<RecordSet> {
        let mut cards = document.select(&self.cards).peekable();
        cards.peek()?;
        Some(cards.filter_map(|card| self.parse_card(card)).collect())
    }

    fn parse_card(&self, card: ElementRef<'_>) -> Option<AvailabilityRecord> {
        let text = element_text(card);
        if text.is_empty() {
            return None;
        }

        let time_label = first_text(card, self.time.as_ref());
        let status_text = first_text(card, self.status.as_ref());

        let status = status_text
            .as_deref()
            .and_then(|t| self.classify(t))
            .or_else(|| self.classify(&text))
            .or_else(|| self.action_status(card))
            .or_else(|| self.class_status(card))
            .unwrap_or(SlotStatus::Unavailable);

        let raw_label = first_text(card, self.date.as_ref()).unwrap_or_else(|| {
            let mut label = text.clone();
            for part in [&time_label, &status_text].into_iter().flatten() {
                label = label.replacen(part.as_str(), " ", 1);
            }
            label
        });
        let date_label = strip_phrases(&raw_label, &self.label_phrases);

        Some(AvailabilityRecord {
            date_label,
            time_label,
            status,
        })
    }

    /// Page tier: one record for the whole page.
    fn extract_page_level(&self, document: &Html) -> AvailabilityRecord {
        let hit = visible_lines(document)
            .into_iter()
            .find(|line| self.classify(line) == Some(SlotStatus::Free));

        match hit {
            Some(line) => {
                let label = match self.fallback_mode {
                    FallbackMode::Page => String::new(),
                    FallbackMode::Line => line,
                };
                AvailabilityRecord::new(label, SlotStatus::Free)
            }
            None => AvailabilityRecord::new("", SlotStatus::Unavailable),
        }
    }

    /// Keyword classification. Negative phrases win over positive ones, since
    /// several negatives contain a positive stem.
    fn classify(&self, text: &str) -> Option<SlotStatus> {
        let lower = text.to_lowercase();
        if self.negative.iter().any(|k| lower.contains(k.as_str())) {
            Some(SlotStatus::Unavailable)
        } else if self.positive.iter().any(|k| lower.contains(k.as_str())) {
            Some(SlotStatus::Free)
        } else {
            None
        }
    }

    /// Labels carried in attributes of clickable controls.
    fn action_status(&self, card: ElementRef<'_>) -> Option<SlotStatus> {
        let selector = self.action.as_ref()?;
        card.select(selector).find_map(|control| {
            ACTION_ATTRS
                .iter()
                .filter_map(|attr| control.value().attr(attr))
                .find_map(|label| self.classify(label))
        })
    }

    /// Presentational class markers on the card or anything inside it.
    fn class_status(&self, card: ElementRef<'_>) -> Option<SlotStatus> {
        let marked = card
            .descendants()
            .filter_map(ElementRef::wrap)
            .any(|el| {
                el.value().classes().any(|class| {
                    let class = class.to_lowercase();
                    self.free_classes.iter().any(|free| *free == class)
                })
            });
        marked.then_some(SlotStatus::Free)
    }

    fn parse_selector(s: &str) -> Result<Selector> {
        Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
    }

    fn parse_optional(s: &str) -> Result<Option<Selector>> {
        let s = s.trim();
        if s.is_empty() {
            return Ok(None);
        }
        Self::parse_selector(s).map(Some)
    }
}

fn lowercase_all(items: &[String]) -> Vec<String> {
    items
        .iter()
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Text content with each fragment trimmed and joined by single spaces.
fn element_text(el: ElementRef<'_>) -> String {
    normalize_whitespace(&el.text().collect::<Vec<_>>().join(" "))
}

/// Text of the first match of an optional sub-selector, if non-empty.
fn first_text(el: ElementRef<'_>, selector: Option<&Selector>) -> Option<String> {
    let selector = selector?;
    el.select(selector)
        .next()
        .map(element_text)
        .filter(|t| !t.is_empty())
}

/// Non-empty rendered text fragments of the page, in document order.
fn visible_lines(document: &Html) -> Vec<String> {
    document
        .root_element()
        .descendants()
        .filter_map(|node| {
            let text: &str = node.value().as_text()?;
            let hidden = node.ancestors().any(|a| {
                a.value()
                    .as_element()
                    .is_some_and(|e| HIDDEN_ELEMENTS.contains(&e.name()))
            });
            if hidden {
                return None;
            }
            let line = normalize_whitespace(text);
            (!line.is_empty()).then_some(line)
        })
        .collect()
}
