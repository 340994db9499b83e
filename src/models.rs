//! Data models for harvested items and the assembled digest.
//!
//! This module defines the core data structures used throughout the application:
//! - [`SourceId`]: The closed set of news sources the harvester knows about
//! - [`Item`]: One harvested lead or article body
//! - [`SourceResult`] / [`HarvestResult`]: Per-source and whole-run collections
//! - [`Digest`]: The final, summarized edition handed to the outputs

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Upper bound on the number of items any single source contributes.
pub const MAX_ITEMS_PER_SOURCE: usize = 10;

/// Identifier for a configured news source.
///
/// The declaration order is the order sections appear in the digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceId {
    /// PBS NewsHour: transcripts and publications.
    Pbs,
    /// NPR news section: editorial leads, always summarized.
    Npr,
    /// UPI top news: leads embedded in the index page.
    Upi,
}

impl SourceId {
    /// Every known source, in digest order.
    pub const ALL: [SourceId; 3] = [SourceId::Pbs, SourceId::Npr, SourceId::Upi];

    /// Short lowercase key used in config files, logs and JSON output.
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceId::Pbs => "pbs",
            SourceId::Npr => "npr",
            SourceId::Upi => "upi",
        }
    }

    /// Heading used when the digest is rendered.
    pub fn display_name(&self) -> &'static str {
        match self {
            SourceId::Pbs => "PBS",
            SourceId::Npr => "NPR",
            SourceId::Upi => "UPI",
        }
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pbs" => Ok(SourceId::Pbs),
            "npr" => Ok(SourceId::Npr),
            "upi" => Ok(SourceId::Upi),
            other => Err(format!("unknown source '{other}' (expected pbs, npr or upi)")),
        }
    }
}

/// Why an [`Item`] could not be built.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ItemError {
    #[error("item text is empty")]
    EmptyText,
    #[error("item source URL is empty")]
    EmptyUrl,
}

/// One harvested unit of content.
///
/// Items are created by a source extractor once it has resolved a candidate
/// article. The only mutation afterwards is the digest assembler replacing
/// `text` with its summary when `needs_summary` is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Cleaned natural-language text. Never empty.
    pub text: String,
    /// The URL the text was extracted from. Never empty.
    pub source_url: String,
    /// `true` when `text` is long-form and must be compressed before display.
    pub needs_summary: bool,
}

impl Item {
    /// Build an item, enforcing the non-empty invariants.
    ///
    /// Surrounding whitespace is trimmed from both fields before the check.
    pub fn new(
        text: impl Into<String>,
        source_url: impl Into<String>,
        needs_summary: bool,
    ) -> Result<Self, ItemError> {
        let text = text.into().trim().to_string();
        let source_url = source_url.into().trim().to_string();
        if text.is_empty() {
            return Err(ItemError::EmptyText);
        }
        if source_url.is_empty() {
            return Err(ItemError::EmptyUrl);
        }
        Ok(Self {
            text,
            source_url,
            needs_summary,
        })
    }
}

/// Ordered items for one source, in index-page discovery order.
pub type SourceResult = Vec<Item>;

/// One entry per configured source, even when a source yielded nothing.
pub type HarvestResult = BTreeMap<SourceId, SourceResult>;

/// A single rendered section of the digest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DigestSection {
    pub source: SourceId,
    pub items: Vec<Item>,
}

/// The final edition: every source's items with summaries spliced in.
///
/// # Edition Naming
///
/// The `time_of_day` field categorizes editions as:
/// - `"morning"`: 00:00 - 08:00
/// - `"afternoon"`: 08:00 - 16:00
/// - `"evening"`: 16:00 - 24:00
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Digest {
    /// The date of the run in `YYYY-MM-DD` format.
    pub local_date: String,
    /// The time of day category: "morning", "afternoon", or "evening".
    pub time_of_day: String,
    /// The exact local time of the run.
    pub local_time: String,
    /// Sections in [`SourceId`] order.
    pub sections: Vec<DigestSection>,
}

impl Digest {
    /// Total number of items across all sections.
    pub fn item_count(&self) -> usize {
        self.sections.iter().map(|s| s.items.len()).sum()
    }
}
