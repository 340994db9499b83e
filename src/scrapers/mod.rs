//! News source extractors and the primitives they share.
//!
//! Each extractor drives one [`Session`] through a source's index page and
//! its articles, recognizing the source's layouts and deciding, per item,
//! whether the text is already a lead or still needs summarizing.
//!
//! # Supported Sources
//!
//! | Source | Module | Index | Per-article work | Needs summary |
//! |--------|--------|-------|------------------|---------------|
//! | UPI | [`upi`] | Leads embedded in the index | Featured links only | never |
//! | NPR | [`npr`] | Headline links + section tags | Full body | always |
//! | PBS | [`pbs`] | Timeline links | Transcript or publication layout | publication bodies only |
//!
//! # Common Patterns
//!
//! - Every request goes through [`Session::request`], which applies the
//!   source's politeness delay first.
//! - A failing candidate is logged and skipped through [`Session::settle`];
//!   it never aborts the source run.
//! - Items land in an [`ItemSink`] the orchestrator holds a handle to, so
//!   whatever was stored survives a worker that fails or panics later.

pub mod npr;
pub mod pbs;
pub mod upi;

use crate::config::Config;
use crate::models::{Item, ItemError, SourceId, SourceResult};
use crate::page::{Page, PageError};
use async_trait::async_trait;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, info, warn};
use url::Url;

/// Errors raised while extracting a source or one of its candidates.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error(transparent)]
    Page(#[from] PageError),

    #[error("no element matches '{0}'")]
    Missing(String),

    #[error(transparent)]
    Item(#[from] ItemError),
}

/// One source's extraction logic.
#[async_trait]
pub trait SourceExtractor: Send + Sync {
    fn source(&self) -> SourceId;

    /// Harvest the source into `session`'s sink.
    ///
    /// Returning an error ends this source's run; items stored before the
    /// error are kept.
    async fn run(&self, session: &mut Session) -> Result<(), ScrapeError>;
}

/// A discovered article link and its position on the index page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub index: usize,
    pub url: String,
}

impl Candidate {
    pub fn enumerate(urls: Vec<String>) -> Vec<Candidate> {
        urls.into_iter()
            .enumerate()
            .map(|(index, url)| Candidate { index, url })
            .collect()
    }
}

/// Shared, append-only item store for one source.
#[derive(Debug, Clone, Default)]
pub struct ItemSink(Arc<Mutex<Vec<Item>>>);

impl ItemSink {
    fn push(&self, item: Item) {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).push(item);
    }

    pub fn len(&self) -> usize {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Copy of the items stored so far, in insertion order.
    pub fn snapshot(&self) -> SourceResult {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

/// Drop everything past the first `limit` entries.
pub fn cap<T>(items: &mut Vec<T>, limit: usize) {
    items.truncate(limit);
}

/// A source's exclusive page session plus the helpers every extractor uses.
pub struct Session {
    source: SourceId,
    page: Box<dyn Page>,
    items: ItemSink,
    limit: usize,
}

impl Session {
    pub fn new(source: SourceId, page: Box<dyn Page>, limit: usize) -> Self {
        Self {
            source,
            page,
            items: ItemSink::default(),
            limit,
        }
    }

    /// Handle to this session's items that stays readable after the session is gone.
    pub fn sink(&self) -> ItemSink {
        self.items.clone()
    }

    /// Items stored so far.
    pub fn output(&self) -> SourceResult {
        self.items.snapshot()
    }

    pub fn is_full(&self) -> bool {
        self.items.len() >= self.limit
    }

    /// How many more items may be stored.
    pub fn remaining(&self) -> usize {
        self.limit.saturating_sub(self.items.len())
    }

    /// Wait out the politeness delay, then navigate.
    pub async fn request(&mut self, url: &str, delay: Duration) -> Result<(), ScrapeError> {
        if !delay.is_zero() {
            debug!(source = %self.source, ?delay, "Politeness delay");
            sleep(delay).await;
        }
        self.page.navigate(url).await?;
        Ok(())
    }

    /// URL of the current page after redirects.
    pub fn url(&self) -> &str {
        self.page.url()
    }

    /// Text of the first element matching `selector`, if any.
    pub fn maybe_text(&self, selector: &str) -> Result<Option<String>, ScrapeError> {
        Ok(self
            .page
            .query(selector)?
            .map(|el| el.inner_text().to_string()))
    }

    /// Text of the first element matching `selector`.
    pub fn text(&self, selector: &str) -> Result<String, ScrapeError> {
        self.maybe_text(selector)?
            .ok_or_else(|| ScrapeError::Missing(selector.to_string()))
    }

    /// Text of every element matching `selector`, in document order.
    pub fn text_all(&self, selector: &str) -> Result<Vec<String>, ScrapeError> {
        Ok(self
            .page
            .query_all(selector)?
            .iter()
            .map(|el| el.inner_text().to_string())
            .collect())
    }

    /// `href` of every element matching `selector`, resolved against the current URL.
    ///
    /// Elements without an `href`, or whose `href` cannot be resolved, are skipped.
    pub fn links_all(&self, selector: &str) -> Result<Vec<String>, ScrapeError> {
        Ok(self.links_aligned(selector)?.into_iter().flatten().collect())
    }

    /// Like [`Session::links_all`], but one entry per matched element.
    ///
    /// Unusable links are `None`, so position `i` always refers to the `i`-th
    /// match and can be paired with another selector's results.
    pub fn links_aligned(&self, selector: &str) -> Result<Vec<Option<String>>, ScrapeError> {
        let base = Url::parse(self.page.url()).ok();
        let links = self
            .page
            .query_all(selector)?
            .iter()
            .map(|el| {
                let href = el.attr("href")?;
                match &base {
                    Some(base) => base.join(href).ok().map(String::from),
                    None => Url::parse(href).ok().map(String::from),
                }
            })
            .collect();
        Ok(links)
    }

    pub fn exists(&self, selector: &str) -> Result<bool, ScrapeError> {
        Ok(self.page.query(selector)?.is_some())
    }

    /// Store `item` unless the source is already at its cap.
    pub fn store(&self, item: Item) -> bool {
        if self.is_full() {
            debug!(source = %self.source, url = %item.source_url, "Item cap reached; dropping");
            return false;
        }
        debug!(
            source = %self.source,
            url = %item.source_url,
            needs_summary = item.needs_summary,
            "Stored item"
        );
        self.items.push(item);
        true
    }

    /// Report progress before a candidate is inspected.
    pub fn inspecting(&self, candidate: &Candidate, total: usize) {
        info!(
            event_kind = "candidate.inspecting",
            source = %self.source,
            position = candidate.index + 1,
            total,
            url = %candidate.url,
            "Inspecting candidate"
        );
    }

    /// Store a resolved candidate, or log why it produced nothing.
    pub fn settle(&self, candidate: &Candidate, outcome: Result<Option<Item>, ScrapeError>) {
        match outcome {
            Ok(Some(item)) => {
                self.store(item);
            }
            Ok(None) => info!(
                event_kind = "candidate.skipped",
                source = %self.source,
                url = %candidate.url,
                reason = "filtered",
                "Candidate is not news; skipping"
            ),
            Err(e) => warn!(
                event_kind = "candidate.skipped",
                source = %self.source,
                url = %candidate.url,
                error = %e,
                "Candidate extraction failed; skipping"
            ),
        }
    }

    /// Release the page session.
    pub async fn close(&mut self) {
        self.page.close().await;
    }
}

/// Build the extractors for `sources`, deduplicated and in digest order.
pub fn extractors(config: &Config, sources: &[SourceId]) -> Vec<Arc<dyn SourceExtractor>> {
    let mut sources = sources.to_vec();
    sources.sort();
    sources.dedup();

    sources
        .into_iter()
        .map(|source| -> Arc<dyn SourceExtractor> {
            match source {
                SourceId::Pbs => Arc::new(pbs::PbsExtractor::new(config.pbs.clone())),
                SourceId::Npr => Arc::new(npr::NprExtractor::new(config.npr.clone())),
                SourceId::Upi => Arc::new(upi::UpiExtractor::new(config.upi.clone())),
            }
        })
        .collect()
}
