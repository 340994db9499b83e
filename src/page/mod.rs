//! Page capability: a browser-like session the scrapers drive.
//!
//! A [`Browser`] hands out isolated sessions; each session is a [`Page`] that
//! can navigate to a URL and answer selector queries against the document it
//! currently holds. Sessions are never shared between workers.
//!
//! # Implementations
//!
//! | Type | Module | Notes |
//! |------|--------|-------|
//! | [`http::HttpBrowser`] | [`http`] | Fetches with `reqwest`, parses with `scraper` |
//! | `fixture::FixtureBrowser` | `fixture` | Canned HTML per URL, tests only |
//!
//! Both implementations share [`Document`], so selector semantics and text
//! normalization are identical in tests and in production.

pub mod http;

#[cfg(test)]
pub mod fixture;

use async_trait::async_trait;
use itertools::Itertools;
use scraper::{ElementRef, Html, Selector};
use thiserror::Error;

/// Errors raised by the page capability.
#[derive(Debug, Error)]
pub enum PageError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{url} answered with HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("invalid selector '{selector}': {reason}")]
    Selector { selector: String, reason: String },

    #[error("no document loaded; navigate first")]
    NoDocument,

    #[error("nothing to load at {0}")]
    NotFound(String),
}

/// A snapshot of one element matched by a selector.
///
/// Snapshots own their data, so they outlive the parsed document and can be
/// held across await points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    text: String,
    attributes: Vec<(String, String)>,
}

impl Element {
    fn from_ref(element: ElementRef<'_>) -> Self {
        let raw: String = element.text().collect();
        Self {
            text: raw.split_whitespace().join(" "),
            attributes: element
                .value()
                .attrs()
                .map(|(name, value)| (name.to_string(), value.to_string()))
                .collect(),
        }
    }

    /// Rendered text with whitespace runs collapsed to a single space.
    pub fn inner_text(&self) -> &str {
        &self.text
    }

    /// Value of the named attribute, if present.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// The document a session currently holds.
///
/// Holds the source text rather than a parsed [`Html`] tree: `Html` is not
/// `Send`, and sessions move across tokio worker threads between awaits.
/// Each query parses the text and drops the tree before returning.
#[derive(Debug, Clone)]
pub struct Document {
    url: String,
    html: String,
}

impl Document {
    pub fn new(url: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            html: html.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// All elements matching `selector`, in document order.
    pub fn select_all(&self, selector: &str) -> Result<Vec<Element>, PageError> {
        let selector = parse_selector(selector)?;
        let html = Html::parse_document(&self.html);
        Ok(html.select(&selector).map(Element::from_ref).collect())
    }

    /// The first element matching `selector`.
    pub fn select_first(&self, selector: &str) -> Result<Option<Element>, PageError> {
        let selector = parse_selector(selector)?;
        let html = Html::parse_document(&self.html);
        let first = html.select(&selector).next().map(Element::from_ref);
        Ok(first)
    }
}

fn parse_selector(selector: &str) -> Result<Selector, PageError> {
    Selector::parse(selector).map_err(|e| PageError::Selector {
        selector: selector.to_string(),
        reason: format!("{e:?}"),
    })
}

/// Factory for isolated page sessions.
#[async_trait]
pub trait Browser: Send + Sync {
    /// Open a fresh session that shares no mutable state with any other.
    async fn new_session(&self) -> Result<Box<dyn Page>, PageError>;
}

/// One single-threaded page session.
#[async_trait]
pub trait Page: Send {
    /// Load `url`, replacing the current document.
    async fn navigate(&mut self, url: &str) -> Result<(), PageError>;

    /// The currently loaded document, if any.
    fn document(&self) -> Option<&Document>;

    /// Release the session's resources. Further navigation is not expected.
    async fn close(&mut self);

    /// First element matching `selector`.
    fn query(&self, selector: &str) -> Result<Option<Element>, PageError> {
        self.document()
            .ok_or(PageError::NoDocument)?
            .select_first(selector)
    }

    /// Every element matching `selector`, in document order.
    fn query_all(&self, selector: &str) -> Result<Vec<Element>, PageError> {
        self.document()
            .ok_or(PageError::NoDocument)?
            .select_all(selector)
    }

    /// URL of the current document after redirects; empty before the first navigation.
    fn url(&self) -> &str {
        self.document().map(Document::url).unwrap_or_default()
    }
}
