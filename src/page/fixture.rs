//! In-memory pages for tests.

use super::{Browser, Document, Page, PageError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Serves canned HTML per URL and records every navigation.
#[derive(Debug, Clone, Default)]
pub struct FixtureBrowser {
    pages: HashMap<String, String>,
    visits: Arc<Mutex<Vec<String>>>,
    closed: Arc<AtomicUsize>,
    dropped: Arc<AtomicUsize>,
}

impl FixtureBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: &str, html: &str) -> Self {
        self.pages.insert(url.to_string(), html.to_string());
        self
    }

    /// Every URL navigated to by any session, in order.
    pub fn visits(&self) -> Vec<String> {
        self.visits.lock().unwrap().clone()
    }

    /// Sessions released with [`Page::close`].
    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    /// Sessions that no longer exist, closed or not.
    pub fn dropped(&self) -> usize {
        self.dropped.load(Ordering::SeqCst)
    }

    pub fn page(&self) -> FixturePage {
        FixturePage {
            pages: self.pages.clone(),
            visits: Arc::clone(&self.visits),
            closed: Arc::clone(&self.closed),
            dropped: Arc::clone(&self.dropped),
            document: None,
        }
    }
}

#[async_trait]
impl Browser for FixtureBrowser {
    async fn new_session(&self) -> Result<Box<dyn Page>, PageError> {
        Ok(Box::new(self.page()))
    }
}

#[derive(Debug)]
pub struct FixturePage {
    pages: HashMap<String, String>,
    visits: Arc<Mutex<Vec<String>>>,
    closed: Arc<AtomicUsize>,
    dropped: Arc<AtomicUsize>,
    document: Option<Document>,
}

#[async_trait]
impl Page for FixturePage {
    async fn navigate(&mut self, url: &str) -> Result<(), PageError> {
        self.visits.lock().unwrap().push(url.to_string());
        let html = self
            .pages
            .get(url)
            .ok_or_else(|| PageError::NotFound(url.to_string()))?;
        self.document = Some(Document::new(url, html.as_str()));
        Ok(())
    }

    fn document(&self) -> Option<&Document> {
        self.document.as_ref()
    }

    async fn close(&mut self) {
        self.document = None;
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}

impl Drop for FixturePage {
    fn drop(&mut self) {
        self.dropped.fetch_add(1, Ordering::SeqCst);
    }
}
