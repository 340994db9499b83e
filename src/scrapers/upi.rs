//! UPI top news scraper.
//!
//! Most entries on [UPI's top news index](https://www.upi.com/Top_News/)
//! carry a lead next to the headline, so the bulk of this source is harvested
//! from the index alone. The few featured links without an embedded lead are
//! then visited one by one.
//!
//! Leads read like `"WASHINGTON, May 6 (UPI) -- The Senate voted ..."`; the
//! dateline before `") --"` is dropped. Every UPI item is already a lead.

use super::{Candidate, ScrapeError, Session, SourceExtractor, cap};
use crate::config::UpiConfig;
use crate::models::{Item, SourceId};
use async_trait::async_trait;
use tracing::{debug, info, instrument};

const INDEX_LEADS: &str = "div.content";
const INDEX_LEAD_LINKS: &str = "a.row";
const FEATURED_LINKS: &str = "a.col-md-4.col-sm-4";
const ARTICLE_LEAD: &str = "article > p";

const DATELINE_MARKER: &str = ") --";
const BYLINE_MARKER: &str = "-- ";

/// Leads-index extractor.
#[derive(Debug, Clone)]
pub struct UpiExtractor {
    config: UpiConfig,
}

impl UpiExtractor {
    pub fn new(config: UpiConfig) -> Self {
        Self { config }
    }

    /// Store the leads embedded in the index page.
    fn scrape_index(&self, session: &Session) -> Result<(), ScrapeError> {
        let mut leads = session.text_all(INDEX_LEADS)?;
        let mut links = session.links_aligned(INDEX_LEAD_LINKS)?;
        cap(&mut leads, self.config.index_leads);
        cap(&mut links, self.config.index_leads);

        for (lead, link) in leads.iter().zip(&links) {
            let Some(link) = link else {
                debug!(%lead, "Index entry has no usable link");
                continue;
            };
            if self.config.excluded_link_patterns.matches(link) {
                debug!(%link, "Skipping retrospective index entry");
                continue;
            }
            match Item::new(strip_dateline(lead), link.as_str(), false) {
                Ok(item) => {
                    session.store(item);
                }
                Err(e) => debug!(%link, error = %e, "Index entry has no usable lead"),
            }
        }
        Ok(())
    }

    /// Visit one featured article and take its opening paragraph as the lead.
    async fn scrape_article(
        &self,
        session: &mut Session,
        candidate: &Candidate,
    ) -> Result<Option<Item>, ScrapeError> {
        session
            .request(&candidate.url, self.config.article_delay())
            .await?;
        let paragraph = session.text(ARTICLE_LEAD)?;
        let item = Item::new(strip_byline(&paragraph), session.url(), false)?;
        Ok(Some(item))
    }
}

#[async_trait]
impl SourceExtractor for UpiExtractor {
    fn source(&self) -> SourceId {
        SourceId::Upi
    }

    #[instrument(level = "info", skip_all, fields(source = "upi"))]
    async fn run(&self, session: &mut Session) -> Result<(), ScrapeError> {
        session
            .request(&self.config.index_url, self.config.index_delay())
            .await?;
        self.scrape_index(session)?;
        info!(
            event_kind = "source.indexed",
            source = "upi",
            leads = session.output().len(),
            "Scraped leads from the UPI top news index"
        );

        let mut links = session.links_all(FEATURED_LINKS)?;
        links.retain(|link| !self.config.excluded_link_patterns.matches(link));
        let candidates = Candidate::enumerate(links);
        info!(
            event_kind = "source.indexed",
            source = "upi",
            candidates = candidates.len(),
            "Found extra UPI articles"
        );

        for candidate in &candidates {
            if session.is_full() {
                break;
            }
            session.inspecting(candidate, candidates.len());
            let outcome = self.scrape_article(session, candidate).await;
            session.settle(candidate, outcome);
        }
        Ok(())
    }
}

/// Keep only what follows a `") --"` dateline marker and the character after it.
fn strip_dateline(lead: &str) -> &str {
    match lead.find(DATELINE_MARKER) {
        Some(at) => {
            let mut rest = lead[at + DATELINE_MARKER.len()..].chars();
            rest.next();
            rest.as_str()
        }
        None => lead,
    }
}

/// Keep only what follows the first `"-- "` marker.
fn strip_byline(paragraph: &str) -> &str {
    match paragraph.find(BYLINE_MARKER) {
        Some(at) => &paragraph[at + BYLINE_MARKER.len()..],
        None => paragraph,
    }
}
