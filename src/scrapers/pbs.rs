//! PBS NewsHour scraper.
//!
//! The [latest timeline](https://www.pbs.org/newshour/latest) mixes two kinds
//! of pages:
//!
//! 1. **Transcripts**: a broadcast summary followed by its transcript. Only
//!    the summary paragraph is kept. Interviews about books, reports and
//!    series are not news and are skipped. "News Wrap" segments keep their
//!    whole intro; other segments lose the intro's last sentence, which only
//!    introduces the guest.
//! 2. **Publications**: ordinary articles. A dateline lead separated by an em
//!    dash is used as-is; otherwise the whole body goes to the summarizer.

use super::{Candidate, ScrapeError, Session, SourceExtractor, cap};
use crate::config::PbsConfig;
use crate::models::{Item, SourceId};
use async_trait::async_trait;
use itertools::Itertools;
use tracing::{debug, info, instrument};
use unicode_segmentation::UnicodeSegmentation;

const INDEX_LINKS: &str = "a.card-timeline__title";
const TRANSCRIPT_MARKER: &str = "#transcript";
const TRANSCRIPT_INTRO: &str = "div#transcript p";
const TITLE: &str = "title";
const BODY_PARAGRAPHS: &str = "div.body-text > p";

const NEWS_WRAP_TITLE: &str = "News Wrap";
const NEWS_WRAP_PHRASE: &str = "In our news wrap";
const NEWS_WRAP_REPLACEMENT: &str = "This";
const EM_DASH: char = '\u{2014}';

/// Dual-layout extractor.
#[derive(Debug, Clone)]
pub struct PbsExtractor {
    config: PbsConfig,
}

impl PbsExtractor {
    pub fn new(config: PbsConfig) -> Self {
        Self { config }
    }

    async fn parse_candidate(
        &self,
        session: &mut Session,
        candidate: &Candidate,
    ) -> Result<Option<Item>, ScrapeError> {
        session
            .request(&candidate.url, self.config.article_delay())
            .await?;
        if session.exists(TRANSCRIPT_MARKER)? {
            self.parse_transcript(session)
        } else {
            self.parse_publication(session)
        }
    }

    /// Keep the broadcast summary of a transcript page.
    fn parse_transcript(&self, session: &Session) -> Result<Option<Item>, ScrapeError> {
        let intro = session.text(TRANSCRIPT_INTRO)?;
        if self.config.non_news_markers.matches(&intro) {
            debug!(url = %session.url(), "Transcript is not about news");
            return Ok(None);
        }

        let title = session.maybe_text(TITLE)?.unwrap_or_default();
        let text = if title.starts_with(NEWS_WRAP_TITLE) {
            intro.replace(NEWS_WRAP_PHRASE, NEWS_WRAP_REPLACEMENT)
        } else {
            let trimmed = remove_last_sentence(&intro);
            if trimmed.is_empty() {
                debug!(url = %session.url(), "Intro is only an introduction");
                return Ok(None);
            }
            trimmed
        };

        Ok(Some(Item::new(text, session.url(), false)?))
    }

    /// Keep a publication's em-dash lead, or its cleaned body for summarizing.
    fn parse_publication(&self, session: &Session) -> Result<Option<Item>, ScrapeError> {
        let first = session.text(BODY_PARAGRAPHS)?;
        if let Some(lead) = lead_after_em_dash(&first) {
            return Ok(Some(Item::new(lead, session.url(), false)?));
        }

        let body = session
            .text_all(BODY_PARAGRAPHS)?
            .into_iter()
            .filter(|p| !self.config.promo_patterns.matches(p))
            .join(" ");
        Ok(Some(Item::new(body, session.url(), true)?))
    }
}

/// Everything after the first em dash, minus the single character that follows it.
fn lead_after_em_dash(paragraph: &str) -> Option<&str> {
    let at = paragraph.find(EM_DASH)?;
    let mut rest = paragraph[at + EM_DASH.len_utf8()..].chars();
    rest.next();
    Some(rest.as_str())
}

/// Drop the final sentence using Unicode sentence boundaries.
fn remove_last_sentence(text: &str) -> String {
    let mut sentences: Vec<&str> = text.split_sentence_bounds().collect();
    sentences.pop();
    sentences.concat().trim_end().to_string()
}

#[async_trait]
impl SourceExtractor for PbsExtractor {
    fn source(&self) -> SourceId {
        SourceId::Pbs
    }

    #[instrument(level = "info", skip_all, fields(source = "pbs"))]
    async fn run(&self, session: &mut Session) -> Result<(), ScrapeError> {
        session
            .request(&self.config.index_url, self.config.index_delay())
            .await?;
        let mut links = session.links_all(INDEX_LINKS)?;
        cap(&mut links, session.remaining());
        let candidates = Candidate::enumerate(links);
        info!(
            event_kind = "source.indexed",
            source = "pbs",
            candidates = candidates.len(),
            "Found candidates from PBS NewsHour"
        );

        for candidate in &candidates {
            if session.is_full() {
                break;
            }
            session.inspecting(candidate, candidates.len());
            let outcome = self.parse_candidate(session, candidate).await;
            session.settle(candidate, outcome);
        }
        Ok(())
    }
}
