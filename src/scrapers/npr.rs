//! NPR news section scraper.
//!
//! NPR leads are editorial rather than factual, so each article's full body
//! is extracted and always sent for summarization. Candidates whose section
//! tag points at a series or book review are dropped before any article is
//! visited.

use super::{Candidate, ScrapeError, Session, SourceExtractor, cap};
use crate::config::NprConfig;
use crate::models::{Item, SourceId};
use async_trait::async_trait;
use itertools::Itertools;
use tracing::{debug, info, instrument};

const INDEX_LINKS: &str = "h2.title > a";
const SECTION_LINKS: &str = "div.slug-wrap > h3.slug > a";
const PARAGRAPHS: &str = "div#storytext > p";
const SECTION_HEADERS: &str = "div#storytext > p > strong";

const EDITORS_NOTE: &str = "Editor's note";

/// Editorial-lead extractor.
#[derive(Debug, Clone)]
pub struct NprExtractor {
    config: NprConfig,
}

impl NprExtractor {
    pub fn new(config: NprConfig) -> Self {
        Self { config }
    }

    /// Index links whose positionally aligned section tag is not excluded.
    ///
    /// A headline or section tag without a usable link keeps its slot, so the
    /// pairing never drifts. A missing section tag excludes nothing.
    fn candidates(&self, session: &Session) -> Result<Vec<Candidate>, ScrapeError> {
        let mut links = session.links_aligned(INDEX_LINKS)?;
        cap(&mut links, session.remaining());

        let mut sections = session.links_aligned(SECTION_LINKS)?;
        cap(&mut sections, links.len());

        let candidates = links
            .into_iter()
            .enumerate()
            .filter_map(|(index, url)| Some(Candidate { index, url: url? }))
            .filter(|candidate| match sections.get(candidate.index) {
                Some(Some(section)) if self.config.excluded_section_patterns.matches(section) => {
                    debug!(url = %candidate.url, %section, "Skipping non-news section");
                    false
                }
                _ => true,
            })
            .collect();
        Ok(candidates)
    }

    async fn parse_article(
        &self,
        session: &mut Session,
        candidate: &Candidate,
    ) -> Result<Option<Item>, ScrapeError> {
        session
            .request(&candidate.url, self.config.article_delay())
            .await?;

        let paragraphs = session.text_all(PARAGRAPHS)?;
        let headers = session.text_all(SECTION_HEADERS)?;
        let text = article_text(paragraphs, &headers);

        let item = Item::new(text, session.url(), true)?;
        Ok(Some(item))
    }
}

/// Join body paragraphs, minus a leading editor's note and bolded section headers.
fn article_text(mut paragraphs: Vec<String>, headers: &[String]) -> String {
    if paragraphs
        .first()
        .is_some_and(|first| first.starts_with(EDITORS_NOTE))
    {
        paragraphs.remove(0);
    }
    paragraphs
        .iter()
        .filter(|p| !p.is_empty() && !headers.contains(*p))
        .join(" ")
}

#[async_trait]
impl SourceExtractor for NprExtractor {
    fn source(&self) -> SourceId {
        SourceId::Npr
    }

    #[instrument(level = "info", skip_all, fields(source = "npr"))]
    async fn run(&self, session: &mut Session) -> Result<(), ScrapeError> {
        session
            .request(&self.config.index_url, self.config.index_delay())
            .await?;
        let candidates = self.candidates(session)?;
        info!(
            event_kind = "source.indexed",
            source = "npr",
            candidates = candidates.len(),
            "Found candidates from NPR's news section"
        );

        for candidate in &candidates {
            if session.is_full() {
                break;
            }
            session.inspecting(candidate, candidates.len());
            let outcome = self.parse_article(session, candidate).await;
            session.settle(candidate, outcome);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::page::fixture::FixtureBrowser;

    const INDEX_URL: &str = "https://www.npr.org/sections/news/";

    fn extractor() -> NprExtractor {
        NprExtractor::new(NprConfig {
            article_delay_secs: 0,
            ..Config::default().npr
        })
    }

    fn index_html(entries: &[(&str, &str)]) -> String {
        let mut html = String::from("<html><body>");
        for (href, section) in entries {
            html.push_str(&format!(
                r#"<article><div class="slug-wrap"><h3 class="slug"><a href="{section}">Section</a></h3></div>
                   <h2 class="title"><a href="{href}">Headline</a></h2></article>"#
            ));
        }
        html.push_str("</body></html>");
        html
    }

    fn article_html(paragraphs: &[&str]) -> String {
        let body: String = paragraphs.iter().map(|p| format!("<p>{p}</p>")).collect();
        format!(r#"<html><body><div id="storytext">{body}</div></body></html>"#)
    }

    #[test]
    fn test_article_text_drops_editors_note_and_headers() {
        let paragraphs = vec![
            "Editor's note: This story contains graphic details.".to_string(),
            "The storm made landfall overnight.".to_string(),
            "Damage".to_string(),
            "Thousands lost power.".to_string(),
        ];
        let headers = vec!["Damage".to_string()];
        assert_eq!(
            article_text(paragraphs, &headers),
            "The storm made landfall overnight. Thousands lost power."
        );
    }

    #[test]
    fn test_article_text_keeps_a_non_leading_editors_note() {
        let paragraphs = vec![
            "First.".to_string(),
            "Editor's note: Updated.".to_string(),
        ];
        assert_eq!(article_text(paragraphs, &[]), "First. Editor's note: Updated.");
    }

    #[tokio::test]
    async fn test_series_and_book_reviews_are_excluded() {
        let index = index_html(&[
            ("/2025/05/06/1/storm", "/sections/national/"),
            ("/2025/05/06/2/doc", "/series/12345/the-long-road/"),
            ("/2025/05/06/3/novel", "/sections/book-reviews/"),
            ("/2025/05/06/4/vote", "/sections/politics/"),
        ]);
        let browser = FixtureBrowser::new()
            .with_page(INDEX_URL, &index)
            .with_page(
                "https://www.npr.org/2025/05/06/1/storm",
                &article_html(&["Editor's note: Graphic.", "A storm hit.", "<strong>Aftermath</strong>", "Crews responded."]),
            )
            .with_page(
                "https://www.npr.org/2025/05/06/4/vote",
                &article_html(&["The House voted."]),
            );

        let mut session = Session::new(SourceId::Npr, Box::new(browser.page()), 10);
        extractor().run(&mut session).await.unwrap();
        let items = session.output();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].text, "A storm hit. Crews responded.");
        assert_eq!(items[0].source_url, "https://www.npr.org/2025/05/06/1/storm");
        assert!(items.iter().all(|i| i.needs_summary));
        assert_eq!(items[1].text, "The House voted.");
        assert!(!browser.visits().iter().any(|u| u.contains("/doc") || u.contains("/novel")));
    }

    #[tokio::test]
    async fn test_section_without_link_keeps_alignment() {
        let index = r#"<html><body>
            <article><div class="slug-wrap"><h3 class="slug"><a>Untagged</a></h3></div>
              <h2 class="title"><a href="/2025/05/06/1/news">Headline</a></h2></article>
            <article><div class="slug-wrap"><h3 class="slug"><a href="/series/1/doc/">Series</a></h3></div>
              <h2 class="title"><a href="/2025/05/06/2/doc">Headline</a></h2></article>
            </body></html>"#;
        let browser = FixtureBrowser::new()
            .with_page(INDEX_URL, index)
            .with_page(
                "https://www.npr.org/2025/05/06/1/news",
                &article_html(&["Real news."]),
            )
            .with_page(
                "https://www.npr.org/2025/05/06/2/doc",
                &article_html(&["A documentary series."]),
            );

        let mut session = Session::new(SourceId::Npr, Box::new(browser.page()), 10);
        extractor().run(&mut session).await.unwrap();
        let urls: Vec<String> = session.output().into_iter().map(|i| i.source_url).collect();
        assert_eq!(urls, vec!["https://www.npr.org/2025/05/06/1/news"]);
    }

    #[tokio::test]
    async fn test_empty_article_is_skipped() {
        let index = index_html(&[
            ("/2025/05/06/1/empty", "/sections/national/"),
            ("/2025/05/06/2/full", "/sections/national/"),
        ]);
        let browser = FixtureBrowser::new()
            .with_page(INDEX_URL, &index)
            .with_page("https://www.npr.org/2025/05/06/1/empty", "<html><body></body></html>")
            .with_page(
                "https://www.npr.org/2025/05/06/2/full",
                &article_html(&["Body text."]),
            );

        let mut session = Session::new(SourceId::Npr, Box::new(browser.page()), 10);
        extractor().run(&mut session).await.unwrap();
        let items = session.output();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].text, "Body text.");
    }

    #[tokio::test]
    async fn test_at_most_ten_candidates() {
        let entries: Vec<(String, String)> = (0..12)
            .map(|n| (format!("/2025/05/06/{n}/story"), "/sections/national/".to_string()))
            .collect();
        let entries: Vec<(&str, &str)> = entries
            .iter()
            .map(|(h, s)| (h.as_str(), s.as_str()))
            .collect();
        let mut browser = FixtureBrowser::new().with_page(INDEX_URL, &index_html(&entries));
        for n in 0..12 {
            browser = browser.with_page(
                &format!("https://www.npr.org/2025/05/06/{n}/story"),
                &article_html(&[&format!("Story {n}.")]),
            );
        }

        let mut session = Session::new(SourceId::Npr, Box::new(browser.page()), 10);
        extractor().run(&mut session).await.unwrap();
        assert_eq!(session.output().len(), 10);
        assert_eq!(browser.visits().len(), 11);
    }
}
