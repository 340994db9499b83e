//! Harvest orchestration: one isolated session and one task per source.
//!
//! Every source extractor runs as its own tokio task on its own page session,
//! so per-article politeness delays in one source never hold up another.
//! The orchestrator waits for all of them, closes every session, and only
//! then assembles the [`HarvestResult`].
//!
//! # Failure Isolation
//!
//! | What happens | Effect |
//! |--------------|--------|
//! | A candidate fails | Skipped inside the extractor |
//! | An extractor returns an error | That source keeps the items it stored so far |
//! | An extractor panics | Same as above; the session is dropped with the task |
//! | A session cannot be opened | That source is present with no items |
//! | A task is cancelled | The harvest fails with [`HarvestError::Interrupted`] |

use crate::models::{HarvestResult, SourceId};
use crate::page::Browser;
use crate::scrapers::{ItemSink, Session, SourceExtractor};
use futures::future::join_all;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{error, info, instrument};

/// Errors that abort a whole harvest.
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("harvest interrupted while waiting for the {source_id} worker: {reason}")]
    Interrupted { source_id: SourceId, reason: String },
}

/// Runs every configured source extractor concurrently.
pub struct Harvester {
    browser: Arc<dyn Browser>,
    extractors: Vec<Arc<dyn SourceExtractor>>,
    limit: usize,
}

impl Harvester {
    /// # Arguments
    ///
    /// * `browser` - Opens one session per source
    /// * `extractors` - One per source; the set of sources in the result
    /// * `limit` - Per-source item cap
    pub fn new(
        browser: Arc<dyn Browser>,
        extractors: Vec<Arc<dyn SourceExtractor>>,
        limit: usize,
    ) -> Self {
        Self {
            browser,
            extractors,
            limit,
        }
    }

    /// Harvest every source.
    ///
    /// # Returns
    ///
    /// A map with exactly one entry per extractor, or [`HarvestError`] if
    /// waiting on a worker was interrupted. Sessions are closed in both cases.
    #[instrument(level = "info", skip_all, fields(sources = self.extractors.len()))]
    pub async fn run(&self) -> Result<HarvestResult, HarvestError> {
        let t0 = Instant::now();
        info!(
            event_kind = "harvest.started",
            sources = ?self.extractors.iter().map(|e| e.source()).collect::<Vec<_>>(),
            "Starting harvest"
        );

        let mut result: HarvestResult = BTreeMap::new();
        let mut workers: Vec<(SourceId, ItemSink)> = Vec::new();
        let mut handles = Vec::new();

        for extractor in &self.extractors {
            let source = extractor.source();
            result.insert(source, Vec::new());

            let page = match self.browser.new_session().await {
                Ok(page) => page,
                Err(e) => {
                    error!(
                        event_kind = "source.failed",
                        %source,
                        error = %e,
                        "Could not open a page session"
                    );
                    continue;
                }
            };

            let session = Session::new(source, page, self.limit);
            workers.push((source, session.sink()));
            let extractor = Arc::clone(extractor);
            handles.push(tokio::spawn(work(extractor, session)));
        }

        let joined = join_all(handles).await;

        let mut interrupted = None;
        for ((source, _), outcome) in workers.iter().zip(joined) {
            match outcome {
                Ok(mut session) => session.close().await,
                Err(e) if e.is_panic() => error!(
                    event_kind = "source.failed",
                    source = %source,
                    "Worker panicked; keeping the items it stored"
                ),
                Err(e) => {
                    error!(source = %source, error = %e, "Worker was cancelled");
                    interrupted.get_or_insert(HarvestError::Interrupted {
                        source_id: *source,
                        reason: e.to_string(),
                    });
                }
            }
        }

        for (source, sink) in workers {
            result.insert(source, sink.snapshot());
        }

        if let Some(err) = interrupted {
            return Err(err);
        }

        info!(
            event_kind = "harvest.completed",
            elapsed_ms = t0.elapsed().as_millis() as u64,
            items = result.values().map(Vec::len).sum::<usize>(),
            "Harvest complete"
        );
        Ok(result)
    }
}

/// Run one extractor to completion and hand its session back for teardown.
async fn work(extractor: Arc<dyn SourceExtractor>, mut session: Session) -> Session {
    let source = extractor.source();
    let t0 = Instant::now();
    match extractor.run(&mut session).await {
        Ok(()) => info!(
            event_kind = "source.completed",
            %source,
            items = session.output().len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Source complete"
        ),
        Err(e) => error!(
            event_kind = "source.failed",
            %source,
            error = %e,
            items = session.output().len(),
            "Source run failed; keeping the items it stored"
        ),
    }
    session
}
