//! Digest assembly: summarize what needs it, then build the edition.
//!
//! Every text flagged `needs_summary` across all sources is sent to the
//! summarization gateway in a single batch, in [`SourceId`] order and then
//! discovery order. The returned summaries are spliced back into exactly
//! those positions.
//!
//! [`SourceId`]: crate::models::SourceId

use crate::models::{Digest, DigestSection, HarvestResult};
use crate::summarizer::{GatewayError, Summarize};
use crate::utils::edition_for;
use chrono::{DateTime, Local};
use clap::ValueEnum;
use std::time::Instant;
use tracing::{error, info, instrument, warn};

/// What to do with long texts when the summarizer fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum SummaryFallback {
    /// Print the un-summarized text in place of the summary.
    #[default]
    Keep,
    /// Fail the run with the summarizer's error.
    Abort,
}

/// Replace every needs-summary text in `harvest` with its summary.
///
/// Makes at most one gateway call. A summary that comes back empty leaves
/// the original text in place, so items never end up with empty text.
///
/// # Returns
///
/// The number of texts replaced. With [`SummaryFallback::Keep`] a gateway
/// error is logged and `Ok(0)` is returned with `harvest` untouched.
#[instrument(level = "info", skip_all, fields(?fallback))]
pub async fn summarize_harvest<S>(
    harvest: &mut HarvestResult,
    summarizer: &S,
    fallback: SummaryFallback,
) -> Result<usize, GatewayError>
where
    S: Summarize,
{
    let texts: Vec<String> = harvest
        .values()
        .flatten()
        .filter(|item| item.needs_summary)
        .map(|item| item.text.clone())
        .collect();
    if texts.is_empty() {
        info!("Nothing needs summarizing");
        return Ok(0);
    }

    let t0 = Instant::now();
    info!(
        event_kind = "summary.started",
        count = texts.len(),
        "Sending texts to the summarizer"
    );

    let summaries = match summarizer.summarize(&texts).await {
        Ok(summaries) => summaries,
        Err(e) => {
            error!(
                event_kind = "summary.failed",
                count = texts.len(),
                error = %e,
                "Summarizer failed"
            );
            return match fallback {
                SummaryFallback::Keep => {
                    warn!(count = texts.len(), "Keeping the un-summarized texts");
                    Ok(0)
                }
                SummaryFallback::Abort => Err(e),
            };
        }
    };

    let mut replaced = 0;
    let targets = harvest
        .values_mut()
        .flatten()
        .filter(|item| item.needs_summary);
    for (item, summary) in targets.zip(summaries) {
        if summary.trim().is_empty() {
            warn!(url = %item.source_url, "Empty summary; keeping the original text");
            continue;
        }
        item.text = summary;
        replaced += 1;
    }

    info!(
        event_kind = "summary.completed",
        count = texts.len(),
        replaced,
        elapsed_ms = t0.elapsed().as_millis() as u64,
        "Summaries spliced into the harvest"
    );
    Ok(replaced)
}

/// Build the edition for the current local time.
pub fn assemble(harvest: HarvestResult) -> Digest {
    assemble_at(harvest, Local::now())
}

/// Build the edition as of `now`. Sections follow [`SourceId`] order.
///
/// [`SourceId`]: crate::models::SourceId
pub fn assemble_at(harvest: HarvestResult, now: DateTime<Local>) -> Digest {
    let sections = harvest
        .into_iter()
        .map(|(source, items)| DigestSection { source, items })
        .collect();
    Digest {
        local_date: now.date_naive().to_string(),
        time_of_day: edition_for(now.time()).to_string(),
        local_time: now.time().format("%H:%M:%S").to_string(),
        sections,
    }
}
