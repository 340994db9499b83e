//! # Journalight Digest
//!
//! A news harvesting pipeline that collects recent leads from a fixed set of
//! news sites, summarizes the long-form ones with an external summarizer, and
//! prints a per-source digest.
//!
//! ## Features
//!
//! - Harvests PBS NewsHour, NPR and UPI concurrently, one isolated page
//!   session per source
//! - Classifies every item as a ready-to-print lead or a body that needs
//!   summarizing
//! - Summarizes all long texts in one batch through an external process
//! - Prints the digest and optionally writes JSON and Markdown editions
//!
//! ## Usage
//!
//! ```sh
//! journalight_digest -c config.yaml -j ./json -m ./markdown
//! ```
//!
//! ## Architecture
//!
//! 1. **Harvesting**: Every source extractor runs on its own task and session
//! 2. **Summarizing**: Needs-summary texts go to the summarizer in one batch
//! 3. **Assembly**: Summaries are spliced back and the edition is built
//! 4. **Output**: Console listing, plus JSON and Markdown files on request

use clap::Parser;
use std::error::Error;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod config;
mod digest;
mod harvest;
mod models;
mod outputs;
mod page;
mod scrapers;
mod summarizer;
mod utils;

use cli::Cli;
use config::Config;
use harvest::Harvester;
use outputs::{console, json, markdown};
use page::http::HttpBrowser;
use summarizer::RetrySummarize;
use utils::ensure_writable_dir;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!(
        version = env!("CARGO_PKG_VERSION"),
        "journalight_digest starting up"
    );

    // Parse CLI
    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    // ---- Load config & apply overrides ----
    let mut config = Config::load(args.config.as_deref()).await?;
    if let Some(program) = &args.summarizer_program {
        config.summarizer.program = program.clone();
    }
    let sources = if args.sources.is_empty() {
        config.enabled_sources()
    } else {
        args.sources.clone()
    };
    if sources.is_empty() {
        warn!("No sources selected; the digest will be empty");
    }

    // Early check: ensure output dirs are writable before spending minutes harvesting
    for dir in [&args.json_output_dir, &args.markdown_output_dir]
        .into_iter()
        .flatten()
    {
        if let Err(e) = ensure_writable_dir(dir).await {
            error!(
                path = %dir,
                error = %e,
                "Output directory is not writable (fix perms or choose a different path)"
            );
            return Err(e);
        }
    }

    // ---- Harvest ----
    let browser = Arc::new(HttpBrowser::new(
        config.user_agent.clone(),
        config.navigation_timeout(),
    ));
    let harvester = Harvester::new(
        browser,
        scrapers::extractors(&config, &sources),
        config.max_items,
    );
    let mut harvest = harvester.run().await?;

    // ---- Summarize ----
    if args.no_summary {
        info!("Summarizer disabled; printing long texts as harvested");
    } else {
        let summarizer = RetrySummarize::from_config(&config.summarizer);
        digest::summarize_harvest(&mut harvest, &summarizer, args.on_summary_failure).await?;
    }

    // ---- Output ----
    let digest = digest::assemble(harvest);
    info!(
        edition = %digest.time_of_day,
        date = %digest.local_date,
        items = digest.item_count(),
        "Digest assembled"
    );
    print!("{}", console::render(&digest));

    if let Some(dir) = &args.json_output_dir {
        if let Err(e) = json::write_digest(&digest, dir).await {
            error!(error = %e, "Failed to write JSON digest");
        }
    }
    if let Some(dir) = &args.markdown_output_dir {
        if let Err(e) = markdown::write_digest(&digest, dir).await {
            error!(error = %e, "Failed to write Markdown digest");
        }
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );

    Ok(())
}
