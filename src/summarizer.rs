//! Summarization gateway with exponential backoff retry logic.
//!
//! Long texts are compressed by an external summarization process. The whole
//! batch for a run is sent in one request so the process (and the model it
//! loads) starts once.
//!
//! # Wire Format
//!
//! The request is a single line on the process's stdin holding a JSON array
//! of strings. The response is the first non-blank line of its stdout: a
//! JSON array of strings with the same length and order.
//!
//! ```text
//! stdin:  ["long text one", "long text two"]\n
//! stdout: ["summary one", "summary two"]\n
//! ```
//!
//! # Architecture
//!
//! - [`Summarize`]: Core trait for turning a batch of texts into summaries
//! - [`ProcessSummarizer`]: Talks to the external process over stdio
//! - [`RetrySummarize`]: Decorator that retries transient failures
//!
//! # Retry Strategy
//!
//! Only launch and process failures are retried; a malformed or
//! wrong-length response is returned immediately.
//!
//! - Exponential backoff from a configurable base delay
//! - Maximum delay capped at 30 seconds
//! - Random jitter (0-250ms) added to each delay

use crate::config::SummarizerConfig;
use crate::utils::{looks_truncated, truncate_for_log};
use rand::{Rng, rng};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::process::Stdio;
use std::time::{Duration as StdDuration, Instant};
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};

/// Ways the summarization gateway can fail.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("could not run summarizer '{program}': {source}")]
    Unavailable {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("summarizer exited with {status}: {stderr}")]
    ProcessFailed { status: String, stderr: String },

    #[error("summarizer returned malformed output (truncated: {truncated}): {reason}")]
    MalformedResponse { reason: String, truncated: bool },

    #[error("summarizer returned {got} summaries for {expected} texts")]
    LengthMismatch { expected: usize, got: usize },

    #[error("could not encode summary request: {0}")]
    Encode(#[source] serde_json::Error),
}

impl GatewayError {
    /// Whether another attempt could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            GatewayError::Unavailable { .. } | GatewayError::ProcessFailed { .. }
        )
    }
}

/// Request message: the texts to summarize, in order.
#[derive(Debug, Serialize)]
#[serde(transparent)]
pub struct SummaryRequest<'a> {
    pub texts: &'a [String],
}

/// Response message: one summary per requested text, in the same order.
#[derive(Debug, Deserialize)]
#[serde(transparent)]
pub struct SummaryResponse {
    pub summaries: Vec<String>,
}

/// Trait for batch summarization.
///
/// Implementations return exactly one summary per input text, in input order,
/// or an error. An empty batch yields an empty result.
pub trait Summarize {
    async fn summarize(&self, texts: &[String]) -> Result<Vec<String>, GatewayError>;
}

/// Summarizes by running an external process and exchanging JSON over stdio.
#[derive(Debug, Clone)]
pub struct ProcessSummarizer {
    program: String,
    args: Vec<String>,
}

impl ProcessSummarizer {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    fn unavailable(&self, source: std::io::Error) -> GatewayError {
        GatewayError::Unavailable {
            program: self.program.clone(),
            source,
        }
    }
}

impl Summarize for ProcessSummarizer {
    #[instrument(level = "info", skip_all, fields(count = texts.len(), program = %self.program))]
    async fn summarize(&self, texts: &[String]) -> Result<Vec<String>, GatewayError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut request =
            serde_json::to_string(&SummaryRequest { texts }).map_err(GatewayError::Encode)?;
        request.push('\n');

        let t0 = Instant::now();
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| self.unavailable(e))?;

        // Feed stdin concurrently so a chatty process cannot fill its stdout pipe and stall us.
        let writer = child.stdin.take().map(|mut stdin| {
            tokio::spawn(async move {
                stdin.write_all(request.as_bytes()).await?;
                stdin.shutdown().await
            })
        });

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| self.unavailable(e))?;
        debug!(
            elapsed_ms = t0.elapsed().as_millis() as u64,
            status = %output.status,
            stdout_bytes = output.stdout.len(),
            "Summarizer exited"
        );

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(GatewayError::ProcessFailed {
                status: output.status.to_string(),
                stderr: truncate_for_log(stderr.trim(), 500),
            });
        }

        if let Some(writer) = writer {
            match writer.await {
                Ok(Ok(())) => {}
                // Exited successfully without reading everything; its answer still counts.
                Ok(Err(e)) if e.kind() == std::io::ErrorKind::BrokenPipe => {
                    debug!(error = %e, "Summarizer closed stdin early");
                }
                Ok(Err(e)) => return Err(self.unavailable(e)),
                Err(e) => return Err(self.unavailable(std::io::Error::other(e))),
            }
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let summaries = parse_response(&stdout, texts.len())?;
        Ok(summaries.iter().map(|s| polish_summary(s)).collect())
    }
}

/// Decode the first non-blank stdout line and check it answers every text.
fn parse_response(stdout: &str, expected: usize) -> Result<Vec<String>, GatewayError> {
    let line = stdout
        .lines()
        .find(|line| !line.trim().is_empty())
        .ok_or_else(|| GatewayError::MalformedResponse {
            reason: "no output".to_string(),
            truncated: false,
        })?;

    let response: SummaryResponse =
        serde_json::from_str(line).map_err(|e| GatewayError::MalformedResponse {
            reason: format!("{e}; got {}", truncate_for_log(line, 200)),
            truncated: looks_truncated(&e),
        })?;

    if response.summaries.len() != expected {
        return Err(GatewayError::LengthMismatch {
            expected,
            got: response.summaries.len(),
        });
    }
    Ok(response.summaries)
}

/// Tidy the small defects generated summaries tend to have.
///
/// Trims whitespace, closes up `" ."`, and ends a summary whose last
/// character is a closing quote with a period inside the quote.
pub fn polish_summary(summary: &str) -> String {
    let mut text = summary.trim().replace(" .", ".");
    if let Some(body) = text.strip_suffix('"') {
        if !body.ends_with(['.', '!', '?']) {
            text = format!("{body}.\"");
        }
    }
    text
}

/// Wrapper that adds exponential backoff retry logic to any [`Summarize`] implementation.
///
/// The delay between retries follows this formula:
/// ```text
/// delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..250ms)
/// ```
pub struct RetrySummarize<T> {
    /// The underlying summarizer to wrap.
    inner: T,
    /// Maximum number of retry attempts before giving up.
    max_retries: usize,
    /// Initial delay between retries (doubles with each attempt).
    base_delay: StdDuration,
    /// Maximum delay cap to prevent excessive waiting.
    max_delay: StdDuration,
}

impl<T> RetrySummarize<T>
where
    T: Summarize,
{
    pub fn new(inner: T, max_retries: usize, base_delay: StdDuration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: StdDuration::from_secs(30),
        }
    }
}

impl RetrySummarize<ProcessSummarizer> {
    /// Process summarizer with the retry policy from the config file.
    pub fn from_config(config: &SummarizerConfig) -> Self {
        Self::new(
            ProcessSummarizer::new(config.program.clone(), config.args.clone()),
            config.max_retries,
            StdDuration::from_millis(config.base_delay_ms),
        )
    }
}

impl<T> fmt::Debug for RetrySummarize<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetrySummarize")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

impl<T> Summarize for RetrySummarize<T>
where
    T: Summarize,
{
    #[instrument(level = "info", skip_all, fields(count = texts.len()))]
    async fn summarize(&self, texts: &[String]) -> Result<Vec<String>, GatewayError> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            let attempt_t0 = Instant::now();
            match self.inner.summarize(texts).await {
                Ok(summaries) => {
                    info!(
                        attempts = attempt + 1,
                        elapsed_ms_total = total_t0.elapsed().as_millis() as u64,
                        "summarize() succeeded"
                    );
                    return Ok(summaries);
                }
                Err(e) => {
                    attempt += 1;
                    let attempt_dt = attempt_t0.elapsed();
                    let total_dt = total_t0.elapsed();

                    if !e.is_retryable() || attempt > self.max_retries {
                        error!(
                            attempt,
                            max = self.max_retries,
                            elapsed_ms_attempt = attempt_dt.as_millis() as u64,
                            elapsed_ms_total = total_dt.as_millis() as u64,
                            error = %e,
                            "summarize() giving up"
                        );
                        return Err(e);
                    }

                    // backoff calc
                    let mut delay = self
                        .base_delay
                        .saturating_mul(1u32 << (attempt - 1).min(16));
                    if delay > self.max_delay {
                        delay = self.max_delay;
                    }
                    let jitter_ms: u64 = rng().random_range(0..=250);
                    let delay = delay + StdDuration::from_millis(jitter_ms);

                    warn!(
                        attempt,
                        max = self.max_retries,
                        elapsed_ms_attempt = attempt_dt.as_millis() as u64,
                        ?delay,
                        error = %e,
                        "summarize() attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn texts(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn shell(script: &str) -> ProcessSummarizer {
        ProcessSummarizer::new("sh", vec!["-c".to_string(), script.to_string()])
    }

    #[test]
    fn test_request_is_a_json_array() {
        let batch = texts(&["first", "second \"quoted\""]);
        let json = serde_json::to_string(&SummaryRequest { texts: &batch }).unwrap();
        assert_eq!(json, r#"["first","second \"quoted\""]"#);
    }

    #[test]
    fn test_parse_response() {
        assert_eq!(
            parse_response("\n[\"a\",\"b\"]\nignored\n", 2).unwrap(),
            vec!["a", "b"]
        );
        assert!(matches!(
            parse_response("", 1),
            Err(GatewayError::MalformedResponse { truncated: false, .. })
        ));
        assert!(matches!(
            parse_response("[\"a\", \"b", 2),
            Err(GatewayError::MalformedResponse { truncated: true, .. })
        ));
        assert!(matches!(
            parse_response("{\"summary\": 1}", 1),
            Err(GatewayError::MalformedResponse { .. })
        ));
        assert!(matches!(
            parse_response("[\"a\"]", 2),
            Err(GatewayError::LengthMismatch { expected: 2, got: 1 })
        ));
    }

    #[test]
    fn test_polish_summary() {
        assert_eq!(polish_summary("  The vote passed .  "), "The vote passed.");
        assert_eq!(
            polish_summary("He called it \"a win\""),
            "He called it \"a win.\""
        );
        assert_eq!(polish_summary("She said \"done.\""), "She said \"done.\"");
        assert_eq!(polish_summary(""), "");
    }

    #[tokio::test]
    async fn test_empty_batch_does_not_spawn() {
        let summarizer = ProcessSummarizer::new("/nonexistent/summarizer", Vec::new());
        assert!(summarizer.summarize(&[]).await.unwrap().is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_round_trip_preserves_order() {
        let summarizer = ProcessSummarizer::new("cat", Vec::new());
        let batch = texts(&["First summary.", "Second summary."]);
        let summaries = summarizer.summarize(&batch).await.unwrap();
        assert_eq!(summaries, batch);
        assert!(summaries.iter().all(|s| !s.is_empty()));
    }

    #[tokio::test]
    async fn test_missing_program_is_unavailable() {
        let summarizer = ProcessSummarizer::new("/nonexistent/summarizer", Vec::new());
        let err = summarizer.summarize(&texts(&["text"])).await.unwrap_err();
        assert!(matches!(err, GatewayError::Unavailable { .. }));
        assert!(err.is_retryable());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failing_process() {
        let err = shell("cat >/dev/null; echo boom >&2; exit 3")
            .summarize(&texts(&["text"]))
            .await
            .unwrap_err();
        match err {
            GatewayError::ProcessFailed { stderr, .. } => assert_eq!(stderr, "boom"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_malformed_and_short_responses() {
        let err = shell("cat >/dev/null; echo not-json")
            .summarize(&texts(&["text"]))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::MalformedResponse { .. }));
        assert!(!err.is_retryable());

        let err = shell(r#"cat >/dev/null; echo '["only one"]'"#)
            .summarize(&texts(&["a", "b"]))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::LengthMismatch { expected: 2, got: 1 }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_answer_without_reading_stdin_is_accepted() {
        // Large enough to overflow the pipe buffer once the process is gone.
        let batch = vec!["word ".repeat(200_000)];
        let summaries = shell(r#"echo '["Short."]'"#)
            .summarize(&batch)
            .await
            .unwrap();
        assert_eq!(summaries, vec!["Short."]);
    }

    struct Flaky {
        calls: AtomicUsize,
        failures: usize,
        retryable: bool,
    }

    impl Summarize for Flaky {
        async fn summarize(&self, texts: &[String]) -> Result<Vec<String>, GatewayError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                return Err(if self.retryable {
                    GatewayError::ProcessFailed {
                        status: "exit status: 1".into(),
                        stderr: String::new(),
                    }
                } else {
                    GatewayError::LengthMismatch {
                        expected: texts.len(),
                        got: 0,
                    }
                });
            }
            Ok(texts.iter().map(|t| format!("short {t}")).collect())
        }
    }

    #[tokio::test]
    async fn test_retry_recovers_from_transient_failures() {
        let flaky = Flaky {
            calls: AtomicUsize::new(0),
            failures: 2,
            retryable: true,
        };
        let retry = RetrySummarize::new(flaky, 3, StdDuration::from_millis(1));
        let out = retry.summarize(&texts(&["x"])).await.unwrap();
        assert_eq!(out, vec!["short x"]);
        assert_eq!(retry.inner.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_gives_up_on_permanent_failures() {
        let flaky = Flaky {
            calls: AtomicUsize::new(0),
            failures: 5,
            retryable: false,
        };
        let retry = RetrySummarize::new(flaky, 3, StdDuration::from_millis(1));
        assert!(retry.summarize(&texts(&["x"])).await.is_err());
        assert_eq!(retry.inner.calls.load(Ordering::SeqCst), 1);
    }
}
