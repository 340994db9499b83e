//! YAML configuration for sources, politeness delays, filters and the summarizer.
//!
//! Every field has a default, so running without a config file harvests the
//! three built-in sources with their usual crawl delays. A partial file only
//! overrides what it names:
//!
//! ```yaml
//! max_items: 8
//! npr:
//!   article_delay_secs: 10
//!   excluded_section_patterns: ["/series/", "/book-reviews/", "/podcasts/"]
//! summarizer:
//!   program: python3
//!   args: ["./lib/summarizer.py"]
//! ```
//!
//! The URL and text filters are regular expressions, compiled when the file is
//! loaded so a bad pattern fails the run before any network traffic.

use crate::models::{MAX_ITEMS_PER_SOURCE, SourceId};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, instrument};

/// Errors raised while loading or validating the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("could not parse config file: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// A list of regular expressions; a string matches if any of them does.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct Patterns {
    sources: Vec<String>,
    compiled: Vec<Regex>,
}

impl Patterns {
    pub fn matches(&self, haystack: &str) -> bool {
        self.compiled.iter().any(|re| re.is_match(haystack))
    }
}

impl TryFrom<Vec<String>> for Patterns {
    type Error = regex::Error;

    fn try_from(sources: Vec<String>) -> Result<Self, Self::Error> {
        let compiled = sources
            .iter()
            .map(|p| Regex::new(p))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { sources, compiled })
    }
}

impl From<Patterns> for Vec<String> {
    fn from(patterns: Patterns) -> Self {
        patterns.sources
    }
}

fn patterns(literals: &[&str]) -> Patterns {
    build(literals.iter().map(|s| regex::escape(s)).collect())
}

fn anchored(prefixes: &[&str]) -> Patterns {
    build(prefixes.iter().map(|p| format!("^{}", regex::escape(p))).collect())
}

/// Built-in defaults are escaped literals and always compile.
fn build(sources: Vec<String>) -> Patterns {
    let compiled = sources.iter().filter_map(|s| Regex::new(s).ok()).collect();
    Patterns { sources, compiled }
}

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// User agent sent with every page request.
    pub user_agent: String,
    /// Upper bound for a single navigation.
    pub navigation_timeout_secs: u64,
    /// Per-source item cap; never above ten.
    pub max_items: usize,
    pub upi: UpiConfig,
    pub npr: NprConfig,
    pub pbs: PbsConfig,
    pub summarizer: SummarizerConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            user_agent: format!("journalight_digest/{}", env!("CARGO_PKG_VERSION")),
            navigation_timeout_secs: 30,
            max_items: MAX_ITEMS_PER_SOURCE,
            upi: UpiConfig::default(),
            npr: NprConfig::default(),
            pbs: PbsConfig::default(),
            summarizer: SummarizerConfig::default(),
        }
    }
}

impl Config {
    /// Load the configuration from `path`, or the defaults when no path is given.
    #[instrument(level = "info")]
    pub async fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => {
                let raw = tokio::fs::read_to_string(path)
                    .await
                    .map_err(|source| ConfigError::Io {
                        path: path.to_string(),
                        source,
                    })?;
                let config = Self::from_yaml(&raw)?;
                info!(path, "Loaded configuration");
                config
            }
            None => {
                info!("No config file given; using defaults");
                Self::default()
            }
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml(raw: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(raw)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_items == 0 || self.max_items > MAX_ITEMS_PER_SOURCE {
            return Err(ConfigError::Invalid(format!(
                "max_items must be between 1 and {MAX_ITEMS_PER_SOURCE}, got {}",
                self.max_items
            )));
        }
        if self.summarizer.program.trim().is_empty() {
            return Err(ConfigError::Invalid("summarizer.program is empty".into()));
        }
        Ok(())
    }

    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_secs(self.navigation_timeout_secs)
    }

    /// Sources switched on in the file, in digest order.
    pub fn enabled_sources(&self) -> Vec<SourceId> {
        SourceId::ALL
            .into_iter()
            .filter(|id| match id {
                SourceId::Pbs => self.pbs.enabled,
                SourceId::Npr => self.npr.enabled,
                SourceId::Upi => self.upi.enabled,
            })
            .collect()
    }
}

/// Leads-index source settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpiConfig {
    pub enabled: bool,
    pub index_url: String,
    pub index_delay_secs: u64,
    pub article_delay_secs: u64,
    /// How many leads to take straight from the index page.
    pub index_leads: usize,
    /// Links matching any of these are retrospective, not current events.
    pub excluded_link_patterns: Patterns,
}

impl Default for UpiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            index_url: "https://www.upi.com/Top_News/".to_string(),
            index_delay_secs: 0,
            article_delay_secs: 5,
            index_leads: 7,
            excluded_link_patterns: patterns(&["On-This-Day"]),
        }
    }
}

/// Editorial-lead source settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NprConfig {
    pub enabled: bool,
    pub index_url: String,
    pub index_delay_secs: u64,
    pub article_delay_secs: u64,
    /// Section links matching any of these mark non-news candidates.
    pub excluded_section_patterns: Patterns,
}

impl Default for NprConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            index_url: "https://www.npr.org/sections/news/".to_string(),
            index_delay_secs: 0,
            article_delay_secs: 5,
            excluded_section_patterns: patterns(&["/series/", "/book-reviews/"]),
        }
    }
}

/// Dual-layout source settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PbsConfig {
    pub enabled: bool,
    pub index_url: String,
    pub index_delay_secs: u64,
    pub article_delay_secs: u64,
    /// Transcript intros matching any of these are not news.
    pub non_news_markers: Patterns,
    /// Publication paragraphs matching any of these are promotional noise.
    pub promo_patterns: Patterns,
}

impl Default for PbsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            index_url: "https://www.pbs.org/newshour/latest".to_string(),
            index_delay_secs: 0,
            article_delay_secs: 2,
            non_news_markers: patterns(&["new book", "new report", "special report", "series"]),
            promo_patterns: anchored(&["READ MORE", "Watch"]),
        }
    }
}

/// External summarization process settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SummarizerConfig {
    pub program: String,
    pub args: Vec<String>,
    /// Retries after the first attempt for launch and process failures.
    pub max_retries: usize,
    /// Initial backoff; doubles on every retry.
    pub base_delay_ms: u64,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            program: "python".to_string(),
            args: vec!["./lib/Summarizer.py".to_string()],
            max_retries: 2,
            base_delay_ms: 1000,
        }
    }
}

macro_rules! delays {
    ($($ty:ty),+) => {$(
        impl $ty {
            pub fn index_delay(&self) -> Duration {
                Duration::from_secs(self.index_delay_secs)
            }

            pub fn article_delay(&self) -> Duration {
                Duration::from_secs(self.article_delay_secs)
            }
        }
    )+};
}

delays!(UpiConfig, NprConfig, PbsConfig);
