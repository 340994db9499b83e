//! Command-line interface definitions for the news digest.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! Options that override the config file can also be given as environment
//! variables.

use crate::digest::SummaryFallback;
use crate::models::SourceId;
use clap::Parser;

/// Command-line arguments for the news digest.
///
/// # Examples
///
/// ```sh
/// # Harvest every enabled source and print the digest
/// journalight_digest
///
/// # Only UPI and PBS, skipping the summarizer
/// journalight_digest --sources upi,pbs --no-summary
///
/// # Also write JSON and Markdown editions
/// journalight_digest -c config.yaml -j ./json -m ./markdown
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to config.yaml file
    #[arg(short, long, env = "JOURNALIGHT_CONFIG")]
    pub config: Option<String>,

    /// Harvest only these sources (comma separated: pbs, npr, upi)
    #[arg(short, long, value_delimiter = ',')]
    pub sources: Vec<SourceId>,

    /// Output directory for the JSON digest file
    #[arg(short, long)]
    pub json_output_dir: Option<String>,

    /// Output directory for the Markdown digest file
    #[arg(short, long)]
    pub markdown_output_dir: Option<String>,

    /// Summarizer program, overriding the config file
    #[arg(long, env = "SUMMARIZER_PROGRAM")]
    pub summarizer_program: Option<String>,

    /// Print long texts as harvested instead of summarizing them
    #[arg(long)]
    pub no_summary: bool,

    /// What to do with long texts when the summarizer fails
    #[arg(long, value_enum, default_value_t = SummaryFallback::Keep)]
    pub on_summary_failure: SummaryFallback,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["journalight_digest"]);
        assert!(cli.sources.is_empty());
        assert_eq!(cli.json_output_dir, None);
        assert_eq!(cli.markdown_output_dir, None);
        assert!(!cli.no_summary);
        assert_eq!(cli.on_summary_failure, SummaryFallback::Keep);
    }

    #[test]
    fn test_cli_sources_are_comma_separated() {
        let cli = Cli::parse_from(["journalight_digest", "--sources", "upi,PBS"]);
        assert_eq!(cli.sources, vec![SourceId::Upi, SourceId::Pbs]);
    }

    #[test]
    fn test_cli_rejects_unknown_source() {
        assert!(Cli::try_parse_from(["journalight_digest", "-s", "cnn"]).is_err());
    }

    #[test]
    fn test_cli_short_flags() {
        let cli = Cli::parse_from([
            "journalight_digest",
            "-c",
            "/etc/digest.yaml",
            "-j",
            "/tmp/json",
            "-m",
            "/tmp/markdown",
            "--on-summary-failure",
            "abort",
            "--no-summary",
        ]);

        assert_eq!(cli.config.as_deref(), Some("/etc/digest.yaml"));
        assert_eq!(cli.json_output_dir.as_deref(), Some("/tmp/json"));
        assert_eq!(cli.markdown_output_dir.as_deref(), Some("/tmp/markdown"));
        assert_eq!(cli.on_summary_failure, SummaryFallback::Abort);
        assert!(cli.no_summary);
    }
}
