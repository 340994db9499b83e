//! Markdown edition of the digest.
//!
//! Each edition is a standalone page: one `##` section per source and a
//! numbered list of items linking back to the page they came from.

use crate::models::Digest;
use crate::utils::upcase;
use std::error::Error;
use std::path::PathBuf;
use tokio::fs;
use tracing::{info, instrument};

/// Render a [`Digest`] as Markdown.
pub fn digest_to_markdown(digest: &Digest) -> String {
    let mut md = format!(
        "# {} Edition, {}\n\n_Harvested at {}._\n",
        upcase(&digest.time_of_day),
        digest.local_date,
        digest.local_time
    );

    for section in &digest.sections {
        md.push_str(&format!("\n## From {}\n\n", section.source.display_name()));
        if section.items.is_empty() {
            md.push_str("_Nothing harvested._\n");
            continue;
        }
        for (n, item) in section.items.iter().enumerate() {
            md.push_str(&format!(
                "{}. {} ([source]({}))\n",
                n + 1,
                item.text,
                item.source_url
            ));
        }
    }
    md
}

/// Write the edition to `{markdown_output_dir}/{date}_{time_of_day}.md`.
#[instrument(level = "info", skip_all, fields(%markdown_output_dir))]
pub async fn write_digest(
    digest: &Digest,
    markdown_output_dir: &str,
) -> Result<PathBuf, Box<dyn Error>> {
    fs::create_dir_all(markdown_output_dir).await?;
    let path = PathBuf::from(markdown_output_dir)
        .join(format!("{}_{}.md", digest.local_date, digest.time_of_day));
    fs::write(&path, digest_to_markdown(digest)).await?;
    info!(path = %path.display(), "Wrote Markdown digest");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DigestSection, Item, SourceId};

    fn digest() -> Digest {
        Digest {
            local_date: "2025-05-06".into(),
            time_of_day: "morning".into(),
            local_time: "07:15:00".into(),
            sections: vec![
                DigestSection {
                    source: SourceId::Pbs,
                    items: vec![
                        Item::new("Storms hit.", "https://www.pbs.org/newshour/a", false).unwrap(),
                    ],
                },
                DigestSection {
                    source: SourceId::Npr,
                    items: Vec::new(),
                },
            ],
        }
    }

    #[test]
    fn test_digest_to_markdown() {
        let md = digest_to_markdown(&digest());
        assert!(md.starts_with("# Morning Edition, 2025-05-06\n"));
        assert!(md.contains("## From PBS\n\n1. Storms hit. ([source](https://www.pbs.org/newshour/a))\n"));
        assert!(md.contains("## From NPR\n\n_Nothing harvested._\n"));
    }

    #[tokio::test]
    async fn test_write_digest_file_name() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write_digest(&digest(), tmp.path().to_str().unwrap())
            .await
            .unwrap();
        assert_eq!(path, tmp.path().join("2025-05-06_morning.md"));
        assert_eq!(
            std::fs::read_to_string(path).unwrap(),
            digest_to_markdown(&digest())
        );
    }
}
