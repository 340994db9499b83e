//! Plain-text digest for the terminal.
//!
//! ```text
//!
//! From PBS:
//!
//! 1. The Senate passed the bill.
//! 2. Markets rallied.
//!
//! From NPR:
//!
//! ```

use crate::models::Digest;

/// Render every section as a heading followed by a numbered list.
///
/// Sections with no items still get their heading.
pub fn render(digest: &Digest) -> String {
    let mut out = String::new();
    for section in &digest.sections {
        out.push_str(&format!("\nFrom {}:\n\n", section.source.display_name()));
        for (n, item) in section.items.iter().enumerate() {
            out.push_str(&format!("{}. {}\n", n + 1, item.text));
        }
    }
    out.push('\n');
    out
}
