//! Output generation for the assembled digest.
//!
//! # Submodules
//!
//! - [`console`]: Renders the numbered per-source listing printed on stdout
//! - [`json`]: Writes the [`Digest`](crate::models::Digest) as a JSON file
//! - [`markdown`]: Writes the digest as a Markdown edition with source links
//!
//! # Output Structure
//!
//! ```text
//! json_output_dir/
//! └── 2025-05-06/
//!     ├── morning.json
//!     ├── afternoon.json
//!     └── evening.json
//!
//! markdown_output_dir/
//! ├── 2025-05-06_morning.md
//! └── 2025-05-06_evening.md
//! ```

pub mod console;
pub mod json;
pub mod markdown;
