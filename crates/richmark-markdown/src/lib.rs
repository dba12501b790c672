// SPDX-License-Identifier: AGPL-3.0-or-later
//! Richmark Markdown - Markdown transformation engine
//!
//! This crate provides:
//! - Transformers describing markdown syntax: block elements, paired inline
//!   format tags and inline text matches such as links
//! - Batch import of markdown source into a [`richmark_core::Tree`]
//! - Batch export of a tree back to markdown
//! - Live shortcuts that apply markdown while the user types
//!
//! ```ignore
//! use richmark_markdown::{
//!     export_markdown, import_markdown, ExportConfig, ImportConfig, TRANSFORMERS,
//! };
//!
//! let mut tree = richmark_core::Tree::new();
//! import_markdown("# Title", &mut tree, None, &TRANSFORMERS, &ImportConfig::default())?;
//! assert_eq!(export_markdown(&tree, None, &TRANSFORMERS, &ExportConfig::default()), "# Title");
//! ```

pub mod config;
pub mod error;
pub mod export;
pub mod handler;
pub mod import;
pub mod matcher;
pub mod registry;
pub mod shortcuts;
pub mod transformer;
pub mod transformers;

pub use config::{ExportConfig, ImportConfig, MatcherBackend, ShortcutConfig};
pub use error::{MarkdownError, Result};
pub use export::export_markdown;
pub use handler::MarkdownHandler;
pub use import::import_markdown;
pub use matcher::{FormatMatch, TagIndex};
pub use registry::TransformersByType;
pub use shortcuts::{register_live_shortcuts, ShortcutHandle};
pub use transformer::{
    ElementTransformer, Interior, Match, TextFormatTransformer, TextMatchTransformer, Transformer,
};
pub use transformers::TRANSFORMERS;
