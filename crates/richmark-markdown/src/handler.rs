// SPDX-License-Identifier: AGPL-3.0-or-later
//! Markdown format handler for the core parser and renderer traits

use crate::config::{ExportConfig, ImportConfig};
use crate::export::export_markdown;
use crate::import::import_markdown;
use crate::transformer::Transformer;
use crate::transformers::TRANSFORMERS;
use richmark_core::{NodeKey, Parser, Renderer, Result, Tree};

/// Markdown handler backed by a transformer list
#[derive(Debug, Clone)]
pub struct MarkdownHandler {
    pub transformers: Vec<Transformer>,
    pub import: ImportConfig,
    pub export: ExportConfig,
}

impl MarkdownHandler {
    pub fn new(transformers: Vec<Transformer>) -> Self {
        Self {
            transformers,
            import: ImportConfig::default(),
            export: ExportConfig::default(),
        }
    }

    pub fn with_import(mut self, import: ImportConfig) -> Self {
        self.import = import;
        self
    }

    pub fn with_export(mut self, export: ExportConfig) -> Self {
        self.export = export;
        self
    }
}

impl Default for MarkdownHandler {
    fn default() -> Self {
        Self::new(TRANSFORMERS.clone())
    }
}

impl Parser for MarkdownHandler {
    fn parse_into(&self, input: &str, tree: &mut Tree, root: NodeKey) -> Result<()> {
        import_markdown(input, tree, Some(root), &self.transformers, &self.import)?;
        Ok(())
    }
}

impl Renderer for MarkdownHandler {
    fn render(&self, tree: &Tree, root: NodeKey) -> Result<String> {
        Ok(export_markdown(tree, Some(root), &self.transformers, &self.export))
    }
}
