// SPDX-License-Identifier: AGPL-3.0-or-later
//! Transformer definitions
//!
//! A transformer describes one piece of markdown syntax and how it maps onto
//! tree nodes. Three kinds exist:
//! - element transformers turn a whole line (or a span of lines) into a block
//! - text-format transformers are paired delimiters such as `**` or `_`
//! - text-match transformers turn an exact in-line span into an inline node
//!
//! Callbacks are plain function pointers so transformer lists can be cloned
//! and stored in statics.

use regex::{Captures, Regex};
use richmark_core::{NodeKey, NodeType, TextFormat, Tree};
use std::fmt;

/// Result of applying a pattern to a string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    pub full_text: String,
    /// Capture groups 1.., `None` where a group did not participate
    pub groups: Vec<Option<String>>,
    /// Byte offset of the match in the searched string
    pub start_index: usize,
}

impl Match {
    pub fn from_captures(captures: &Captures<'_>) -> Self {
        let (full_text, start_index) = captures
            .get(0)
            .map(|m| (m.as_str().to_string(), m.start()))
            .unwrap_or_default();
        Self {
            full_text,
            groups: captures
                .iter()
                .skip(1)
                .map(|g| g.map(|m| m.as_str().to_string()))
                .collect(),
            start_index,
        }
    }

    /// Group `0` is the whole match
    pub fn group(&self, index: usize) -> Option<&str> {
        if index == 0 {
            return Some(&self.full_text);
        }
        self.groups.get(index - 1)?.as_deref()
    }

    pub fn len(&self) -> usize {
        self.full_text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.full_text.is_empty()
    }

    pub fn end_index(&self) -> usize {
        self.start_index + self.len()
    }
}

/// Replace a paragraph-shaped `parent` with the block for `children`
pub type ElementReplace = fn(
    tree: &mut Tree,
    parent: NodeKey,
    children: Vec<NodeKey>,
    m: &Match,
    is_import: bool,
) -> richmark_core::Result<()>;

/// Serialize a block node, or `None` when the node is not this transformer's
pub type ElementExport =
    fn(tree: &Tree, node: NodeKey, export_children: &dyn Fn(NodeKey) -> String) -> Option<String>;

/// Number of lines after `start` that belong to the block opened there
pub type LineSpan = fn(lines: &[&str], start: usize) -> usize;

/// Replace the isolated text node matched by a text-match transformer
pub type TextMatchReplace =
    fn(tree: &mut Tree, node: NodeKey, m: &Match) -> richmark_core::Result<()>;

/// Serialize an inline node. `export_format` wraps content in the format tags
/// of a given text node.
pub type TextMatchExport = fn(
    tree: &Tree,
    node: NodeKey,
    export_children: &dyn Fn(NodeKey) -> String,
    export_format: &dyn Fn(NodeKey, &str) -> String,
) -> Option<String>;

/// How the lines inside a multi-line block reach `replace`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Interior {
    /// One text node holding the lines joined by `\n`
    #[default]
    Verbatim,
    /// Lines imported as markdown
    Markdown,
}

#[derive(Clone)]
pub struct ElementTransformer {
    pub name: String,
    /// Node types the editor must register for live shortcuts
    pub dependencies: Vec<NodeType>,
    pub pattern: Regex,
    pub replace: ElementReplace,
    pub export: ElementExport,
    /// Present for blocks spanning several lines
    pub line_span: Option<LineSpan>,
    /// Terminating line of a multi-line block, consumed on import
    pub close_pattern: Option<Regex>,
    pub interior: Interior,
}

impl ElementTransformer {
    pub fn is_multiline(&self) -> bool {
        self.line_span.is_some()
    }
}

impl fmt::Debug for ElementTransformer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElementTransformer")
            .field("name", &self.name)
            .field("dependencies", &self.dependencies)
            .field("pattern", &self.pattern.as_str())
            .field("multiline", &self.is_multiline())
            .field("interior", &self.interior)
            .finish()
    }
}

/// Paired delimiter such as `**bold**`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextFormatTransformer {
    pub tag: String,
    /// Formats applied in order
    pub formats: Vec<TextFormat>,
    /// When false the tag must sit next to whitespace, punctuation or a line edge
    pub intraword: bool,
}

impl TextFormatTransformer {
    pub fn new(tag: impl Into<String>, formats: Vec<TextFormat>) -> Self {
        Self {
            tag: tag.into(),
            formats,
            intraword: true,
        }
    }

    pub fn word_bounded(mut self) -> Self {
        self.intraword = false;
        self
    }

    /// Union of every declared format
    pub fn format_mask(&self) -> TextFormat {
        self.formats.iter().fold(TextFormat::empty(), |acc, &f| acc | f)
    }

    pub fn last_char(&self) -> Option<char> {
        self.tag.chars().next_back()
    }

    pub(crate) fn is_delimiter(&self, c: char) -> bool {
        self.tag.contains(c)
    }
}

#[derive(Clone)]
pub struct TextMatchTransformer {
    pub name: String,
    pub dependencies: Vec<NodeType>,
    /// Unanchored pattern used on import
    pub import_pattern: Regex,
    /// Pattern anchored at the caret used by live shortcuts
    pub match_pattern: Regex,
    /// Character whose typing triggers the live shortcut
    pub trigger: char,
    pub replace: TextMatchReplace,
    pub export: TextMatchExport,
}

impl fmt::Debug for TextMatchTransformer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextMatchTransformer")
            .field("name", &self.name)
            .field("dependencies", &self.dependencies)
            .field("import_pattern", &self.import_pattern.as_str())
            .field("match_pattern", &self.match_pattern.as_str())
            .field("trigger", &self.trigger)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub enum Transformer {
    Element(ElementTransformer),
    TextFormat(TextFormatTransformer),
    TextMatch(TextMatchTransformer),
}

impl From<ElementTransformer> for Transformer {
    fn from(t: ElementTransformer) -> Self {
        Self::Element(t)
    }
}

impl From<TextFormatTransformer> for Transformer {
    fn from(t: TextFormatTransformer) -> Self {
        Self::TextFormat(t)
    }
}

impl From<TextMatchTransformer> for Transformer {
    fn from(t: TextMatchTransformer) -> Self {
        Self::TextMatch(t)
    }
}

/// Whitespace or ASCII punctuation; `None` stands for a line edge
pub(crate) fn is_punctuation_or_space(c: Option<char>) -> bool {
    match c {
        None => true,
        Some(c) => c.is_whitespace() || c.is_ascii_punctuation(),
    }
}
