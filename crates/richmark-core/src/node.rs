// SPDX-License-Identifier: AGPL-3.0-or-later
//! Node kinds stored in the rich-text tree
//!
//! Element kinds are limited to what markdown import/export needs to detect:
//! headings, quotes, code blocks, lists and links. Everything else a host
//! renders is carried as an opaque decorator with a plain-text fallback.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;

slotmap::new_key_type! {
    /// Identifier of a node inside a [`crate::Tree`]. A key of a removed
    /// node never resolves to a later node.
    pub struct NodeKey;
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:?}", self.0)
    }
}

bitflags! {
    /// Inline formatting carried by text nodes and by the selection
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct TextFormat: u16 {
        const BOLD = 1;
        const ITALIC = 1 << 1;
        const STRIKETHROUGH = 1 << 2;
        const UNDERLINE = 1 << 3;
        const CODE = 1 << 4;
        const SUBSCRIPT = 1 << 5;
        const SUPERSCRIPT = 1 << 6;
        const HIGHLIGHT = 1 << 7;
    }
}

/// How a text node behaves when edited
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextMode {
    /// Plain editable text
    #[default]
    Normal,
    /// Edited as one unit (mentions, hashtags)
    Token,
    /// Deleted segment by segment
    Segmented,
}

/// Node type identifier, used for registration checks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    Root,
    Paragraph,
    Heading,
    Quote,
    Code,
    List,
    ListItem,
    Link,
    Text,
    LineBreak,
    Decorator,
}

impl NodeType {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Root => "root",
            Self::Paragraph => "paragraph",
            Self::Heading => "heading",
            Self::Quote => "quote",
            Self::Code => "code",
            Self::List => "list",
            Self::ListItem => "listitem",
            Self::Link => "link",
            Self::Text => "text",
            Self::LineBreak => "linebreak",
            Self::Decorator => "decorator",
        }
    }

    /// Types every editor supports without registration
    pub const BUILTIN: [Self; 5] = [
        Self::Root,
        Self::Paragraph,
        Self::Text,
        Self::LineBreak,
        Self::Decorator,
    ];
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListKind {
    Bullet,
    Ordered,
    Task,
}

/// Element (container) node kinds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ElementKind {
    Root,
    Paragraph,
    /// Heading with level 1-6
    Heading { level: u8 },
    Quote,
    Code { language: Option<String> },
    List { kind: ListKind, start: u32 },
    ListItem { checked: Option<bool> },
    /// Hyperlink, the only inline element
    Link { url: String, title: Option<String> },
}

impl ElementKind {
    pub fn node_type(&self) -> NodeType {
        match self {
            Self::Root => NodeType::Root,
            Self::Paragraph => NodeType::Paragraph,
            Self::Heading { .. } => NodeType::Heading,
            Self::Quote => NodeType::Quote,
            Self::Code { .. } => NodeType::Code,
            Self::List { .. } => NodeType::List,
            Self::ListItem { .. } => NodeType::ListItem,
            Self::Link { .. } => NodeType::Link,
        }
    }

    /// Inline elements behave as a single unit among text siblings
    pub fn is_inline(&self) -> bool {
        matches!(self, Self::Link { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextData {
    pub text: String,
    pub format: TextFormat,
    pub mode: TextMode,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Element(ElementKind),
    Text(TextData),
    LineBreak,
    /// Embedded object with no children; `text` is its plain-text fallback
    Decorator { name: String, text: String },
}

impl NodeKind {
    pub fn node_type(&self) -> NodeType {
        match self {
            Self::Element(kind) => kind.node_type(),
            Self::Text(_) => NodeType::Text,
            Self::LineBreak => NodeType::LineBreak,
            Self::Decorator { .. } => NodeType::Decorator,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Node {
    pub(crate) parent: Option<NodeKey>,
    pub(crate) children: Vec<NodeKey>,
    pub(crate) kind: NodeKind,
}

impl Node {
    pub(crate) fn new(kind: NodeKind) -> Self {
        Self {
            parent: None,
            children: Vec::new(),
            kind,
        }
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn parent(&self) -> Option<NodeKey> {
        self.parent
    }

    pub fn children(&self) -> &[NodeKey] {
        &self.children
    }
}
