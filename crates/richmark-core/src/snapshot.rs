// SPDX-License-Identifier: AGPL-3.0-or-later
//! Owned, serializable copy of a subtree
//!
//! Snapshots are detached from the arena, so two trees built independently
//! compare equal when they hold the same structure, text and formats.

use crate::node::{ElementKind, NodeKey, NodeKind, TextFormat};
use crate::tree::Tree;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeSnapshot {
    Element {
        kind: ElementKind,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        children: Vec<NodeSnapshot>,
    },
    Text {
        text: String,
        #[serde(default, skip_serializing_if = "TextFormat::is_empty")]
        format: TextFormat,
    },
    LineBreak,
    Decorator {
        name: String,
        text: String,
    },
}

impl NodeSnapshot {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text {
            text: text.into(),
            format: TextFormat::empty(),
        }
    }

    pub fn formatted(text: impl Into<String>, format: TextFormat) -> Self {
        Self::Text {
            text: text.into(),
            format,
        }
    }

    pub fn element(kind: ElementKind, children: Vec<NodeSnapshot>) -> Self {
        Self::Element { kind, children }
    }

    pub fn children(&self) -> &[NodeSnapshot] {
        match self {
            Self::Element { children, .. } => children,
            _ => &[],
        }
    }
}

impl Tree {
    pub fn snapshot(&self, key: NodeKey) -> Option<NodeSnapshot> {
        let node = self.node(key)?;
        Some(match node.kind() {
            NodeKind::Element(kind) => NodeSnapshot::Element {
                kind: kind.clone(),
                children: node
                    .children()
                    .iter()
                    .filter_map(|&child| self.snapshot(child))
                    .collect(),
            },
            NodeKind::Text(data) => NodeSnapshot::Text {
                text: data.text.clone(),
                format: data.format,
            },
            NodeKind::LineBreak => NodeSnapshot::LineBreak,
            NodeKind::Decorator { name, text } => NodeSnapshot::Decorator {
                name: name.clone(),
                text: text.clone(),
            },
        })
    }

    /// Snapshots of the root's children
    pub fn blocks(&self) -> Vec<NodeSnapshot> {
        self.children(self.root())
            .iter()
            .filter_map(|&child| self.snapshot(child))
            .collect()
    }
}
