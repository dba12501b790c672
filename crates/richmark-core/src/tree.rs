// SPDX-License-Identifier: AGPL-3.0-or-later
//! Arena-backed rich-text node tree
//!
//! Nodes live in a slot map addressed by [`NodeKey`]. Removing a node drops
//! its whole subtree immediately; stale keys stop resolving.
//! Text offsets are UTF-8 byte offsets and must fall on char boundaries.

use crate::node::{ElementKind, Node, NodeKey, NodeKind, NodeType, TextData, TextFormat, TextMode};
use crate::selection::{PointKind, RangeSelection};
use crate::traits::{Error, Result};
use slotmap::HopSlotMap;
use std::collections::HashSet;

#[derive(Debug, Clone)]
pub struct Tree {
    nodes: HopSlotMap<NodeKey, Node>,
    root: NodeKey,
    pub(crate) selection: Option<RangeSelection>,
    dirty: HashSet<NodeKey>,
}

impl Tree {
    /// Create a tree holding only an empty root
    pub fn new() -> Self {
        let mut nodes = HopSlotMap::with_key();
        let root = nodes.insert(Node::new(NodeKind::Element(ElementKind::Root)));
        Self {
            nodes,
            root,
            selection: None,
            dirty: HashSet::new(),
        }
    }

    pub fn root(&self) -> NodeKey {
        self.root
    }

    /// Number of live nodes, root included
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children(self.root).is_empty()
    }

    pub fn contains(&self, key: NodeKey) -> bool {
        self.nodes.contains_key(key)
    }

    pub fn node(&self, key: NodeKey) -> Option<&Node> {
        self.nodes.get(key)
    }

    fn node_mut(&mut self, key: NodeKey) -> Result<&mut Node> {
        self.nodes.get_mut(key).ok_or(Error::NodeNotFound(key))
    }

    // ---------------------------------------------------------------------
    // Creation
    // ---------------------------------------------------------------------

    pub fn create_element(&mut self, kind: ElementKind) -> NodeKey {
        self.nodes.insert(Node::new(NodeKind::Element(kind)))
    }

    pub fn create_paragraph(&mut self) -> NodeKey {
        self.create_element(ElementKind::Paragraph)
    }

    pub fn create_text(&mut self, text: impl Into<String>) -> NodeKey {
        self.create_formatted_text(text, TextFormat::empty())
    }

    pub fn create_formatted_text(
        &mut self,
        text: impl Into<String>,
        format: TextFormat,
    ) -> NodeKey {
        let key = self.nodes.insert(Node::new(NodeKind::Text(TextData {
            text: text.into(),
            format,
            mode: TextMode::Normal,
        })));
        self.dirty.insert(key);
        key
    }

    pub fn create_line_break(&mut self) -> NodeKey {
        self.nodes.insert(Node::new(NodeKind::LineBreak))
    }

    pub fn create_decorator(
        &mut self,
        name: impl Into<String>,
        text: impl Into<String>,
    ) -> NodeKey {
        self.nodes.insert(Node::new(NodeKind::Decorator {
            name: name.into(),
            text: text.into(),
        }))
    }

    // ---------------------------------------------------------------------
    // Classification
    // ---------------------------------------------------------------------

    pub fn node_type(&self, key: NodeKey) -> Option<NodeType> {
        self.node(key).map(|n| n.kind.node_type())
    }

    pub fn element_kind(&self, key: NodeKey) -> Option<&ElementKind> {
        match &self.node(key)?.kind {
            NodeKind::Element(kind) => Some(kind),
            _ => None,
        }
    }

    pub fn element_kind_mut(&mut self, key: NodeKey) -> Option<&mut ElementKind> {
        match &mut self.nodes.get_mut(key)?.kind {
            NodeKind::Element(kind) => Some(kind),
            _ => None,
        }
    }

    fn text_data(&self, key: NodeKey) -> Option<&TextData> {
        match &self.node(key)?.kind {
            NodeKind::Text(data) => Some(data),
            _ => None,
        }
    }

    fn text_data_mut(&mut self, key: NodeKey) -> Result<&mut TextData> {
        match &mut self.node_mut(key)?.kind {
            NodeKind::Text(data) => Ok(data),
            _ => Err(Error::NotText(key)),
        }
    }

    pub fn is_text(&self, key: NodeKey) -> bool {
        self.text_data(key).is_some()
    }

    /// Plain text node in normal mode (not a token or segmented run)
    pub fn is_simple_text(&self, key: NodeKey) -> bool {
        self.text_data(key).is_some_and(|d| d.mode == TextMode::Normal)
    }

    pub fn is_element(&self, key: NodeKey) -> bool {
        self.element_kind(key).is_some()
    }

    pub fn is_line_break(&self, key: NodeKey) -> bool {
        matches!(self.node(key).map(|n| &n.kind), Some(NodeKind::LineBreak))
    }

    /// Leaf with no children and no inline representation
    pub fn is_decorator(&self, key: NodeKey) -> bool {
        matches!(self.node(key).map(|n| &n.kind), Some(NodeKind::Decorator { .. }))
    }

    pub fn is_inline(&self, key: NodeKey) -> bool {
        self.element_kind(key).is_some_and(ElementKind::is_inline)
    }

    pub fn is_root(&self, key: NodeKey) -> bool {
        key == self.root
    }

    /// Whether the node is reachable from the root
    pub fn is_attached(&self, key: NodeKey) -> bool {
        let mut current = Some(key);
        while let Some(k) = current {
            if k == self.root {
                return true;
            }
            current = self.node(k).and_then(|n| n.parent);
        }
        false
    }

    // ---------------------------------------------------------------------
    // Text nodes
    // ---------------------------------------------------------------------

    pub fn text(&self, key: NodeKey) -> Option<&str> {
        self.text_data(key).map(|d| d.text.as_str())
    }

    pub fn set_text(&mut self, key: NodeKey, text: impl Into<String>) -> Result<()> {
        self.text_data_mut(key)?.text = text.into();
        self.dirty.insert(key);
        Ok(())
    }

    /// Format flags of a text node; empty for anything else
    pub fn format(&self, key: NodeKey) -> TextFormat {
        self.text_data(key).map(|d| d.format).unwrap_or_default()
    }

    pub fn has_format(&self, key: NodeKey, format: TextFormat) -> bool {
        self.text_data(key).is_some_and(|d| d.format.contains(format))
    }

    pub fn set_format(&mut self, key: NodeKey, format: TextFormat) -> Result<()> {
        self.text_data_mut(key)?.format = format;
        self.dirty.insert(key);
        Ok(())
    }

    pub fn toggle_format(&mut self, key: NodeKey, format: TextFormat) -> Result<()> {
        self.text_data_mut(key)?.format.toggle(format);
        self.dirty.insert(key);
        Ok(())
    }

    pub fn text_mode(&self, key: NodeKey) -> Option<TextMode> {
        self.text_data(key).map(|d| d.mode)
    }

    pub fn set_text_mode(&mut self, key: NodeKey, mode: TextMode) -> Result<()> {
        self.text_data_mut(key)?.mode = mode;
        Ok(())
    }

    /// Split a text node at the given offsets.
    ///
    /// Empty parts are skipped, so splitting at `0` or at the text length
    /// produces no extra node. The first part keeps `key`; later parts are new
    /// siblings with the same format and mode, inserted right after it. A
    /// caret sitting exactly on a split point stays at the end of the earlier
    /// part.
    pub fn split_text(&mut self, key: NodeKey, offsets: &[usize]) -> Result<Vec<NodeKey>> {
        let data = self.text_data(key).ok_or(Error::NotText(key))?.clone();
        let len = data.text.len();

        let mut bounds = vec![0];
        let mut sorted = offsets.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        for offset in sorted {
            if offset > len || !data.text.is_char_boundary(offset) {
                return Err(Error::InvalidOffset { key, offset, len });
            }
            if offset > 0 && offset < len {
                bounds.push(offset);
            }
        }
        bounds.push(len);

        if bounds.len() <= 2 {
            return Ok(vec![key]);
        }

        let mut parts = Vec::with_capacity(bounds.len() - 1);
        parts.push(key);
        self.set_text(key, &data.text[..bounds[1]])?;

        let mut previous = key;
        for window in bounds[1..].windows(2) {
            let part = self.create_formatted_text(&data.text[window[0]..window[1]], data.format);
            self.text_data_mut(part)?.mode = data.mode;
            if self.parent(previous).is_some() {
                self.insert_after(previous, part)?;
            }
            parts.push(part);
            previous = part;
        }

        if let Some(selection) = self.selection.as_mut() {
            for point in [&mut selection.anchor, &mut selection.focus] {
                if point.key != key || point.kind != PointKind::Text {
                    continue;
                }
                for (i, window) in bounds.windows(2).enumerate() {
                    if point.offset <= window[1] {
                        point.key = parts[i];
                        point.offset -= window[0];
                        break;
                    }
                }
            }
        }

        Ok(parts)
    }

    // ---------------------------------------------------------------------
    // Structure
    // ---------------------------------------------------------------------

    pub fn parent(&self, key: NodeKey) -> Option<NodeKey> {
        self.node(key)?.parent
    }

    pub fn children(&self, key: NodeKey) -> &[NodeKey] {
        self.node(key).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    pub fn children_len(&self, key: NodeKey) -> usize {
        self.children(key).len()
    }

    pub fn first_child(&self, key: NodeKey) -> Option<NodeKey> {
        self.children(key).first().copied()
    }

    pub fn last_child(&self, key: NodeKey) -> Option<NodeKey> {
        self.children(key).last().copied()
    }

    pub fn index_in_parent(&self, key: NodeKey) -> Option<usize> {
        let parent = self.parent(key)?;
        self.children(parent).iter().position(|&c| c == key)
    }

    pub fn previous_sibling(&self, key: NodeKey) -> Option<NodeKey> {
        let parent = self.parent(key)?;
        let index = self.index_in_parent(key)?;
        index.checked_sub(1).map(|i| self.children(parent)[i])
    }

    pub fn next_sibling(&self, key: NodeKey) -> Option<NodeKey> {
        let parent = self.parent(key)?;
        let index = self.index_in_parent(key)?;
        self.children(parent).get(index + 1).copied()
    }

    pub fn next_siblings(&self, key: NodeKey) -> Vec<NodeKey> {
        match (self.parent(key), self.index_in_parent(key)) {
            (Some(parent), Some(index)) => self.children(parent)[index + 1..].to_vec(),
            _ => Vec::new(),
        }
    }

    /// Deepest first descendant, following first children through elements
    pub fn first_descendant(&self, key: NodeKey) -> Option<NodeKey> {
        let mut node = self.first_child(key)?;
        while self.is_element(node) {
            match self.first_child(node) {
                Some(child) => node = child,
                None => break,
            }
        }
        Some(node)
    }

    /// Deepest last descendant, following last children through elements
    pub fn last_descendant(&self, key: NodeKey) -> Option<NodeKey> {
        let mut node = self.last_child(key)?;
        while self.is_element(node) {
            match self.last_child(node) {
                Some(child) => node = child,
                None => break,
            }
        }
        Some(node)
    }

    /// Closest node, starting at `key` itself, whose type is `node_type`
    pub fn find_ancestor(&self, key: NodeKey, node_type: NodeType) -> Option<NodeKey> {
        let mut current = Some(key);
        while let Some(k) = current {
            if self.node_type(k) == Some(node_type) {
                return Some(k);
            }
            current = self.parent(k);
        }
        None
    }

    fn detach(&mut self, key: NodeKey) -> Result<()> {
        let parent = self.node_mut(key)?.parent.take();
        if let Some(parent) = parent {
            self.node_mut(parent)?.children.retain(|&c| c != key);
        }
        Ok(())
    }

    fn ensure_element(&self, key: NodeKey) -> Result<()> {
        match self.node(key) {
            Some(node) if matches!(node.kind, NodeKind::Element(_)) => Ok(()),
            Some(_) => Err(Error::NotElement(key)),
            None => Err(Error::NodeNotFound(key)),
        }
    }

    /// Insert `child` into `parent` at `index`, moving it from its old place
    pub fn insert_child(&mut self, parent: NodeKey, index: usize, child: NodeKey) -> Result<()> {
        self.ensure_element(parent)?;
        if !self.contains(child) {
            return Err(Error::NodeNotFound(child));
        }
        self.detach(child)?;
        let node = self.node_mut(parent)?;
        let index = index.min(node.children.len());
        node.children.insert(index, child);
        self.node_mut(child)?.parent = Some(parent);
        Ok(())
    }

    pub fn append(&mut self, parent: NodeKey, child: NodeKey) -> Result<()> {
        self.insert_child(parent, usize::MAX, child)
    }

    pub fn append_all(
        &mut self,
        parent: NodeKey,
        children: impl IntoIterator<Item = NodeKey>,
    ) -> Result<()> {
        for child in children {
            self.append(parent, child)?;
        }
        Ok(())
    }

    pub fn insert_before(&mut self, target: NodeKey, node: NodeKey) -> Result<()> {
        self.detach(node)?;
        let parent = self.parent(target).ok_or(Error::NodeNotFound(target))?;
        let index = self.index_in_parent(target).ok_or(Error::NodeNotFound(target))?;
        self.insert_child(parent, index, node)
    }

    pub fn insert_after(&mut self, target: NodeKey, node: NodeKey) -> Result<()> {
        self.detach(node)?;
        let parent = self.parent(target).ok_or(Error::NodeNotFound(target))?;
        let index = self.index_in_parent(target).ok_or(Error::NodeNotFound(target))?;
        self.insert_child(parent, index + 1, node)
    }

    /// Put `new` where `old` is and remove `old` with whatever children it
    /// still holds
    pub fn replace(&mut self, old: NodeKey, new: NodeKey) -> Result<()> {
        self.insert_before(old, new)?;
        self.remove(old)
    }

    /// Detach a node and drop its subtree. The root cannot be removed.
    pub fn remove(&mut self, key: NodeKey) -> Result<()> {
        if key == self.root {
            return Ok(());
        }
        self.detach(key)?;
        let mut stack = vec![key];
        let mut removed = HashSet::new();
        while let Some(k) = stack.pop() {
            if let Some(node) = self.nodes.remove(k) {
                stack.extend(node.children);
            }
            self.dirty.remove(&k);
            removed.insert(k);
        }
        if let Some(selection) = &self.selection {
            if removed.contains(&selection.anchor.key) || removed.contains(&selection.focus.key) {
                self.selection = None;
            }
        }
        Ok(())
    }

    /// Remove every child of an element
    pub fn clear(&mut self, key: NodeKey) -> Result<()> {
        self.ensure_element(key)?;
        for child in self.children(key).to_vec() {
            self.remove(child)?;
        }
        Ok(())
    }

    /// Text nodes under `key` in document order
    pub fn text_nodes(&self, key: NodeKey) -> Vec<NodeKey> {
        let mut out = Vec::new();
        let mut stack = vec![key];
        while let Some(k) = stack.pop() {
            if self.is_text(k) {
                out.push(k);
            }
            stack.extend(self.children(k).iter().rev());
        }
        out
    }

    /// Plain text of a subtree. Block-level element children are separated
    /// by a blank line.
    pub fn text_content(&self, key: NodeKey) -> String {
        let mut out = String::new();
        self.collect_text(key, &mut out);
        out
    }

    fn collect_text(&self, key: NodeKey, out: &mut String) {
        let Some(node) = self.node(key) else {
            return;
        };
        match &node.kind {
            NodeKind::Text(data) => out.push_str(&data.text),
            NodeKind::LineBreak => out.push('\n'),
            NodeKind::Decorator { text, .. } => out.push_str(text),
            NodeKind::Element(_) => {
                let count = node.children.len();
                for (i, &child) in node.children.iter().enumerate() {
                    self.collect_text(child, out);
                    if i + 1 < count && self.is_element(child) && !self.is_inline(child) {
                        out.push_str("\n\n");
                    }
                }
            }
        }
    }

    pub fn text_content_size(&self, key: NodeKey) -> usize {
        self.text_content(key).len()
    }

    // ---------------------------------------------------------------------
    // Dirty tracking
    // ---------------------------------------------------------------------

    /// Leaves created or changed since the last call
    pub fn take_dirty(&mut self) -> HashSet<NodeKey> {
        std::mem::take(&mut self.dirty)
    }

    pub fn is_dirty(&self, key: NodeKey) -> bool {
        self.dirty.contains(&key)
    }

    pub fn mark_dirty(&mut self, key: NodeKey) {
        if self.contains(key) {
            self.dirty.insert(key);
        }
    }
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}
