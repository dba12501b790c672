// SPDX-License-Identifier: AGPL-3.0-or-later
//! Range selection, caret placement and typing

use crate::node::{NodeKey, TextFormat};
use crate::traits::{Error, Result};
use crate::tree::Tree;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointKind {
    /// Byte offset inside a text node
    Text,
    /// Child index inside an element
    Element,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    pub key: NodeKey,
    pub offset: usize,
    pub kind: PointKind,
}

impl Point {
    pub fn text(key: NodeKey, offset: usize) -> Self {
        Self {
            key,
            offset,
            kind: PointKind::Text,
        }
    }

    pub fn element(key: NodeKey, offset: usize) -> Self {
        Self {
            key,
            offset,
            kind: PointKind::Element,
        }
    }
}

/// Anchor/focus pair plus the format flags that newly typed text receives
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeSelection {
    pub anchor: Point,
    pub focus: Point,
    pub format: TextFormat,
}

impl RangeSelection {
    pub fn new(anchor: Point, focus: Point) -> Self {
        Self {
            anchor,
            focus,
            format: TextFormat::empty(),
        }
    }

    pub fn collapsed(point: Point) -> Self {
        Self::new(point, point)
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.focus
    }

    pub fn has_format(&self, format: TextFormat) -> bool {
        self.format.contains(format)
    }

    pub fn toggle_format(&mut self, format: TextFormat) {
        self.format.toggle(format);
    }

    /// Move the anchor onto the focus
    pub fn collapse_to_focus(&mut self) {
        self.anchor = self.focus;
    }
}

impl Tree {
    pub fn selection(&self) -> Option<&RangeSelection> {
        self.selection.as_ref()
    }

    pub fn selection_mut(&mut self) -> Option<&mut RangeSelection> {
        self.selection.as_mut()
    }

    pub fn set_selection(&mut self, selection: Option<RangeSelection>) {
        self.selection = selection;
    }

    /// Select a range inside one text node; the selection takes the node's format
    pub fn select_text(&mut self, key: NodeKey, anchor: usize, focus: usize) -> Result<()> {
        let text = self.text(key).ok_or(Error::NotText(key))?;
        for offset in [anchor, focus] {
            if offset > text.len() || !text.is_char_boundary(offset) {
                return Err(Error::InvalidOffset {
                    key,
                    offset,
                    len: text.len(),
                });
            }
        }
        let mut selection = RangeSelection::new(Point::text(key, anchor), Point::text(key, focus));
        selection.format = self.format(key);
        self.selection = Some(selection);
        Ok(())
    }

    /// Collapse the caret at the start of a node's content
    pub fn select_start(&mut self, key: NodeKey) -> Result<()> {
        if self.is_text(key) {
            return self.select_text(key, 0, 0);
        }
        if !self.contains(key) {
            return Err(Error::NodeNotFound(key));
        }
        match self.first_descendant(key).filter(|&d| self.is_text(d)) {
            Some(text) => self.select_text(text, 0, 0),
            None => {
                self.selection = Some(RangeSelection::collapsed(Point::element(key, 0)));
                Ok(())
            }
        }
    }

    /// Collapse the caret at the end of a node's content
    pub fn select_end(&mut self, key: NodeKey) -> Result<()> {
        if let Some(len) = self.text(key).map(str::len) {
            return self.select_text(key, len, len);
        }
        if !self.contains(key) {
            return Err(Error::NodeNotFound(key));
        }
        match self.last_descendant(key).filter(|&d| self.is_text(d)) {
            Some(text) => {
                let len = self.text(text).map_or(0, str::len);
                self.select_text(text, len, len)
            }
            None => {
                let len = self.children_len(key);
                self.selection = Some(RangeSelection::collapsed(Point::element(key, len)));
                Ok(())
            }
        }
    }

    /// Collapse the caret right after `key`
    pub fn select_next(&mut self, key: NodeKey) -> Result<()> {
        if let Some(next) = self.next_sibling(key).filter(|&n| self.is_text(n)) {
            return self.select_text(next, 0, 0);
        }
        let parent = self.parent(key).ok_or(Error::NodeNotFound(key))?;
        let index = self.index_in_parent(key).ok_or(Error::NodeNotFound(key))?;
        self.selection = Some(RangeSelection::collapsed(Point::element(parent, index + 1)));
        Ok(())
    }

    /// Anchor and focus in document order
    fn ordered_points(&self, selection: &RangeSelection) -> (Point, Point) {
        let (a, f) = (selection.anchor, selection.focus);
        if a.key == f.key {
            return if a.offset <= f.offset { (a, f) } else { (f, a) };
        }
        let order = self.text_nodes(self.root());
        let position = |k| order.iter().position(|&n| n == k);
        match (position(a.key), position(f.key)) {
            (Some(pa), Some(pf)) if pf < pa => (f, a),
            _ => (a, f),
        }
    }

    /// Set `format` on every text run covered by the selection, splitting the
    /// boundary runs. Afterwards the selection spans exactly the formatted
    /// runs and carries `format` as well.
    pub fn format_selection(&mut self, format: TextFormat) -> Result<()> {
        let selection = self.selection.clone().ok_or(Error::NoSelection)?;
        let (start, end) = self.ordered_points(&selection);
        if !self.is_text(start.key) || !self.is_text(end.key) {
            return Ok(());
        }

        let targets = if start.key == end.key {
            if start.offset == end.offset {
                return Ok(());
            }
            let parts = self.split_text(start.key, &[start.offset, end.offset])?;
            let middle = if start.offset == 0 { parts[0] } else { parts[1] };
            vec![middle]
        } else {
            let start_len = self.text(start.key).map_or(0, str::len);
            if end.offset > 0 {
                self.split_text(end.key, &[end.offset])?;
            }
            let first = if start.offset >= start_len {
                None
            } else if start.offset == 0 {
                Some(start.key)
            } else {
                self.split_text(start.key, &[start.offset])?.get(1).copied()
            };

            let order = self.text_nodes(self.root());
            let Some(start_pos) = order.iter().position(|&k| k == start.key) else {
                return Ok(());
            };
            let Some(end_pos) = order.iter().position(|&k| k == end.key) else {
                return Ok(());
            };
            let from = if first == Some(start.key) { start_pos } else { start_pos + 1 };
            let to = if end.offset > 0 { end_pos + 1 } else { end_pos };
            order.get(from..to).map(<[NodeKey]>::to_vec).unwrap_or_default()
        };

        for &key in &targets {
            let current = self.format(key);
            self.set_format(key, current | format)?;
        }

        let mut next = selection;
        if let (Some(&first), Some(&last)) = (targets.first(), targets.last()) {
            let len = self.text(last).map_or(0, str::len);
            next.anchor = Point::text(first, 0);
            next.focus = Point::text(last, len);
        }
        next.format |= format;
        self.selection = Some(next);
        Ok(())
    }

    /// Insert text at the caret, as if typed. Text inherits the selection's
    /// format; when that differs from the run under the caret a new run is
    /// created. A non-collapsed selection is collapsed to its anchor first.
    pub fn insert_text(&mut self, text: &str) -> Result<()> {
        let selection = self.selection.clone().ok_or(Error::NoSelection)?;
        let point = selection.anchor;
        let format = selection.format;

        let (key, offset) = match point.kind {
            PointKind::Text => {
                let current = self.text(point.key).ok_or(Error::NotText(point.key))?.to_owned();
                if point.offset > current.len() || !current.is_char_boundary(point.offset) {
                    return Err(Error::InvalidOffset {
                        key: point.key,
                        offset: point.offset,
                        len: current.len(),
                    });
                }
                if self.format(point.key) == format && self.is_simple_text(point.key) {
                    let mut updated = current;
                    updated.insert_str(point.offset, text);
                    self.set_text(point.key, updated)?;
                    (point.key, point.offset + text.len())
                } else {
                    let run = self.create_formatted_text(text, format);
                    if point.offset == 0 {
                        self.insert_before(point.key, run)?;
                    } else if point.offset == current.len() {
                        self.insert_after(point.key, run)?;
                    } else {
                        let parts = self.split_text(point.key, &[point.offset])?;
                        self.insert_after(parts[0], run)?;
                    }
                    (run, text.len())
                }
            }
            PointKind::Element => {
                let run = self.create_formatted_text(text, format);
                self.insert_child(point.key, point.offset, run)?;
                (run, text.len())
            }
        };

        let mut next = RangeSelection::collapsed(Point::text(key, offset));
        next.format = format;
        self.selection = Some(next);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn single_paragraph(text: &str) -> (Tree, NodeKey, NodeKey) {
        let mut tree = Tree::new();
        let paragraph = tree.create_paragraph();
        let key = tree.create_text(text);
        tree.append(paragraph, key).unwrap();
        tree.append(tree.root(), paragraph).unwrap();
        (tree, paragraph, key)
    }

    #[test]
    fn test_format_selection_inside_one_node() {
        let (mut tree, paragraph, text) = single_paragraph("say hello now");
        tree.select_text(text, 4, 9).unwrap();
        tree.format_selection(TextFormat::BOLD).unwrap();

        let children = tree.children(paragraph).to_vec();
        assert_eq!(children.len(), 3);
        assert_eq!(tree.text(children[1]), Some("hello"));
        assert!(tree.has_format(children[1], TextFormat::BOLD));
        assert!(!tree.has_format(children[0], TextFormat::BOLD));

        let selection = tree.selection().unwrap();
        assert_eq!(selection.anchor, Point::text(children[1], 0));
        assert_eq!(selection.focus, Point::text(children[1], 5));
        assert!(selection.has_format(TextFormat::BOLD));
    }

    #[test]
    fn test_format_selection_across_nodes() {
        let (mut tree, paragraph, first) = single_paragraph("ab");
        let second = tree.create_text("cd");
        tree.append(paragraph, second).unwrap();

        let mut selection = RangeSelection::new(Point::text(first, 1), Point::text(second, 1));
        selection.format = TextFormat::empty();
        tree.set_selection(Some(selection));
        tree.format_selection(TextFormat::ITALIC).unwrap();

        let texts: Vec<_> = tree
            .children(paragraph)
            .iter()
            .map(|&k| (tree.text(k).unwrap().to_string(), tree.format(k)))
            .collect();
        assert_eq!(
            texts,
            vec![
                ("a".to_string(), TextFormat::empty()),
                ("b".to_string(), TextFormat::ITALIC),
                ("c".to_string(), TextFormat::ITALIC),
                ("d".to_string(), TextFormat::empty()),
            ]
        );
    }

    #[test]
    fn test_insert_text_extends_run() {
        let (mut tree, _, text) = single_paragraph("ab");
        tree.select_end(text).unwrap();
        tree.insert_text("c").unwrap();

        assert_eq!(tree.text(text), Some("abc"));
        assert_eq!(tree.selection().unwrap().anchor, Point::text(text, 3));
        assert!(tree.is_dirty(text));
    }

    #[test]
    fn test_insert_text_with_different_format_creates_run() {
        let (mut tree, paragraph, text) = single_paragraph("bold");
        tree.set_format(text, TextFormat::BOLD).unwrap();
        tree.select_end(text).unwrap();
        tree.selection_mut().unwrap().format = TextFormat::empty();
        tree.insert_text("!").unwrap();

        let children = tree.children(paragraph).to_vec();
        assert_eq!(children.len(), 2);
        assert_eq!(tree.text(children[1]), Some("!"));
        assert_eq!(tree.format(children[1]), TextFormat::empty());
    }

    #[test]
    fn test_insert_text_into_empty_element() {
        let mut tree = Tree::new();
        let paragraph = tree.create_paragraph();
        tree.append(tree.root(), paragraph).unwrap();
        tree.select_start(paragraph).unwrap();
        tree.insert_text("#").unwrap();

        let text = tree.first_child(paragraph).unwrap();
        assert_eq!(tree.text(text), Some("#"));
        assert_eq!(tree.selection().unwrap().anchor, Point::text(text, 1));
    }

    #[test]
    fn test_select_next_without_text_sibling() {
        let (mut tree, paragraph, text) = single_paragraph("x");
        tree.select_next(text).unwrap();
        assert_eq!(tree.selection().unwrap().anchor, Point::element(paragraph, 1));
    }
}
