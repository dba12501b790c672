// SPDX-License-Identifier: AGPL-3.0-or-later
//! Live shortcuts: markdown applied while typing
//!
//! A listener on the editor's update stream looks only at the text node
//! under a collapsed caret. Three detectors run in order and the first that
//! fires wins:
//! 1. element shortcuts at the start of a top-level block (`# `, `> `, `- `)
//! 2. text-match shortcuts keyed by the typed trigger (`)` closes a link)
//! 3. text-format shortcuts keyed by the last character of a close tag
//!
//! A detector that does not fire leaves the tree untouched. Errors from
//! transformer callbacks propagate to [`Editor::update`].
//!
//! Transformer callbacks must not move the caret in a way that makes the
//! next notification fire the same shortcut again.

use crate::config::ShortcutConfig;
use crate::error::Result;
use crate::matcher::TagIndex;
use crate::registry::TransformersByType;
use crate::transformer::{
    is_punctuation_or_space, ElementTransformer, Match, TextMatchTransformer, Transformer,
};
use richmark_core::{
    Editor, Error, ListenerId, NodeKey, NodeType, Point, PointKind, RangeSelection, TextFormat,
    Tree, UpdatePayload, TAG_COLLABORATION, TAG_HISTORIC,
};
use std::collections::HashMap;

/// Handle returned by [`register_live_shortcuts`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShortcutHandle(ListenerId);

impl ShortcutHandle {
    pub fn listener(&self) -> ListenerId {
        self.0
    }

    /// Remove the listener; returns false when it was already gone
    pub fn unregister(self, editor: &mut Editor) -> bool {
        let removed = editor.remove_update_listener(self.0);
        tracing::debug!(removed, "live shortcuts unregistered");
        removed
    }
}

/// Install the shortcut listener on `editor`.
///
/// Fails with [`Error::MissingNode`] when a node type an element or
/// text-match transformer creates is not registered with the editor.
pub fn register_live_shortcuts(
    editor: &mut Editor,
    transformers: &[Transformer],
    config: &ShortcutConfig,
) -> Result<ShortcutHandle> {
    let by_type = TransformersByType::new(transformers);

    let dependencies = by_type
        .element
        .iter()
        .map(|t| (&t.name, &t.dependencies))
        .chain(by_type.text_match.iter().map(|t| (&t.name, &t.dependencies)));
    for (name, nodes) in dependencies {
        if let Some(&node) = nodes.iter().find(|&&node| !editor.has_node(node)) {
            tracing::warn!(transformer = %name, %node, "shortcut dependency not registered");
            return Err(Error::MissingNode {
                node,
                transformer: name.clone(),
            }
            .into());
        }
    }

    let caret = editor.tree().selection().map(|s| caret_position(editor.tree(), &s.anchor));
    let mut shortcuts = LiveShortcuts::new(by_type, config, caret)?;
    let id = editor.register_update_listener(Box::new(
        move |tree: &mut Tree, payload: &UpdatePayload| shortcuts.on_update(tree, payload),
    ));
    tracing::debug!(listener = ?id, "live shortcuts registered");
    Ok(ShortcutHandle(id))
}

/// Caret position counted in characters for text points
fn caret_position(tree: &Tree, point: &Point) -> usize {
    match point.kind {
        PointKind::Text => tree
            .text(point.key)
            .and_then(|text| text.get(..point.offset))
            .map_or(point.offset, |before| before.chars().count()),
        PointKind::Element => point.offset,
    }
}

struct LiveShortcuts {
    elements: Vec<ElementTransformer>,
    /// Text-match transformers by trigger character
    by_trigger: HashMap<char, Vec<TextMatchTransformer>>,
    /// Text-format tag indexes by the last character of the tag
    by_close_char: HashMap<char, Vec<usize>>,
    tag_index: TagIndex,
    /// Caret position in characters after the previous notification
    prev_position: Option<usize>,
}

impl LiveShortcuts {
    fn new(
        by_type: TransformersByType,
        config: &ShortcutConfig,
        caret: Option<usize>,
    ) -> Result<Self> {
        let tag_index = TagIndex::new(&by_type.text_format, config.matcher)?;

        let mut by_close_char: HashMap<char, Vec<usize>> = HashMap::new();
        for (i, transformer) in by_type.text_format.iter().enumerate() {
            if let Some(c) = transformer.last_char() {
                by_close_char.entry(c).or_default().push(i);
            }
        }
        let mut by_trigger: HashMap<char, Vec<TextMatchTransformer>> = HashMap::new();
        for transformer in by_type.text_match {
            by_trigger.entry(transformer.trigger).or_default().push(transformer);
        }

        Ok(Self {
            elements: by_type.element,
            by_trigger,
            by_close_char,
            tag_index,
            prev_position: caret,
        })
    }

    fn on_update(&mut self, tree: &mut Tree, payload: &UpdatePayload) -> richmark_core::Result<()> {
        self.run(tree, payload, self.prev_position)?;
        self.prev_position = tree.selection().map(|s| caret_position(tree, &s.anchor));
        Ok(())
    }

    fn run(
        &self,
        tree: &mut Tree,
        payload: &UpdatePayload,
        prev_position: Option<usize>,
    ) -> richmark_core::Result<()> {
        if payload.has_tag(TAG_COLLABORATION)
            || payload.has_tag(TAG_HISTORIC)
            || payload.composing
        {
            return Ok(());
        }
        let Some(prev_position) = prev_position else {
            return Ok(());
        };
        let Some(selection) = tree.selection().filter(|s| s.is_collapsed()) else {
            return Ok(());
        };
        let anchor = selection.anchor.key;
        let offset = selection.anchor.offset;
        let position = caret_position(tree, &selection.anchor);

        if !tree.is_simple_text(anchor) || !payload.dirty_leaves.contains(&anchor) {
            return Ok(());
        }
        if position != 1 && position > prev_position + 1 {
            return Ok(());
        }
        if tree.has_format(anchor, TextFormat::CODE) {
            return Ok(());
        }
        let Some(parent) = tree.parent(anchor) else {
            return Ok(());
        };
        if tree.node_type(parent) == Some(NodeType::Code) {
            return Ok(());
        }

        if self.run_element(tree, parent, anchor, offset)? {
            tracing::debug!(node = %anchor, offset, "element shortcut applied");
        } else if self.run_text_match(tree, anchor, offset)? {
            tracing::debug!(node = %anchor, offset, "text match shortcut applied");
        } else if self.run_text_format(tree, anchor, offset)? {
            tracing::debug!(node = %anchor, offset, "text format shortcut applied");
        }
        Ok(())
    }

    /// Block shortcut typed at the start of a top-level block
    fn run_element(
        &self,
        tree: &mut Tree,
        parent: NodeKey,
        anchor: NodeKey,
        offset: usize,
    ) -> richmark_core::Result<bool> {
        let grandparent = tree.parent(parent);
        if grandparent != Some(tree.root()) || tree.first_child(parent) != Some(anchor) {
            return Ok(false);
        }
        let Some(text) = tree.text(anchor).map(str::to_string) else {
            return Ok(false);
        };
        if offset == 0 || text.as_bytes().get(offset - 1) != Some(&b' ') {
            return Ok(false);
        }

        for transformer in &self.elements {
            let Some(captures) = transformer.pattern.captures(&text) else {
                continue;
            };
            let m = Match::from_captures(&captures);
            // Patterns ending in optional whitespace may stop before the space
            let expected = if m.full_text.ends_with(' ') { offset } else { offset - 1 };
            if m.len() != expected {
                continue;
            }
            let next_siblings = tree.next_siblings(anchor);
            let parts = tree.split_text(anchor, &[offset])?;
            tree.remove(parts[0])?;
            let children: Vec<NodeKey> =
                parts.get(1).copied().into_iter().chain(next_siblings).collect();
            tracing::trace!(transformer = %transformer.name, "element shortcut matched");
            (transformer.replace)(tree, parent, children, &m, false)?;
            return Ok(true);
        }
        Ok(false)
    }

    /// Inline node matched by the text up to the caret
    fn run_text_match(
        &self,
        tree: &mut Tree,
        anchor: NodeKey,
        offset: usize,
    ) -> richmark_core::Result<bool> {
        let Some(text) = tree.text(anchor).map(str::to_string) else {
            return Ok(false);
        };
        let Some(before) = text.get(..offset) else {
            return Ok(false);
        };
        let trigger = before.chars().next_back();
        let Some(transformers) = trigger.and_then(|c| self.by_trigger.get(&c)) else {
            return Ok(false);
        };

        for transformer in transformers {
            let Some(captures) = transformer.match_pattern.captures(before) else {
                continue;
            };
            let m = Match::from_captures(&captures);
            if m.is_empty() {
                continue;
            }
            let replace_node = if m.start_index == 0 {
                tree.split_text(anchor, &[m.end_index()])?[0]
            } else {
                tree.split_text(anchor, &[m.start_index, m.end_index()])?[1]
            };
            tree.select_next(replace_node)?;
            tracing::trace!(transformer = %transformer.name, "text match shortcut matched");
            (transformer.replace)(tree, replace_node, &m)?;
            return Ok(true);
        }
        Ok(false)
    }

    /// Close tag typed right before the caret; searches back for its open tag
    fn run_text_format(
        &self,
        tree: &mut Tree,
        anchor: NodeKey,
        offset: usize,
    ) -> richmark_core::Result<bool> {
        let Some(text) = tree.text(anchor).map(str::to_string) else {
            return Ok(false);
        };
        let Some(before) = text.get(..offset) else {
            return Ok(false);
        };
        let Some(close_char) = before.chars().next_back() else {
            return Ok(false);
        };
        let Some(candidates) = self.by_close_char.get(&close_char) else {
            return Ok(false);
        };

        for &tag in candidates {
            let Some(transformer) = self.tag_index.transformer(tag) else {
                continue;
            };
            if !before.ends_with(transformer.tag.as_str()) {
                continue;
            }
            let tag_len = transformer.tag.len();
            let close_start = offset - tag_len;

            if text[..close_start]
                .chars()
                .next_back()
                .is_some_and(|c| c.is_whitespace() || c == '\\')
            {
                continue;
            }
            if !transformer.intraword {
                let after = text[offset..].chars().next();
                if after.is_some() && !is_punctuation_or_space(after) {
                    continue;
                }
            }

            let open = self.find_open_tag(tree, anchor, &text, close_start, tag);
            let Some((open_node, open_start)) = open else {
                continue;
            };
            let same_node = open_node == anchor;
            if same_node && open_start + tag_len == close_start {
                continue;
            }
            let open_text = if same_node {
                text.clone()
            } else {
                tree.text(open_node).unwrap_or_default().to_string()
            };
            let before_open = open_text[..open_start].chars().next_back();
            if before_open == Some(close_char) {
                continue;
            }
            if !transformer.intraword
                && before_open.is_some()
                && !is_punctuation_or_space(before_open)
            {
                continue;
            }

            // Close tag first so the open tag offset stays valid
            let close_text = format!("{}{}", &text[..close_start], &text[offset..]);
            tree.set_text(anchor, close_text.as_str())?;
            let open_text = if same_node { close_text } else { open_text };
            let stripped = format!(
                "{}{}",
                &open_text[..open_start],
                &open_text[open_start + tag_len..]
            );
            tree.set_text(open_node, stripped)?;

            let previous_format = tree.selection().map(|s| s.format).unwrap_or_default();
            let focus = close_start - if same_node { tag_len } else { 0 };
            tree.set_selection(Some(RangeSelection::new(
                Point::text(open_node, open_start),
                Point::text(anchor, focus),
            )));

            for &format in &transformer.formats {
                if !tree.selection().is_some_and(|s| s.has_format(format)) {
                    tree.format_selection(format)?;
                }
            }
            if let Some(selection) = tree.selection_mut() {
                selection.collapse_to_focus();
                selection.format = previous_format;
            }
            tracing::trace!(tag = %transformer.tag, "text format shortcut matched");
            return Ok(true);
        }
        Ok(false)
    }

    /// Open tag in the anchor before `close_start`, else in earlier text
    /// siblings up to a line break
    fn find_open_tag(
        &self,
        tree: &Tree,
        anchor: NodeKey,
        text: &str,
        close_start: usize,
        tag: usize,
    ) -> Option<(NodeKey, usize)> {
        if let Some(start) = self.tag_index.find_open_tag_before(text, close_start, tag) {
            return Some((anchor, start));
        }
        let mut sibling = tree.previous_sibling(anchor);
        while let Some(current) = sibling {
            if tree.is_line_break(current) {
                return None;
            }
            if let Some(sibling_text) = tree.text(current) {
                let len = sibling_text.len();
                if let Some(start) = self.tag_index.find_open_tag_before(sibling_text, len, tag) {
                    return Some((current, start));
                }
            }
            sibling = tree.previous_sibling(current);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MatcherBackend;
    use crate::error::MarkdownError;
    use crate::test_support::{init_tracing, DEFAULTS};
    use crate::transformer::TextFormatTransformer;
    use pretty_assertions::assert_eq;
    use richmark_core::{ElementKind, ListKind};

    fn setup_custom(
        transformers: &[Transformer],
        config: &ShortcutConfig) -> (Editor,
        ShortcutHandle,
    ) {
        init_tracing();
        let mut editor = Editor::with_all_nodes();
        let handle = register_live_shortcuts(&mut editor, transformers, config).unwrap();
        editor
            .update(&[], |tree| {
                let paragraph = tree.create_paragraph();
                tree.append(tree.root(), paragraph)?;
                tree.select_start(paragraph)
            })
            .unwrap();
        (editor, handle)
    }

    fn setup_with(config: &ShortcutConfig) -> (Editor, ShortcutHandle) {
        setup_custom(&DEFAULTS, config)
    }

    fn setup() -> (Editor, ShortcutHandle) {
        setup_with(&ShortcutConfig::default())
    }

    fn first_block(editor: &Editor) -> NodeKey {
        let tree = editor.tree();
        tree.first_child(tree.root()).unwrap()
    }

    /// Text and format of each child of the first block
    fn runs(editor: &Editor) -> Vec<(String, TextFormat)> {
        let tree = editor.tree();
        tree.children(first_block(editor))
            .iter()
            .map(|&k| (tree.text(k).unwrap_or_default().to_string(), tree.format(k)))
            .collect()
    }

    /// Text and format of every text node in the first block, in order
    fn text_runs(editor: &Editor) -> Vec<(String, TextFormat)> {
        let tree = editor.tree();
        tree.text_nodes(first_block(editor))
            .iter()
            .map(|&k| (tree.text(k).unwrap_or_default().to_string(), tree.format(k)))
            .collect()
    }

    #[test]
    fn test_heading_shortcut() {
        let (mut editor, _) = setup();
        editor.type_text("# Title").unwrap();

        let tree = editor.tree();
        let block = first_block(&editor);
        assert_eq!(tree.element_kind(block), Some(&ElementKind::Heading { level: 1 }));
        assert_eq!(tree.text_content(block), "Title");
        assert_eq!(tree.children_len(tree.root()), 1);
    }

    #[test]
    fn test_heading_shortcut_needs_line_start() {
        let (mut editor, _) = setup();
        editor.type_text("ab # ").unwrap();

        let tree = editor.tree();
        let block = first_block(&editor);
        assert_eq!(tree.node_type(block), Some(NodeType::Paragraph));
        assert_eq!(tree.text_content(block), "ab # ");
    }

    #[test]
    fn test_bold_shortcut_and_typing_after() {
        let (mut editor, _) = setup();
        editor.type_text("**bold**").unwrap();
        assert_eq!(runs(&editor), vec![("bold".to_string(), TextFormat::BOLD)]);

        editor.type_text(" more").unwrap();
        assert_eq!(
            runs(&editor),
            vec![
                ("bold".to_string(), TextFormat::BOLD),
                (" more".to_string(), TextFormat::empty()),
            ]
        );
    }

    #[test]
    fn test_bold_italic_waits_for_third_star() {
        let (mut editor, _) = setup();
        editor.type_text("***x**").unwrap();
        assert_eq!(runs(&editor), vec![("***x**".to_string(), TextFormat::empty())]);

        editor.type_text("*").unwrap();
        assert_eq!(
            runs(&editor),
            vec![("x".to_string(), TextFormat::BOLD | TextFormat::ITALIC)]
        );
    }

    #[test]
    fn test_underscore_rejected_inside_word() {
        let (mut editor, _) = setup();
        editor.type_text("a_b_").unwrap();
        assert_eq!(runs(&editor), vec![("a_b_".to_string(), TextFormat::empty())]);
    }

    #[test]
    fn test_underscore_after_space() {
        let (mut editor, _) = setup();
        editor.type_text("a _b_").unwrap();
        assert_eq!(
            runs(&editor),
            vec![
                ("a ".to_string(), TextFormat::empty()),
                ("b".to_string(), TextFormat::ITALIC),
            ]
        );
    }

    #[test]
    fn test_scanner_backend_formats_the_same() {
        let (mut editor, _) = setup_with(&ShortcutConfig {
            matcher: MatcherBackend::Scanner,
        });
        editor.type_text("x ~~gone~~").unwrap();
        assert_eq!(
            runs(&editor),
            vec![
                ("x ".to_string(), TextFormat::empty()),
                ("gone".to_string(), TextFormat::STRIKETHROUGH),
            ]
        );
    }

    #[test]
    fn test_link_shortcut() {
        let (mut editor, _) = setup();
        editor.type_text("see [a](b) x").unwrap();

        let tree = editor.tree();
        let children = tree.children(first_block(&editor)).to_vec();
        assert_eq!(children.len(), 3);
        assert_eq!(tree.text(children[0]), Some("see "));
        assert_eq!(
            tree.element_kind(children[1]),
            Some(&ElementKind::Link {
                url: "b".into(),
                title: None
            })
        );
        assert_eq!(tree.text_content(children[1]), "a");
        assert_eq!(tree.text(children[2]), Some(" x"));
    }

    #[test]
    fn test_list_shortcut() {
        let (mut editor, _) = setup();
        editor.type_text("- item").unwrap();

        let tree = editor.tree();
        let list = first_block(&editor);
        assert_eq!(
            tree.element_kind(list),
            Some(&ElementKind::List {
                kind: ListKind::Bullet,
                start: 1
            })
        );
        assert_eq!(tree.text_content(list), "item");
    }

    #[test]
    fn test_code_shortcut_stops_inline_formats() {
        let (mut editor, _) = setup();
        editor.type_text("``` **a**").unwrap();

        let tree = editor.tree();
        let code = first_block(&editor);
        assert_eq!(tree.element_kind(code), Some(&ElementKind::Code { language: None }));
        assert_eq!(runs(&editor), vec![("**a**".to_string(), TextFormat::empty())]);
    }

    #[test]
    fn test_historic_update_skipped() {
        let (mut editor, _) = setup();
        editor.type_text("**a*").unwrap();
        editor
            .update(&[TAG_HISTORIC], |tree| tree.insert_text("*"))
            .unwrap();
        assert_eq!(runs(&editor), vec![("**a**".to_string(), TextFormat::empty())]);
    }

    #[test]
    fn test_composing_skipped() {
        let (mut editor, _) = setup();
        editor.set_composing(true);
        editor.type_text("**a**").unwrap();
        assert_eq!(runs(&editor), vec![("**a**".to_string(), TextFormat::empty())]);
    }

    #[test]
    fn test_pasted_text_skipped() {
        let (mut editor, _) = setup();
        editor.type_text("x").unwrap();
        editor.update(&[], |tree| tree.insert_text("**a**")).unwrap();
        assert_eq!(runs(&editor), vec![("x**a**".to_string(), TextFormat::empty())]);
    }

    #[test]
    fn test_missing_node_fails_registration() {
        let mut editor = Editor::default();
        let result = register_live_shortcuts(&mut editor, &DEFAULTS, &ShortcutConfig::default());
        assert!(matches!(
            result,
            Err(MarkdownError::Tree(Error::MissingNode {
                node: NodeType::Heading,
                ..
            }))
        ));
    }

    #[test]
    fn test_unregister_stops_shortcuts() {
        let (mut editor, handle) = setup();
        assert!(handle.unregister(&mut editor));
        editor.type_text("# a").unwrap();

        let tree = editor.tree();
        assert_eq!(tree.node_type(first_block(&editor)), Some(NodeType::Paragraph));
        assert!(!handle.unregister(&mut editor));
    }

    #[test]
    fn test_non_ascii_tag_shortcut() {
        let mut transformers = DEFAULTS.clone();
        transformers.push(TextFormatTransformer::new("°", vec![TextFormat::BOLD]).into());
        let (mut editor, _) = setup_custom(&transformers, &ShortcutConfig::default());
        editor.type_text("x °a°").unwrap();
        assert_eq!(
            runs(&editor),
            vec![
                ("x ".to_string(), TextFormat::empty()),
                ("a".to_string(), TextFormat::BOLD),
            ]
        );
    }

    #[test]
    fn test_open_tag_in_earlier_sibling() {
        let (mut editor, _) = setup();
        editor.type_text("**see [x](u) here**").unwrap();
        assert_eq!(
            text_runs(&editor),
            vec![
                ("see ".to_string(), TextFormat::BOLD),
                ("x".to_string(), TextFormat::BOLD),
                (" here".to_string(), TextFormat::BOLD),
            ]
        );
    }

    #[test]
    fn test_open_tag_search_stops_at_line_break() {
        let (mut editor, _) = setup();
        editor.type_text("**a").unwrap();
        editor
            .update(&[], |tree| {
                let anchor = tree.selection().map(|s| s.anchor.key).ok_or(Error::NoSelection)?;
                let line_break = tree.create_line_break();
                tree.insert_after(anchor, line_break)?;
                tree.select_next(line_break)
            })
            .unwrap();
        editor.type_text("b**").unwrap();
        assert_eq!(
            text_runs(&editor),
            vec![
                ("**a".to_string(), TextFormat::empty()),
                ("b**".to_string(), TextFormat::empty()),
            ]
        );
    }

    #[test]
    fn test_code_formatted_anchor_skipped() {
        let (mut editor, _) = setup();
        editor.type_text("**a*").unwrap();
        editor
            .update(&[], |tree| {
                let anchor = tree.selection().map(|s| s.anchor.key).ok_or(Error::NoSelection)?;
                tree.set_format(anchor, TextFormat::CODE)?;
                if let Some(selection) = tree.selection_mut() {
                    selection.format = TextFormat::CODE;
                }
                Ok(())
            })
            .unwrap();
        editor.type_text("*").unwrap();
        assert_eq!(runs(&editor), vec![("**a**".to_string(), TextFormat::CODE)]);
    }

    #[test]
    fn test_ordered_list_shortcut() {
        let (mut editor, _) = setup();
        editor.type_text("3. x").unwrap();

        let tree = editor.tree();
        let list = first_block(&editor);
        assert_eq!(
            tree.element_kind(list),
            Some(&ElementKind::List {
                kind: ListKind::Ordered,
                start: 3
            })
        );
        assert_eq!(tree.text_content(list), "x");
    }

    #[test]
    fn test_caret_before_registration_counts() {
        init_tracing();
        let mut editor = Editor::with_all_nodes();
        editor
            .update(&[], |tree| {
                let paragraph = tree.create_paragraph();
                let text = tree.create_text("**a*");
                tree.append(paragraph, text)?;
                tree.append(tree.root(), paragraph)?;
                tree.select_end(text)
            })
            .unwrap();
        register_live_shortcuts(&mut editor, &DEFAULTS, &ShortcutConfig::default()).unwrap();

        editor.type_text("*").unwrap();
        assert_eq!(runs(&editor), vec![("a".to_string(), TextFormat::BOLD)]);
    }
}
