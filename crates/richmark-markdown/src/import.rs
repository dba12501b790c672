// SPDX-License-Identifier: AGPL-3.0-or-later
//! Batch import: markdown source to tree
//!
//! Lines are walked with lookahead. Multi-line element transformers claim a
//! span of lines; every other line becomes a paragraph that single-line
//! element transformers may turn into a block. Inline markup is resolved by
//! recursive splitting of text nodes.
//!
//! The recursion works on the live tree: each split changes the nodes later
//! steps see, so the order below (format pairs first, then the matched part,
//! then the leading and trailing parts) is part of the result.

use crate::config::ImportConfig;
use crate::error::Result;
use crate::matcher::TagIndex;
use crate::registry::TransformersByType;
use crate::transformer::{ElementTransformer, Interior, Match, TextMatchTransformer, Transformer};
use richmark_core::{NodeKey, NodeType, TextFormat, Tree};

/// Replace the children of `root` (the tree root when `None`) with the
/// content of `markdown`.
///
/// When the tree held a selection the caret ends at the end of `root`.
pub fn import_markdown(
    markdown: &str,
    tree: &mut Tree,
    root: Option<NodeKey>,
    transformers: &[Transformer],
    config: &ImportConfig,
) -> Result<()> {
    let root = root.unwrap_or_else(|| tree.root());
    let by_type = TransformersByType::new(transformers);
    let importer = Importer {
        tag_index: TagIndex::new(&by_type.text_format, config.matcher)?,
        by_type,
    };

    let lines: Vec<&str> = markdown
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .collect();

    let had_selection = tree.selection().is_some();
    tree.clear(root)?;
    importer.import_lines(tree, root, &lines)?;

    for child in tree.children(root).to_vec() {
        if is_empty_paragraph(tree, child) && tree.children_len(root) > 1 {
            tree.remove(child)?;
        }
    }

    if had_selection {
        tree.select_end(root)?;
    }
    tracing::debug!(lines = lines.len(), blocks = tree.children_len(root), "markdown imported");
    Ok(())
}

/// Paragraph with no content, or one text node of at most three whitespace
/// characters
fn is_empty_paragraph(tree: &Tree, key: NodeKey) -> bool {
    if tree.node_type(key) != Some(NodeType::Paragraph) {
        return false;
    }
    let Some(first) = tree.first_child(key) else {
        return true;
    };
    tree.children_len(key) == 1
        && tree
            .text(first)
            .is_some_and(|text| text.chars().count() <= 3 && text.chars().all(char::is_whitespace))
}

struct Importer {
    by_type: TransformersByType,
    tag_index: TagIndex,
}

impl Importer {
    fn import_lines(&self, tree: &mut Tree, parent: NodeKey, lines: &[&str]) -> Result<()> {
        let mut i = 0;
        while i < lines.len() {
            i = match self.import_multiline(tree, parent, lines, i)? {
                Some(next) => next,
                None => {
                    self.import_block(tree, parent, lines[i])?;
                    i + 1
                }
            };
        }
        Ok(())
    }

    /// Try multi-line transformers at line `start`; returns the index of the
    /// next unconsumed line when one matched
    fn import_multiline(
        &self,
        tree: &mut Tree,
        parent: NodeKey,
        lines: &[&str],
        start: usize,
    ) -> Result<Option<usize>> {
        for transformer in self.by_type.multiline_elements() {
            let Some(line_span) = transformer.line_span else {
                continue;
            };
            let Some(captures) = transformer.pattern.captures(lines[start]) else {
                continue;
            };
            let span = line_span(lines, start);
            if start + span >= lines.len() {
                continue;
            }

            let m = Match::from_captures(&captures);
            let interior = &lines[start + 1..start + 1 + span];
            self.apply_multiline(tree, parent, transformer, interior, &m)?;

            let mut next = start + 1 + span;
            let closes = transformer
                .close_pattern
                .as_ref()
                .is_some_and(|close| lines.get(next).is_some_and(|line| close.is_match(line)));
            if closes {
                next += 1;
            }
            tracing::trace!(
                transformer = %transformer.name,
                line = start,
                span,
                "multi-line block imported"
            );
            return Ok(Some(next));
        }
        Ok(None)
    }

    fn apply_multiline(
        &self,
        tree: &mut Tree,
        parent: NodeKey,
        transformer: &ElementTransformer,
        interior: &[&str],
        m: &Match,
    ) -> Result<()> {
        let holder = tree.create_paragraph();
        tree.append(parent, holder)?;
        match transformer.interior {
            Interior::Verbatim => {
                if !interior.is_empty() {
                    let text = tree.create_text(interior.join("\n"));
                    tree.append(holder, text)?;
                }
            }
            Interior::Markdown => self.import_lines(tree, holder, interior)?,
        }
        let children = tree.children(holder).to_vec();
        (transformer.replace)(tree, holder, children, m, true)?;
        Ok(())
    }

    /// One line as a paragraph, a single-line block, or merged into the
    /// block before it
    fn import_block(&self, tree: &mut Tree, parent: NodeKey, line: &str) -> Result<()> {
        let trimmed = line.trim();
        let text = tree.create_text(trimmed);
        let paragraph = tree.create_paragraph();
        tree.append(paragraph, text)?;
        tree.append(parent, paragraph)?;

        for transformer in self.by_type.single_line_elements() {
            if let Some(captures) = transformer.pattern.captures(line) {
                let m = Match::from_captures(&captures);
                tree.set_text(text, &line[m.len()..])?;
                tracing::trace!(transformer = %transformer.name, "block transformer matched");
                (transformer.replace)(tree, paragraph, vec![text], &m, true)?;
                break;
            }
        }

        self.import_text_formats(tree, text)?;

        if tree.contains(paragraph) && tree.is_attached(paragraph) && !trimmed.is_empty() {
            if let Some(target) = self.merge_target(tree, paragraph) {
                let line_break = tree.create_line_break();
                tree.append(target, line_break)?;
                let children = tree.children(paragraph).to_vec();
                tree.append_all(target, children)?;
                tree.remove(paragraph)?;
            }
        }
        Ok(())
    }

    /// Block a plain line continues: a previous paragraph or quote, or the
    /// last item of a previous list. Targets without text are skipped.
    fn merge_target(&self, tree: &Tree, paragraph: NodeKey) -> Option<NodeKey> {
        let previous = tree.previous_sibling(paragraph)?;
        let target = match tree.node_type(previous)? {
            NodeType::Paragraph | NodeType::Quote => previous,
            NodeType::List => {
                let last = tree.last_descendant(previous)?;
                tree.find_ancestor(last, NodeType::ListItem)?
            }
            _ => return None,
        };
        (tree.text_content_size(target) > 0).then_some(target)
    }

    /// Resolve the outermost format pair in `node`, then recurse into the
    /// matched part and the parts around it
    fn import_text_formats(&self, tree: &mut Tree, node: NodeKey) -> Result<()> {
        let Some(text) = tree.text(node).map(str::to_string) else {
            return Ok(());
        };
        let Some(found) = self.tag_index.find_outermost_pair(&text) else {
            return self.import_text_matches(tree, node);
        };

        let (leading, current, remainder) = if found.start == 0 && found.end == text.len() {
            (None, node, None)
        } else if found.start == 0 {
            let parts = tree.split_text(node, &[found.end])?;
            (None, parts[0], parts.get(1).copied())
        } else {
            let parts = tree.split_text(node, &[found.start, found.end])?;
            (Some(parts[0]), parts[1], parts.get(2).copied())
        };

        tree.set_text(current, &text[found.content.clone()])?;
        if let Some(transformer) = self.tag_index.transformer(found.tag) {
            let format = tree.format(current) | transformer.format_mask();
            tree.set_format(current, format)?;
        }

        if !tree.has_format(current, TextFormat::CODE) {
            self.import_text_formats(tree, current)?;
        }
        if let Some(leading) = leading {
            self.import_text_formats(tree, leading)?;
        }
        if let Some(remainder) = remainder {
            self.import_text_formats(tree, remainder)?;
        }
        Ok(())
    }

    /// Replace text-match spans left to right. The leading part of a split
    /// is handled recursively, the trailing part by the loop.
    fn import_text_matches(&self, tree: &mut Tree, node: NodeKey) -> Result<()> {
        let mut current = Some(node);
        'outer: while let Some(node) = current {
            let Some(text) = tree.text(node).map(str::to_string) else {
                return Ok(());
            };
            for transformer in &self.by_type.text_match {
                let Some(captures) = transformer.import_pattern.captures(&text) else {
                    continue;
                };
                let m = Match::from_captures(&captures);
                if m.is_empty() {
                    continue;
                }
                let (replace_node, rest) = self.isolate(tree, node, &m, transformer)?;
                current = rest;
                (transformer.replace)(tree, replace_node, &m)?;
                continue 'outer;
            }
            break;
        }
        Ok(())
    }

    /// Split `node` so the match sits in its own node
    fn isolate(
        &self,
        tree: &mut Tree,
        node: NodeKey,
        m: &Match,
        transformer: &TextMatchTransformer,
    ) -> Result<(NodeKey, Option<NodeKey>)> {
        tracing::trace!(
            transformer = %transformer.name,
            start = m.start_index,
            "text match imported"
        );
        if m.start_index == 0 {
            let parts = tree.split_text(node, &[m.end_index()])?;
            return Ok((parts[0], parts.get(1).copied()));
        }
        let parts = tree.split_text(node, &[m.start_index, m.end_index()])?;
        self.import_text_matches(tree, parts[0])?;
        Ok((parts[1], parts.get(2).copied()))
    }
}
