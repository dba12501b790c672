// SPDX-License-Identifier: AGPL-3.0-or-later
//! Batch export: tree to markdown source
//!
//! Only text formats with a single format flag are used here. A run that is
//! bold and italic exports as nested `**` and `*`, which reads back the same
//! as `***`.

use crate::config::ExportConfig;
use crate::registry::TransformersByType;
use crate::transformer::{TextFormatTransformer, Transformer};
use richmark_core::{NodeKey, TextFormat, Tree};

/// Serialize the children of `root` (the tree root when `None`) as markdown
pub fn export_markdown(
    tree: &Tree,
    root: Option<NodeKey>,
    transformers: &[Transformer],
    config: &ExportConfig,
) -> String {
    let root = root.unwrap_or_else(|| tree.root());
    let by_type = TransformersByType::new(transformers);
    let exporter = Exporter {
        formats: by_type.single_format().into_iter().cloned().collect(),
        by_type: &by_type,
        tree,
    };

    let blocks: Vec<String> = tree
        .children(root)
        .iter()
        .filter_map(|&child| exporter.export_block(child))
        .collect();
    tracing::debug!(blocks = blocks.len(), "markdown exported");
    blocks.join(&config.block_separator)
}

struct Exporter<'a> {
    by_type: &'a TransformersByType,
    formats: Vec<TextFormatTransformer>,
    tree: &'a Tree,
}

impl Exporter<'_> {
    fn export_block(&self, node: NodeKey) -> Option<String> {
        let export_children = |key: NodeKey| self.export_children(key);
        for transformer in &self.by_type.element {
            if let Some(output) = (transformer.export)(self.tree, node, &export_children) {
                return Some(output);
            }
        }
        if self.tree.is_element(node) {
            Some(self.export_children(node))
        } else if self.tree.is_decorator(node) {
            Some(self.tree.text_content(node))
        } else {
            None
        }
    }

    fn export_children(&self, node: NodeKey) -> String {
        let tree = self.tree;
        let children = tree.children(node);
        let mut output = String::new();

        'children: for (i, &child) in children.iter().enumerate() {
            for transformer in &self.by_type.text_match {
                let result = (transformer.export)(
                    tree,
                    child,
                    &|key| self.export_children(key),
                    &|key, content| self.export_format(key, content),
                );
                if let Some(result) = result {
                    output.push_str(&result);
                    continue 'children;
                }
            }

            if tree.is_line_break(child) {
                output.push('\n');
            } else if let Some(text) = tree.text(child) {
                output.push_str(&self.export_format(child, text));
            } else if tree.is_element(child) {
                output.push_str(&self.export_children(child));
                if !tree.is_inline(child) && i + 1 < children.len() {
                    output.push('\n');
                }
            } else {
                output.push_str(&tree.text_content(child));
            }
        }
        output
    }

    /// Wrap `content` in the tags of `node`'s formats. Tags hug the trimmed
    /// content, and a tag shared with the adjacent run is left out at that
    /// seam.
    fn export_format(&self, node: NodeKey, content: &str) -> String {
        let trimmed = content.trim();
        if trimmed.is_empty() {
            return content.to_string();
        }

        let tree = self.tree;
        let previous = text_sibling(tree, node, true);
        let next = text_sibling(tree, node, false);
        let shares = |sibling: Option<NodeKey>, format: TextFormat| {
            sibling.is_some_and(|s| tree.has_format(s, format))
        };

        let mut output = trimmed.to_string();
        let mut applied = TextFormat::empty();
        for transformer in &self.formats {
            let Some(&format) = transformer.formats.first() else {
                continue;
            };
            if !tree.has_format(node, format) || applied.contains(format) {
                continue;
            }
            applied |= format;
            if !shares(previous, format) {
                output.insert_str(0, &transformer.tag);
            }
            if !shares(next, format) {
                output.push_str(&transformer.tag);
            }
        }

        let leading = content.len() - content.trim_start().len();
        let trailing = content.len() - content.trim_end().len();
        format!("{}{output}{}", &content[..leading], &content[content.len() - trailing..])
    }
}

/// Adjacent text run, looking through inline elements in both directions
fn text_sibling(tree: &Tree, node: NodeKey, backward: bool) -> Option<NodeKey> {
    let step = |key: NodeKey| {
        if backward {
            tree.previous_sibling(key)
        } else {
            tree.next_sibling(key)
        }
    };

    let mut sibling = step(node);
    if sibling.is_none() {
        let parent = tree.parent(node)?;
        if tree.is_inline(parent) {
            sibling = step(parent);
        }
    }

    while let Some(current) = sibling {
        if tree.is_element(current) {
            if !tree.is_inline(current) {
                return None;
            }
            let descendant = if backward {
                tree.last_descendant(current)
            } else {
                tree.first_descendant(current)
            };
            match descendant.filter(|&d| tree.is_text(d)) {
                Some(text) => return Some(text),
                None => sibling = step(current),
            }
        } else if tree.is_text(current) {
            return Some(current);
        } else {
            return None;
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ImportConfig;
    use crate::import::import_markdown;
    use crate::test_support::{init_tracing, DEFAULTS};
    use crate::transformers::CHECK_LIST;
    use pretty_assertions::assert_eq;
    use richmark_core::ElementKind;

    fn round_trip(markdown: &str) -> String {
        init_tracing();
        let mut tree = Tree::new();
        import_markdown(markdown, &mut tree, None, &DEFAULTS, &ImportConfig::default()).unwrap();
        export_markdown(&tree, None, &DEFAULTS, &ExportConfig::default())
    }

    #[test]
    fn test_link_round_trip() {
        let source = r#"[text](http://x "title")"#;
        assert_eq!(round_trip(source), source);
    }

    #[test]
    fn test_formats_round_trip() {
        for source in [
            "**bold** and *italic*",
            "a ~~gone~~ b",
            "`code` and ==mark==",
            "***both***",
            "**bold [link](http://x) text**",
        ] {
            assert_eq!(round_trip(source), source);
        }
    }

    #[test]
    fn test_underscore_exports_as_star() {
        assert_eq!(round_trip("__bold__ _it_"), "**bold** *it*");
    }

    #[test]
    fn test_blocks_round_trip() {
        for source in [
            "# Title\n\nBody text",
            "> quoted\n> lines",
            "```rust\nfn main() {}\n```",
            "```\n```",
            "- a\n    - b\n- c",
            "7. seven\n8. eight",
            "foo\nbar",
        ] {
            assert_eq!(round_trip(source), source);
        }
    }

    #[test]
    fn test_check_list_export() {
        let mut transformers = vec![CHECK_LIST.clone()];
        transformers.extend(DEFAULTS.iter().cloned());
        let mut tree = Tree::new();
        let source = "- [x] done\n- [ ] todo";
        import_markdown(source, &mut tree, None, &transformers, &ImportConfig::default()).unwrap();
        assert_eq!(
            export_markdown(&tree, None, &transformers, &ExportConfig::default()),
            "- [x] done\n- [ ] todo"
        );
    }

    #[test]
    fn test_whitespace_stays_outside_tags() {
        let mut tree = Tree::new();
        let paragraph = tree.create_paragraph();
        let text = tree.create_formatted_text("  foo ", TextFormat::BOLD);
        tree.append(paragraph, text).unwrap();
        tree.append(tree.root(), paragraph).unwrap();

        assert_eq!(
            export_markdown(&tree, None, &DEFAULTS, &ExportConfig::default()),
            "  **foo** "
        );
    }

    #[test]
    fn test_adjacent_runs_share_tags() {
        let mut tree = Tree::new();
        let paragraph = tree.create_paragraph();
        let first = tree.create_formatted_text("a", TextFormat::BOLD);
        let second = tree.create_formatted_text("b", TextFormat::BOLD | TextFormat::ITALIC);
        tree.append_all(paragraph, [first, second]).unwrap();
        tree.append(tree.root(), paragraph).unwrap();

        assert_eq!(
            export_markdown(&tree, None, &DEFAULTS, &ExportConfig::default()),
            "**a*b***"
        );
    }

    #[test]
    fn test_link_text_format_wraps_link() {
        let mut tree = Tree::new();
        let paragraph = tree.create_paragraph();
        let link = tree.create_element(ElementKind::Link {
            url: "u".into(),
            title: None,
        });
        let text = tree.create_formatted_text("x", TextFormat::ITALIC);
        tree.append(link, text).unwrap();
        tree.append(paragraph, link).unwrap();
        tree.append(tree.root(), paragraph).unwrap();

        assert_eq!(
            export_markdown(&tree, None, &DEFAULTS, &ExportConfig::default()),
            "*[x](u)*"
        );
    }

    #[test]
    fn test_decorator_falls_back_to_text() {
        let mut tree = Tree::new();
        let decorator = tree.create_decorator("image", "alt text");
        tree.append(tree.root(), decorator).unwrap();
        let heading = tree.create_element(ElementKind::Heading { level: 2 });
        let text = tree.create_text("H");
        tree.append(heading, text).unwrap();
        tree.append(tree.root(), heading).unwrap();

        assert_eq!(
            export_markdown(&tree, None, &DEFAULTS, &ExportConfig::default()),
            "alt text\n\n## H"
        );
    }

    #[test]
    fn test_custom_block_separator() {
        let mut tree = Tree::new();
        import_markdown("a\n\nb", &mut tree, None, &DEFAULTS, &ImportConfig::default()).unwrap();
        let config = ExportConfig {
            block_separator: "\n".to_string(),
        };
        assert_eq!(export_markdown(&tree, None, &DEFAULTS, &config), "a\nb");
    }

    #[test]
    fn test_export_is_commonmark() {
        use comrak::nodes::NodeValue;
        use comrak::{parse_document, Arena, Options};

        let markdown = round_trip(r#"**b** *i* ~~s~~ [l](http://x "t")"#);
        let arena = Arena::new();
        let mut options = Options::default();
        options.extension.strikethrough = true;
        let root = parse_document(&arena, &markdown, &options);

        let mut seen = Vec::new();
        for node in root.descendants() {
            match &node.data.borrow().value {
                NodeValue::Strong => seen.push("strong".to_string()),
                NodeValue::Emph => seen.push("emph".to_string()),
                NodeValue::Strikethrough => seen.push("strike".to_string()),
                NodeValue::Link(link) => seen.push(format!("link {} {}", link.url, link.title)),
                _ => {}
            }
        }
        assert_eq!(seen, vec!["strong", "emph", "strike", "link http://x t"]);
    }
}
