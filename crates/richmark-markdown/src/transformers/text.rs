// SPDX-License-Identifier: AGPL-3.0-or-later
//! Inline transformers: paired format tags and links

use crate::transformer::{Match, TextFormatTransformer, TextMatchTransformer, Transformer};
use once_cell::sync::Lazy;
use regex::Regex;
use richmark_core::{ElementKind, NodeKey, NodeType, Result, TextFormat, Tree};

pub static INLINE_CODE: Lazy<Transformer> =
    Lazy::new(|| TextFormatTransformer::new("`", vec![TextFormat::CODE]).into());

pub static HIGHLIGHT: Lazy<Transformer> =
    Lazy::new(|| TextFormatTransformer::new("==", vec![TextFormat::HIGHLIGHT]).into());

pub static BOLD_ITALIC_STAR: Lazy<Transformer> =
    Lazy::new(|| {
        TextFormatTransformer::new("***", vec![TextFormat::BOLD, TextFormat::ITALIC]).into()
    });

pub static BOLD_ITALIC_UNDERSCORE: Lazy<Transformer> = Lazy::new(|| {
    TextFormatTransformer::new("___", vec![TextFormat::BOLD, TextFormat::ITALIC])
        .word_bounded()
        .into()
});

pub static BOLD_STAR: Lazy<Transformer> =
    Lazy::new(|| TextFormatTransformer::new("**", vec![TextFormat::BOLD]).into());

pub static BOLD_UNDERSCORE: Lazy<Transformer> =
    Lazy::new(|| TextFormatTransformer::new("__", vec![TextFormat::BOLD]).word_bounded().into());

pub static STRIKETHROUGH: Lazy<Transformer> =
    Lazy::new(|| TextFormatTransformer::new("~~", vec![TextFormat::STRIKETHROUGH]).into());

pub static ITALIC_STAR: Lazy<Transformer> =
    Lazy::new(|| TextFormatTransformer::new("*", vec![TextFormat::ITALIC]).into());

pub static ITALIC_UNDERSCORE: Lazy<Transformer> =
    Lazy::new(|| TextFormatTransformer::new("_", vec![TextFormat::ITALIC]).word_bounded().into());

const LINK_PATTERN: &str = concat!(
    r#"(?:\[([^\[]+)\])"#,
    r#"(?:\((?:([^()\s]+)(?:\s"((?:[^"]*\\")*[^"]*)"\s*)?)\))"#,
);

pub static LINK: Lazy<Transformer> = Lazy::new(|| {
    TextMatchTransformer {
        name: "link".into(),
        dependencies: vec![NodeType::Link],
        import_pattern: Regex::new(LINK_PATTERN).unwrap(),
        match_pattern: Regex::new(&format!("{LINK_PATTERN}$")).unwrap(),
        trigger: ')',
        replace: link_replace,
        export: link_export,
    }
    .into()
});

/// Swap the matched text node for a link holding the link text. The text
/// keeps the matched node's formats.
fn link_replace(tree: &mut Tree, node: NodeKey, m: &Match) -> Result<()> {
    let url = m.group(2).unwrap_or_default().to_string();
    let title = m.group(3).map(str::to_string);
    let link = tree.create_element(ElementKind::Link { url, title });
    let text = tree.create_formatted_text(m.group(1).unwrap_or_default(), tree.format(node));
    tree.append(link, text)?;
    tree.replace(node, link)
}

fn link_export(
    tree: &Tree,
    node: NodeKey,
    _export_children: &dyn Fn(NodeKey) -> String,
    export_format: &dyn Fn(NodeKey, &str) -> String,
) -> Option<String> {
    let ElementKind::Link { url, title } = tree.element_kind(node)? else {
        return None;
    };
    let text = tree.text_content(node);
    let content = match title.as_deref().filter(|t| !t.is_empty()) {
        Some(title) => format!("[{text}]({url} \"{title}\")"),
        None => format!("[{text}]({url})"),
    };
    // Markdown cannot nest styles inside a link, so only a single text
    // child carries its formats onto the whole link
    match tree.first_child(node) {
        Some(child) if tree.children_len(node) == 1 && tree.is_text(child) => {
            Some(export_format(child, &content))
        }
        _ => Some(content),
    }
}
