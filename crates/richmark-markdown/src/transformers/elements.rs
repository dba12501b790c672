// SPDX-License-Identifier: AGPL-3.0-or-later
//! Block-level transformers: headings, quotes, code fences and lists

use crate::transformer::{ElementTransformer, Interior, Match, Transformer};
use once_cell::sync::Lazy;
use regex::Regex;
use richmark_core::{ElementKind, ListKind, NodeKey, NodeType, Result, Tree};

/// Spaces per nesting level of a list
const LIST_INDENT_SIZE: usize = 4;

static CODE_CLOSE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[ \t]*```[ \t]*$").unwrap());

pub static HEADING: Lazy<Transformer> = Lazy::new(|| {
    Transformer::Element(ElementTransformer {
        name: "heading".into(),
        dependencies: vec![NodeType::Heading],
        pattern: Regex::new(r"^(#{1,6})\s").unwrap(),
        replace: heading_replace,
        export: heading_export,
        line_span: None,
        close_pattern: None,
        interior: Interior::Verbatim,
    })
});

pub static QUOTE: Lazy<Transformer> = Lazy::new(|| {
    Transformer::Element(ElementTransformer {
        name: "quote".into(),
        dependencies: vec![NodeType::Quote],
        pattern: Regex::new(r"^>\s").unwrap(),
        replace: quote_replace,
        export: quote_export,
        line_span: None,
        close_pattern: None,
        interior: Interior::Verbatim,
    })
});

pub static CODE: Lazy<Transformer> = Lazy::new(|| {
    Transformer::Element(ElementTransformer {
        name: "code".into(),
        dependencies: vec![NodeType::Code],
        pattern: Regex::new(r"^```(\w{1,10})?\s?$").unwrap(),
        replace: code_replace,
        export: code_export,
        line_span: Some(code_line_span),
        close_pattern: Some(CODE_CLOSE.clone()),
        interior: Interior::Verbatim,
    })
});

pub static UNORDERED_LIST: Lazy<Transformer> = Lazy::new(|| {
    Transformer::Element(ElementTransformer {
        name: "unordered_list".into(),
        dependencies: vec![NodeType::List, NodeType::ListItem],
        pattern: Regex::new(r"^(\s*)[-*+]\s").unwrap(),
        replace: unordered_list_replace,
        export: list_export,
        line_span: None,
        close_pattern: None,
        interior: Interior::Verbatim,
    })
});

pub static ORDERED_LIST: Lazy<Transformer> = Lazy::new(|| {
    Transformer::Element(ElementTransformer {
        name: "ordered_list".into(),
        dependencies: vec![NodeType::List, NodeType::ListItem],
        pattern: Regex::new(r"^(\s*)(\d{1,})\.\s").unwrap(),
        replace: ordered_list_replace,
        export: list_export,
        line_span: None,
        close_pattern: None,
        interior: Interior::Verbatim,
    })
});

/// Task list items; not part of the default set
pub static CHECK_LIST: Lazy<Transformer> = Lazy::new(|| {
    Transformer::Element(ElementTransformer {
        name: "check_list".into(),
        dependencies: vec![NodeType::List, NodeType::ListItem],
        pattern: Regex::new(r"(?i)^(\s*)(?:-\s)?\s?(\[(\s|x)?\])\s").unwrap(),
        replace: check_list_replace,
        export: list_export,
        line_span: None,
        close_pattern: None,
        interior: Interior::Verbatim,
    })
});

/// Move `children` into `block` and put `block` where `parent` was
fn replace_with_block(
    tree: &mut Tree,
    parent: NodeKey,
    children: Vec<NodeKey>,
    block: NodeKey,
    is_import: bool,
) -> Result<()> {
    tree.append_all(block, children)?;
    tree.replace(parent, block)?;
    if !is_import {
        tree.select_start(block)?;
    }
    Ok(())
}

fn heading_replace(
    tree: &mut Tree,
    parent: NodeKey,
    children: Vec<NodeKey>,
    m: &Match,
    is_import: bool,
) -> Result<()> {
    let level = m.group(1).map_or(1, str::len).clamp(1, 6) as u8;
    let heading = tree.create_element(ElementKind::Heading { level });
    replace_with_block(tree, parent, children, heading, is_import)
}

fn heading_export(
    tree: &Tree,
    node: NodeKey,
    export_children: &dyn Fn(NodeKey) -> String,
) -> Option<String> {
    let ElementKind::Heading { level } = tree.element_kind(node)? else {
        return None;
    };
    Some(format!("{} {}", "#".repeat(usize::from(*level)), export_children(node)))
}

fn quote_replace(
    tree: &mut Tree,
    parent: NodeKey,
    children: Vec<NodeKey>,
    _m: &Match,
    is_import: bool,
) -> Result<()> {
    if is_import {
        let previous = tree
            .previous_sibling(parent)
            .filter(|&p| tree.node_type(p) == Some(NodeType::Quote));
        if let Some(previous) = previous {
            let line_break = tree.create_line_break();
            tree.append(previous, line_break)?;
            tree.append_all(previous, children)?;
            return tree.remove(parent);
        }
    }
    let quote = tree.create_element(ElementKind::Quote);
    replace_with_block(tree, parent, children, quote, is_import)
}

fn quote_export(
    tree: &Tree,
    node: NodeKey,
    export_children: &dyn Fn(NodeKey) -> String,
) -> Option<String> {
    if tree.node_type(node)? != NodeType::Quote {
        return None;
    }
    let lines: Vec<String> = export_children(node)
        .split('\n')
        .map(|line| format!("> {line}"))
        .collect();
    Some(lines.join("\n"))
}

fn code_replace(
    tree: &mut Tree,
    parent: NodeKey,
    children: Vec<NodeKey>,
    m: &Match,
    is_import: bool,
) -> Result<()> {
    let language = m.group(1).map(str::to_string);
    let code = tree.create_element(ElementKind::Code { language });
    replace_with_block(tree, parent, children, code, is_import)
}

fn code_export(
    tree: &Tree,
    node: NodeKey,
    _export_children: &dyn Fn(NodeKey) -> String,
) -> Option<String> {
    let ElementKind::Code { language } = tree.element_kind(node)? else {
        return None;
    };
    let text = tree.text_content(node);
    let body = if text.is_empty() { String::new() } else { format!("\n{text}") };
    Some(format!("```{}{body}\n```", language.as_deref().unwrap_or("")))
}

/// Lines up to the closing fence, or the rest of the input when unclosed
fn code_line_span(lines: &[&str], start: usize) -> usize {
    let rest = lines.get(start + 1..).unwrap_or(&[]);
    rest.iter()
        .position(|line| CODE_CLOSE.is_match(line))
        .unwrap_or(rest.len())
}

fn unordered_list_replace(
    tree: &mut Tree,
    parent: NodeKey,
    children: Vec<NodeKey>,
    m: &Match,
    is_import: bool,
) -> Result<()> {
    list_replace(ListKind::Bullet, tree, parent, children, m, is_import)
}

fn ordered_list_replace(
    tree: &mut Tree,
    parent: NodeKey,
    children: Vec<NodeKey>,
    m: &Match,
    is_import: bool,
) -> Result<()> {
    list_replace(ListKind::Ordered, tree, parent, children, m, is_import)
}

fn check_list_replace(
    tree: &mut Tree,
    parent: NodeKey,
    children: Vec<NodeKey>,
    m: &Match,
    is_import: bool,
) -> Result<()> {
    list_replace(ListKind::Task, tree, parent, children, m, is_import)
}

fn list_kind(tree: &Tree, key: NodeKey) -> Option<ListKind> {
    match tree.element_kind(key)? {
        ElementKind::List { kind, .. } => Some(*kind),
        _ => None,
    }
}

/// Join the next list of the same kind, else the previous one, else start a
/// new list in place of `parent`
fn list_replace(
    kind: ListKind,
    tree: &mut Tree,
    parent: NodeKey,
    children: Vec<NodeKey>,
    m: &Match,
    is_import: bool,
) -> Result<()> {
    let checked = (kind == ListKind::Task)
        .then(|| m.group(3).is_some_and(|c| c.eq_ignore_ascii_case("x")));
    let item = tree.create_element(ElementKind::ListItem { checked });
    tree.append_all(item, children)?;

    let next = tree.next_sibling(parent).filter(|&n| list_kind(tree, n) == Some(kind));
    let previous = tree.previous_sibling(parent).filter(|&p| list_kind(tree, p) == Some(kind));
    if let Some(next) = next {
        tree.insert_child(next, 0, item)?;
        tree.remove(parent)?;
    } else if let Some(previous) = previous {
        tree.append(previous, item)?;
        tree.remove(parent)?;
    } else {
        let start = match kind {
            ListKind::Ordered => m.group(2).and_then(|n| n.parse().ok()).unwrap_or(1),
            _ => 1,
        };
        let list = tree.create_element(ElementKind::List { kind, start });
        tree.append(list, item)?;
        tree.replace(parent, list)?;
    }

    if !is_import {
        tree.select_start(item)?;
    }
    for _ in 0..list_indent(m.group(1).unwrap_or("")) {
        indent_list_item(tree, item)?;
    }
    Ok(())
}

/// Nesting depth from leading whitespace: one level per tab or per four spaces
fn list_indent(whitespace: &str) -> usize {
    let tabs = whitespace.matches('\t').count();
    let spaces = whitespace.matches(' ').count();
    tabs + spaces / LIST_INDENT_SIZE
}

/// Inner list of a wrapper item, i.e. an item whose first child is a list
fn nested_list(tree: &Tree, item: Option<NodeKey>) -> Option<NodeKey> {
    let item = item?;
    if tree.node_type(item)? != NodeType::ListItem {
        return None;
    }
    tree.first_child(item).filter(|&c| tree.node_type(c) == Some(NodeType::List))
}

/// Push `item` one level deeper, reusing adjacent wrapper items
fn indent_list_item(tree: &mut Tree, item: NodeKey) -> Result<()> {
    let Some(parent) = tree.parent(item) else {
        return Ok(());
    };
    let previous = tree.previous_sibling(item);
    let next = tree.next_sibling(item);

    match (nested_list(tree, previous), nested_list(tree, next)) {
        (Some(inner), Some(next_inner)) => {
            tree.append(inner, item)?;
            let moved = tree.children(next_inner).to_vec();
            tree.append_all(inner, moved)?;
            if let Some(next) = next {
                tree.remove(next)?;
            }
        }
        (Some(inner), None) => tree.append(inner, item)?,
        (None, Some(next_inner)) => tree.insert_child(next_inner, 0, item)?,
        (None, None) => {
            let Some(kind) = list_kind(tree, parent) else {
                return Ok(());
            };
            let wrapper = tree.create_element(ElementKind::ListItem { checked: None });
            let list = tree.create_element(ElementKind::List { kind, start: 1 });
            tree.append(wrapper, list)?;
            match (previous, next) {
                (Some(previous), _) => tree.insert_after(previous, wrapper)?,
                (None, Some(next)) => tree.insert_before(next, wrapper)?,
                (None, None) => tree.append(parent, wrapper)?,
            }
            tree.append(list, item)?;
        }
    }
    Ok(())
}

fn list_export(
    tree: &Tree,
    node: NodeKey,
    export_children: &dyn Fn(NodeKey) -> String,
) -> Option<String> {
    list_kind(tree, node)?;
    Some(export_list(tree, node, export_children, 0))
}

fn export_list(
    tree: &Tree,
    list: NodeKey,
    export_children: &dyn Fn(NodeKey) -> String,
    depth: usize,
) -> String {
    let Some(ElementKind::List { kind, start }) = tree.element_kind(list) else {
        return String::new();
    };
    let mut output = Vec::new();
    let mut index = 0;
    for &item in tree.children(list) {
        let Some(ElementKind::ListItem { checked }) = tree.element_kind(item) else {
            continue;
        };
        if tree.children_len(item) == 1 {
            if let Some(inner) = nested_list(tree, Some(item)) {
                output.push(export_list(tree, inner, export_children, depth + 1));
                continue;
            }
        }
        let indent = " ".repeat(depth * LIST_INDENT_SIZE);
        let prefix = match kind {
            ListKind::Ordered => format!("{}. ", start.saturating_add(index)),
            ListKind::Task => format!("- [{}] ", if *checked == Some(true) { "x" } else { " " }),
            ListKind::Bullet => "- ".to_string(),
        };
        output.push(format!("{indent}{prefix}{}", export_children(item)));
        index += 1;
    }
    output.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_line_span_finds_close_fence() {
        let lines = ["```js", "", "let a;", "", "```", "after"];
        assert_eq!(code_line_span(&lines, 0), 3);
    }

    #[test]
    fn test_code_line_span_unclosed_takes_rest() {
        let lines = ["```", "a", "b"];
        assert_eq!(code_line_span(&lines, 0), 2);
        assert_eq!(code_line_span(&["```"], 0), 0);
    }

    #[test]
    fn test_list_indent() {
        assert_eq!(list_indent(""), 0);
        assert_eq!(list_indent("   "), 0);
        assert_eq!(list_indent("    "), 1);
        assert_eq!(list_indent("\t  "), 1);
        assert_eq!(list_indent("\t    "), 2);
    }

    #[test]
    fn test_check_list_pattern() {
        let Transformer::Element(check) = &*CHECK_LIST else {
            panic!("Expected element transformer");
        };
        let captures = check.pattern.captures("- [X] done").unwrap();
        assert_eq!(captures.get(3).map(|g| g.as_str()), Some("X"));
        assert!(check.pattern.is_match("[ ] todo"));
        assert!(!check.pattern.is_match("- todo"));
    }

    #[test]
    fn test_heading_export_requires_heading() {
        let mut tree = Tree::new();
        let paragraph = tree.create_paragraph();
        assert_eq!(heading_export(&tree, paragraph, &|_| String::new()), None);

        let heading = tree.create_element(ElementKind::Heading { level: 3 });
        assert_eq!(
            heading_export(&tree, heading, &|_| "Title".to_string()),
            Some("### Title".to_string())
        );
    }
}
