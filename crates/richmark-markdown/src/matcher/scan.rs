// SPDX-License-Identifier: AGPL-3.0-or-later
//! Tag backend that walks characters directly

use super::{is_escaped, TagBackend};
use crate::transformer::TextFormatTransformer;

#[derive(Debug, Clone)]
pub struct ScanMatcher {
    tags: Vec<String>,
}

impl ScanMatcher {
    pub fn new(transformers: &[TextFormatTransformer]) -> Self {
        Self {
            tags: transformers.iter().map(|t| t.tag.clone()).collect(),
        }
    }

    fn tag_at(&self, text: &str, pos: usize) -> Option<usize> {
        self.tags.iter().position(|tag| text[pos..].starts_with(tag.as_str()))
    }
}

impl TagBackend for ScanMatcher {
    fn open_tags(&self, text: &str) -> Vec<(usize, usize)> {
        let mut found = Vec::new();
        let mut pos = 0;
        while pos < text.len() {
            if text[pos..].starts_with('\\') {
                if let Some(tag) = self.tag_at(text, pos + 1) {
                    pos += 1 + self.tags[tag].len();
                    continue;
                }
            }
            if let Some(tag) = self.tag_at(text, pos) {
                found.push((pos, tag));
                pos += self.tags[tag].len();
                continue;
            }
            pos += text[pos..].chars().next().map_or(1, char::len_utf8);
        }
        found
    }

    fn pair_end(&self, text: &str, pos: usize, tag: usize) -> Option<usize> {
        let tag_text = self.tags.get(tag)?.as_str();
        let is_delimiter = |c: char| tag_text.contains(c);
        let body_start = pos + tag_text.len();
        let body = text.get(body_start..)?;

        let first = body.chars().next()?;
        if is_delimiter(first) || first.is_whitespace() {
            return None;
        }

        for (k, c) in body.char_indices().skip(1) {
            if body[k..].starts_with(tag_text) {
                let last = body[..k].chars().next_back()?;
                let after = body[k + tag_text.len()..].chars().next();
                if !is_delimiter(last)
                    && !last.is_whitespace()
                    && last != '\\'
                    && !after.is_some_and(is_delimiter)
                {
                    return Some(body_start + k + tag_text.len());
                }
            }
            if c == '\n' {
                break;
            }
        }
        None
    }

    fn open_tag_before(&self, text: &str, max_index: usize, tag: usize) -> Option<usize> {
        let tag_text = self.tags.get(tag)?.as_str();
        let last_start = max_index.checked_sub(tag_text.len())?;
        (0..=last_start).rev().find(|&start| {
            text.is_char_boundary(start)
                && text[start..].starts_with(tag_text)
                && !is_escaped(text, start)
                && !text[start + tag_text.len()..].starts_with(' ')
        })
    }
}
