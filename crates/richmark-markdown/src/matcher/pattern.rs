// SPDX-License-Identifier: AGPL-3.0-or-later
//! Tag backend built from `regex` patterns
//!
//! The `regex` crate has no look-behind or look-ahead, so escapes are
//! matched as an optional leading `\` group and the "not followed by a tag
//! character" rule consumes the following character instead of peeking.

use super::{is_escaped, TagBackend};
use crate::error::Result;
use crate::transformer::TextFormatTransformer;
use regex::Regex;

#[derive(Debug, Clone)]
struct TagPatterns {
    /// The tag on its own
    tag: Regex,
    /// Pair anchored at the start of the haystack; group 1 is the content
    pair: Regex,
    len: usize,
}

#[derive(Debug, Clone)]
pub struct RegexMatcher {
    /// Group 1 is the escaping backslash, group `i + 2` is tag `i`
    open: Regex,
    tags: Vec<TagPatterns>,
}

impl RegexMatcher {
    pub fn new(transformers: &[TextFormatTransformer]) -> Result<Self> {
        let alternatives: Vec<String> = transformers
            .iter()
            .map(|t| format!("({})", regex::escape(&t.tag)))
            .collect();
        let open = Regex::new(&format!(r"(\\)?(?:{})", alternatives.join("|")))?;

        let tags = transformers
            .iter()
            .map(|t| -> Result<TagPatterns> {
                let tag = regex::escape(&t.tag);
                let delimiters: String = unique_chars(&t.tag)
                    .map(|c| regex::escape(&c.to_string()))
                    .collect();
                let content = format!(r"(?:[^{d}\s\\]|[^{d}\s].*?[^{d}\s\\])", d = delimiters);
                let pair = Regex::new(&format!(
                    r"^{tag}({content}){tag}(?:[^{d}]|$)",
                    d = delimiters
                ))?;
                Ok(TagPatterns {
                    tag: Regex::new(&tag)?,
                    pair,
                    len: t.tag.len(),
                })
            })
            .collect::<Result<_>>()?;

        Ok(Self { open, tags })
    }
}

fn unique_chars(tag: &str) -> impl Iterator<Item = char> + '_ {
    tag.char_indices()
        .filter(move |&(i, c)| !tag[..i].contains(c))
        .map(|(_, c)| c)
}

impl TagBackend for RegexMatcher {
    fn open_tags(&self, text: &str) -> Vec<(usize, usize)> {
        self.open
            .captures_iter(text)
            .filter(|captures| captures.get(1).is_none())
            .filter_map(|captures| {
                (0..self.tags.len()).find_map(|i| captures.get(i + 2).map(|m| (m.start(), i)))
            })
            .collect()
    }

    fn pair_end(&self, text: &str, pos: usize, tag: usize) -> Option<usize> {
        let patterns = self.tags.get(tag)?;
        let captures = patterns.pair.captures(&text[pos..])?;
        let content = captures.get(1)?;
        Some(pos + content.end() + patterns.len)
    }

    fn open_tag_before(&self, text: &str, max_index: usize, tag: usize) -> Option<usize> {
        let patterns = self.tags.get(tag)?;
        let mut found = None;
        let mut from = 0;
        while let Some(m) = patterns.tag.find_at(text, from) {
            if m.end() > max_index {
                break;
            }
            if !is_escaped(text, m.start()) && !text[m.end()..].starts_with(' ') {
                found = Some(m.start());
            }
            from = m.start() + text[m.start()..].chars().next().map_or(1, char::len_utf8);
        }
        found
    }
}
