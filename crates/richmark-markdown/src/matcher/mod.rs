// SPDX-License-Identifier: AGPL-3.0-or-later
//! Tag matcher for text-format transformers
//!
//! [`TagIndex`] answers two questions about a string:
//! - where is the first outermost, non-nested `tag content tag` pair
//! - where is the last usable open tag before a given offset
//!
//! The escape and delimiter-run rules live in a backend. Two backends exist,
//! one compiled to `regex` patterns and one scanning characters, and they
//! accept exactly the same inputs. Which one runs is chosen by
//! [`MatcherBackend`].
//!
//! Rules shared by both backends:
//! - a tag preceded by `\` is escaped and never opens or closes a pair
//! - content is non-empty, stays on one line, and neither starts nor ends with
//!   whitespace or a tag character; it also cannot end with `\`
//! - the close tag must not be followed by a tag character
//! - the open tag must not be preceded by a tag character, so `**` never
//!   matches inside `***`
//! - tags with `intraword == false` need whitespace, punctuation or a line
//!   edge on both outer sides

mod pattern;
mod scan;

use crate::config::MatcherBackend;
use crate::error::{MarkdownError, Result};
use crate::transformer::{is_punctuation_or_space, TextFormatTransformer};
use std::fmt;
use std::ops::Range;

pub use pattern::RegexMatcher;
pub use scan::ScanMatcher;

/// Primitive searches a backend provides. Tag indexes refer to the order of
/// the transformers the backend was built from.
pub trait TagBackend: fmt::Debug {
    /// Unescaped open-tag candidates as `(offset, tag index)`, left to right,
    /// non-overlapping. At each offset the first tag in order wins.
    fn open_tags(&self, text: &str) -> Vec<(usize, usize)>;

    /// End of the closing tag of a pair opened by tag `tag` at `pos`
    fn pair_end(&self, text: &str, pos: usize, tag: usize) -> Option<usize>;

    /// Rightmost start `s` of tag `tag` with `s + tag.len() <= max_index`,
    /// not escaped and not followed by a space. Occurrences may overlap.
    fn open_tag_before(&self, text: &str, max_index: usize, tag: usize) -> Option<usize>;
}

/// Outermost pair found by [`TagIndex::find_outermost_pair`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatMatch {
    /// Offset of the open tag
    pub start: usize,
    /// Offset just past the close tag
    pub end: usize,
    /// Index of the matching transformer
    pub tag: usize,
    pub content: Range<usize>,
}

pub struct TagIndex {
    transformers: Vec<TextFormatTransformer>,
    backend: Box<dyn TagBackend>,
}

impl TagIndex {
    pub fn new(transformers: &[TextFormatTransformer], backend: MatcherBackend) -> Result<Self> {
        if let Some(position) = transformers.iter().position(|t| t.tag.is_empty()) {
            return Err(MarkdownError::EmptyTag(position));
        }
        let backend: Box<dyn TagBackend> = match backend {
            MatcherBackend::Regex => Box::new(RegexMatcher::new(transformers)?),
            MatcherBackend::Scanner => Box::new(ScanMatcher::new(transformers)),
        };
        tracing::trace!(tags = transformers.len(), ?backend, "tag index built");
        Ok(Self {
            transformers: transformers.to_vec(),
            backend,
        })
    }

    pub fn transformers(&self) -> &[TextFormatTransformer] {
        &self.transformers
    }

    pub fn transformer(&self, tag: usize) -> Option<&TextFormatTransformer> {
        self.transformers.get(tag)
    }

    pub fn is_empty(&self) -> bool {
        self.transformers.is_empty()
    }

    /// First outermost pair in `text`, scanning open tags left to right.
    /// Nested formats are found by calling again on the content.
    pub fn find_outermost_pair(&self, text: &str) -> Option<FormatMatch> {
        for (pos, tag) in self.backend.open_tags(text) {
            let transformer = &self.transformers[tag];
            let before = text[..pos].chars().next_back();
            if before.is_some_and(|c| transformer.is_delimiter(c)) {
                continue;
            }
            let Some(end) = self.backend.pair_end(text, pos, tag) else {
                continue;
            };
            if !transformer.intraword {
                let after = text[end..].chars().next();
                if !is_punctuation_or_space(before) || !is_punctuation_or_space(after) {
                    continue;
                }
            }
            let len = transformer.tag.len();
            return Some(FormatMatch {
                start: pos,
                end,
                tag,
                content: pos + len..end - len,
            });
        }
        None
    }

    /// Start of the last open tag for transformer `tag` ending at or before
    /// `max_index`
    pub fn find_open_tag_before(&self, text: &str, max_index: usize, tag: usize) -> Option<usize> {
        let len = self.transformers.get(tag)?.tag.len();
        if max_index < len || max_index > text.len() {
            return None;
        }
        self.backend.open_tag_before(text, max_index, tag)
    }
}

impl fmt::Debug for TagIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TagIndex")
            .field("tags", &self.transformers.iter().map(|t| t.tag.as_str()).collect::<Vec<_>>())
            .field("backend", &self.backend)
            .finish()
    }
}

/// Whether the byte offset `pos` is directly preceded by a backslash
pub(crate) fn is_escaped(text: &str, pos: usize) -> bool {
    text[..pos].ends_with('\\')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transformers::TEXT_FORMAT_TRANSFORMERS;
    use crate::Transformer;
    use pretty_assertions::assert_eq;

    fn default_formats() -> Vec<TextFormatTransformer> {
        TEXT_FORMAT_TRANSFORMERS
            .iter()
            .filter_map(|t| match t {
                Transformer::TextFormat(t) => Some(t.clone()),
                _ => None,
            })
            .collect()
    }

    fn both() -> [TagIndex; 2] {
        let formats = default_formats();
        [
            TagIndex::new(&formats, MatcherBackend::Regex).unwrap(),
            TagIndex::new(&formats, MatcherBackend::Scanner).unwrap(),
        ]
    }

    fn tag_of(index: &TagIndex, m: &FormatMatch) -> String {
        index.transformer(m.tag).unwrap().tag.clone()
    }

    #[test]
    fn test_triple_run_matches_longest_tag() {
        for index in both() {
            let m = index.find_outermost_pair("***x***").unwrap();
            assert_eq!(tag_of(&index, &m), "***");
            assert_eq!((m.start, m.end), (0, 7));
            assert_eq!(m.content, 3..4);
        }
    }

    #[test]
    fn test_space_padded_content_rejected() {
        for index in both() {
            assert_eq!(index.find_outermost_pair("** not bold **"), None);
        }
    }

    #[test]
    fn test_escaped_tags_rejected() {
        for index in both() {
            assert_eq!(index.find_outermost_pair(r"\*not emphasis\*"), None);
            assert_eq!(index.find_outermost_pair(r"a \**b**"), None);
        }
    }

    #[test]
    fn test_outermost_pair_with_nested_tags() {
        for index in both() {
            let m = index.find_outermost_pair("*a **b** c*").unwrap();
            assert_eq!(tag_of(&index, &m), "*");
            assert_eq!((m.start, m.end), (0, 11));
        }
    }

    #[test]
    fn test_later_candidate_after_failed_one() {
        for index in both() {
            let m = index.find_outermost_pair("*a **b**").unwrap();
            assert_eq!(tag_of(&index, &m), "**");
            assert_eq!((m.start, m.end), (3, 8));
        }
    }

    #[test]
    fn test_underscore_needs_word_boundary() {
        for index in both() {
            assert_eq!(index.find_outermost_pair("snake_case_name"), None);
            let m = index.find_outermost_pair("an _em_, ok").unwrap();
            assert_eq!(tag_of(&index, &m), "_");
            assert_eq!(m.content, 4..6);
        }
    }

    #[test]
    fn test_star_allowed_inside_words() {
        for index in both() {
            let m = index.find_outermost_pair("un*frigging*believable").unwrap();
            assert_eq!(tag_of(&index, &m), "*");
        }
    }

    #[test]
    fn test_close_followed_by_tag_char_rejected() {
        for index in both() {
            assert_eq!(index.find_outermost_pair("~~a~~~"), None);
        }
    }

    #[test]
    fn test_content_does_not_cross_lines() {
        for index in both() {
            assert_eq!(index.find_outermost_pair("*a\nb*"), None);
        }
    }

    #[test]
    fn test_multibyte_content() {
        for index in both() {
            let m = index.find_outermost_pair("é **ü** ß").unwrap();
            assert_eq!(m.start, 3);
            assert_eq!(m.content, 5..7);
        }
    }

    #[test]
    fn test_open_tag_before() {
        for index in both() {
            let bold = index.transformers().iter().position(|t| t.tag == "**").unwrap();
            assert_eq!(index.find_open_tag_before("**bold**", 6, bold), Some(0));
            assert_eq!(index.find_open_tag_before("** bold", 7, bold), None);
            assert_eq!(index.find_open_tag_before(r"\**bold", 7, bold), None);
            assert_eq!(index.find_open_tag_before("a**b**c", 7, bold), Some(4));
            assert_eq!(index.find_open_tag_before("a**b**c", 4, bold), Some(1));
            assert_eq!(index.find_open_tag_before("*", 1, bold), None);
        }
    }

    #[test]
    fn test_empty_tag_rejected() {
        let transformers = [TextFormatTransformer::new("", vec![])];
        let result = TagIndex::new(&transformers, MatcherBackend::Regex);
        assert!(matches!(result, Err(MarkdownError::EmptyTag(0))));
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use crate::transformers::TEXT_FORMAT_TRANSFORMERS;
    use crate::Transformer;
    use proptest::prelude::*;

    fn indexes() -> (TagIndex, TagIndex) {
        let formats: Vec<_> = TEXT_FORMAT_TRANSFORMERS
            .iter()
            .filter_map(|t| match t {
                Transformer::TextFormat(t) => Some(t.clone()),
                _ => None,
            })
            .collect();
        (
            TagIndex::new(&formats, MatcherBackend::Regex).unwrap(),
            TagIndex::new(&formats, MatcherBackend::Scanner).unwrap(),
        )
    }

    fn markup_strategy() -> impl Strategy<Value = String> {
        prop::collection::vec(
            prop_oneof![
                Just('*'),
                Just('_'),
                Just('`'),
                Just('~'),
                Just('='),
                Just(' '),
                Just('a'),
                Just('b'),
                Just('\\'),
                Just('.'),
                Just('\n'),
                Just('é'),
            ],
            0..24,
        )
        .prop_map(|chars| chars.into_iter().collect())
    }

    proptest! {
        // Property: both backends find the same outermost pair
        #[test]
        fn prop_backends_agree_on_pairs(text in markup_strategy()) {
            let (regex, scanner) = indexes();
            prop_assert_eq!(regex.find_outermost_pair(&text), scanner.find_outermost_pair(&text));
        }

        // Property: both backends find the same open tag before every boundary
        #[test]
        fn prop_backends_agree_on_open_tags(text in markup_strategy()) {
            let (regex, scanner) = indexes();
            for tag in 0..regex.transformers().len() {
                for max_index in (0..=text.len()).filter(|&i| text.is_char_boundary(i)) {
                    prop_assert_eq!(
                        regex.find_open_tag_before(&text, max_index, tag),
                        scanner.find_open_tag_before(&text, max_index, tag)
                    );
                }
            }
        }

        // Property: a found pair always wraps non-empty content in its own tag
        #[test]
        fn prop_pair_is_well_formed(text in markup_strategy()) {
            let (index, _) = indexes();
            if let Some(m) = index.find_outermost_pair(&text) {
                let tag = &index.transformer(m.tag).unwrap().tag;
                prop_assert!(m.content.start < m.content.end);
                prop_assert_eq!(&text[m.start..m.content.start], tag.as_str());
                prop_assert_eq!(&text[m.content.end..m.end], tag.as_str());
            }
        }
    }
}
