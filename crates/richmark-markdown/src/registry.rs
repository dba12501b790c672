// SPDX-License-Identifier: AGPL-3.0-or-later
//! Partition of a transformer list by kind
//!
//! Order inside each bucket follows the input list; the first transformer of
//! a kind that matches wins.

use crate::transformer::{
    ElementTransformer, TextFormatTransformer, TextMatchTransformer, Transformer,
};

#[derive(Debug, Clone, Default)]
pub struct TransformersByType {
    pub element: Vec<ElementTransformer>,
    pub text_format: Vec<TextFormatTransformer>,
    pub text_match: Vec<TextMatchTransformer>,
}

impl TransformersByType {
    pub fn new(transformers: &[Transformer]) -> Self {
        transformers.iter().cloned().collect()
    }

    /// Element transformers that work on a single line
    pub fn single_line_elements(&self) -> impl Iterator<Item = &ElementTransformer> {
        self.element.iter().filter(|t| !t.is_multiline())
    }

    pub fn multiline_elements(&self) -> impl Iterator<Item = &ElementTransformer> {
        self.element.iter().filter(|t| t.is_multiline())
    }

    /// Text formats with exactly one format flag, the only ones used on export
    pub fn single_format(&self) -> Vec<&TextFormatTransformer> {
        self.text_format.iter().filter(|t| t.formats.len() == 1).collect()
    }
}

impl FromIterator<Transformer> for TransformersByType {
    fn from_iter<I: IntoIterator<Item = Transformer>>(iter: I) -> Self {
        let mut by_type = Self::default();
        for transformer in iter {
            match transformer {
                Transformer::Element(t) => by_type.element.push(t),
                Transformer::TextFormat(t) => by_type.text_format.push(t),
                Transformer::TextMatch(t) => by_type.text_match.push(t),
            }
        }
        by_type
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transformers::{BOLD_STAR, CODE, ELEMENT_TRANSFORMERS, HEADING, LINK, TRANSFORMERS};

    #[test]
    fn test_partition_keeps_order() {
        let by_type = TransformersByType::new(&TRANSFORMERS);

        let names: Vec<_> = by_type.element.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["heading", "quote", "code", "unordered_list", "ordered_list"]);
        assert_eq!(by_type.text_format[0].tag, "`");
        assert_eq!(by_type.text_format.len(), 9);
        assert_eq!(by_type.text_match.len(), 1);
    }

    #[test]
    fn test_additive_composition() {
        let mut list = vec![LINK.clone(), BOLD_STAR.clone()];
        list.extend(ELEMENT_TRANSFORMERS.iter().cloned());
        list.push(HEADING.clone());
        let by_type = TransformersByType::new(&list);

        assert_eq!(by_type.element.len(), 6);
        assert_eq!(by_type.element[5].name, "heading");
        assert_eq!(by_type.text_format.len(), 1);
    }

    #[test]
    fn test_multiline_split() {
        let by_type = TransformersByType::new(&[HEADING.clone(), CODE.clone()]);
        assert_eq!(by_type.multiline_elements().count(), 1);
        assert_eq!(by_type.single_line_elements().next().map(|t| t.name.as_str()), Some("heading"));
    }

    #[test]
    fn test_single_format_excludes_composites() {
        let by_type = TransformersByType::new(&TRANSFORMERS);
        let tags: Vec<_> = by_type.single_format().iter().map(|t| t.tag.as_str()).collect();
        assert_eq!(tags, vec!["`", "**", "__", "==", "*", "_", "~~"]);
    }
}
