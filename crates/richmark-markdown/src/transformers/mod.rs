// SPDX-License-Identifier: AGPL-3.0-or-later
//! Default transformers
//!
//! Order matters: within each kind the first matching transformer wins, so
//! `***` precedes `**` which precedes `*`, and [`CHECK_LIST`] must be listed
//! before [`UNORDERED_LIST`] when used.

mod elements;
mod text;

use crate::transformer::Transformer;
use once_cell::sync::Lazy;

pub use elements::{CHECK_LIST, CODE, HEADING, ORDERED_LIST, QUOTE, UNORDERED_LIST};
pub use text::{
    BOLD_ITALIC_STAR, BOLD_ITALIC_UNDERSCORE, BOLD_STAR, BOLD_UNDERSCORE, HIGHLIGHT, INLINE_CODE,
    ITALIC_STAR, ITALIC_UNDERSCORE, LINK, STRIKETHROUGH,
};

pub static ELEMENT_TRANSFORMERS: Lazy<Vec<Transformer>> = Lazy::new(|| {
    vec![
        HEADING.clone(),
        QUOTE.clone(),
        CODE.clone(),
        UNORDERED_LIST.clone(),
        ORDERED_LIST.clone(),
    ]
});

pub static TEXT_FORMAT_TRANSFORMERS: Lazy<Vec<Transformer>> = Lazy::new(|| {
    vec![
        INLINE_CODE.clone(),
        BOLD_ITALIC_STAR.clone(),
        BOLD_ITALIC_UNDERSCORE.clone(),
        BOLD_STAR.clone(),
        BOLD_UNDERSCORE.clone(),
        HIGHLIGHT.clone(),
        ITALIC_STAR.clone(),
        ITALIC_UNDERSCORE.clone(),
        STRIKETHROUGH.clone(),
    ]
});

pub static TEXT_MATCH_TRANSFORMERS: Lazy<Vec<Transformer>> = Lazy::new(|| vec![LINK.clone()]);

/// Every default transformer: elements, then text formats, then text matches
pub static TRANSFORMERS: Lazy<Vec<Transformer>> = Lazy::new(|| {
    ELEMENT_TRANSFORMERS
        .iter()
        .chain(TEXT_FORMAT_TRANSFORMERS.iter())
        .chain(TEXT_MATCH_TRANSFORMERS.iter())
        .cloned()
        .collect()
});
