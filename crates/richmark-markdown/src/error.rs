// SPDX-License-Identifier: AGPL-3.0-or-later
//! Error type for the markdown engine

/// Errors raised while building matchers, importing or registering shortcuts
#[derive(Debug, thiserror::Error)]
pub enum MarkdownError {
    #[error(transparent)]
    Tree(#[from] richmark_core::Error),

    #[error("Invalid tag pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Text format transformer at position {0} has an empty tag")]
    EmptyTag(usize),
}

pub type Result<T> = std::result::Result<T, MarkdownError>;

impl From<MarkdownError> for richmark_core::Error {
    fn from(err: MarkdownError) -> Self {
        match err {
            MarkdownError::Tree(inner) => inner,
            other => richmark_core::Error::InvalidPattern(other.to_string()),
        }
    }
}
