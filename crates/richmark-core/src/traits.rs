// SPDX-License-Identifier: AGPL-3.0-or-later
//! Error type and the parser/renderer traits for tree formats

use crate::node::{NodeKey, NodeType};
use crate::tree::Tree;

/// Error type for tree mutation, transformation and registration
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Node {0} does not exist")]
    NodeNotFound(NodeKey),

    #[error("Node {0} is not a text node")]
    NotText(NodeKey),

    #[error("Node {0} is not an element node")]
    NotElement(NodeKey),

    #[error("Offset {offset} is not a valid position in node {key} (length {len})")]
    InvalidOffset { key: NodeKey, offset: usize, len: usize },

    #[error("Missing node {node} for transformer {transformer}; register it with the editor")]
    MissingNode { node: NodeType, transformer: String },

    #[error("Invalid transformer pattern: {0}")]
    InvalidPattern(String),

    #[error("No selection in the tree")]
    NoSelection,
}

pub type Result<T> = std::result::Result<T, Error>;

/// Parser trait: populate a tree from source text
pub trait Parser {
    /// Replace the children of `root` with the parsed content
    fn parse_into(&self, input: &str, tree: &mut Tree, root: NodeKey) -> Result<()>;

    /// Parse into a fresh tree
    fn parse(&self, input: &str) -> Result<Tree> {
        let mut tree = Tree::new();
        let root = tree.root();
        self.parse_into(input, &mut tree, root)?;
        Ok(tree)
    }
}

/// Renderer trait: serialize a subtree to text
pub trait Renderer {
    fn render(&self, tree: &Tree, root: NodeKey) -> Result<String>;
}
