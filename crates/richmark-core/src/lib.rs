// SPDX-License-Identifier: AGPL-3.0-or-later
//! Richmark Core - Rich-text node tree and editor host
//!
//! This crate provides:
//! - An arena-backed tree of element, text, line break and decorator nodes
//! - Range selection with caret placement, typing and range formatting
//! - An editor host that runs updates and notifies update listeners
//! - Parser and renderer traits for text formats

pub mod editor;
pub mod node;
pub mod selection;
pub mod snapshot;
pub mod traits;
pub mod tree;

pub use editor::{
    Editor, EditorConfig, ListenerId, UpdateListener, UpdatePayload, TAG_COLLABORATION,
    TAG_HISTORIC,
};
pub use node::{
    ElementKind, ListKind, Node, NodeKey, NodeKind, NodeType, TextData, TextFormat, TextMode,
};
pub use selection::{Point, PointKind, RangeSelection};
pub use snapshot::NodeSnapshot;
pub use traits::{Error, Parser, Renderer, Result};
pub use tree::Tree;
