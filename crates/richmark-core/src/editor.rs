// SPDX-License-Identifier: AGPL-3.0-or-later
//! Editor host: owns the tree, runs updates and notifies listeners
//!
//! Listeners run synchronously after each update, in registration order,
//! and may mutate the tree. Those follow-up mutations are not re-announced.
//! A listener error aborts the remaining listeners and is returned from
//! [`Editor::update`].

use crate::node::{NodeKey, NodeType};
use crate::traits::Result;
use crate::tree::Tree;
use std::collections::HashSet;

/// Update tag set when replaying undo/redo history
pub const TAG_HISTORIC: &str = "historic";
/// Update tag set when applying changes from a collaborator
pub const TAG_COLLABORATION: &str = "collaboration";

/// What changed in one update
#[derive(Debug, Clone, Default)]
pub struct UpdatePayload {
    pub tags: HashSet<String>,
    /// Text leaves created or modified by the update
    pub dirty_leaves: HashSet<NodeKey>,
    /// IME composition in progress
    pub composing: bool,
}

impl UpdatePayload {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }
}

pub type UpdateListener = dyn FnMut(&mut Tree, &UpdatePayload) -> Result<()>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Configuration for the editor host
#[derive(Debug, Clone, Default)]
pub struct EditorConfig {
    /// Node types beyond the built-in ones (root, paragraph, text, line break, decorator)
    pub nodes: Vec<NodeType>,
}

pub struct Editor {
    tree: Tree,
    nodes: HashSet<NodeType>,
    composing: bool,
    listeners: Vec<(ListenerId, Box<UpdateListener>)>,
    next_listener: u64,
}

impl Editor {
    pub fn new(config: EditorConfig) -> Self {
        let mut nodes: HashSet<NodeType> = NodeType::BUILTIN.into_iter().collect();
        nodes.extend(config.nodes);
        Self {
            tree: Tree::new(),
            nodes,
            composing: false,
            listeners: Vec::new(),
            next_listener: 0,
        }
    }

    /// Editor with every node type registered
    pub fn with_all_nodes() -> Self {
        Self::new(EditorConfig {
            nodes: vec![
                NodeType::Heading,
                NodeType::Quote,
                NodeType::Code,
                NodeType::List,
                NodeType::ListItem,
                NodeType::Link,
            ],
        })
    }

    pub fn has_node(&self, node: NodeType) -> bool {
        self.nodes.contains(&node)
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn is_composing(&self) -> bool {
        self.composing
    }

    pub fn set_composing(&mut self, composing: bool) {
        self.composing = composing;
    }

    pub fn register_update_listener(&mut self, listener: Box<UpdateListener>) -> ListenerId {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.push((id, listener));
        tracing::debug!(listener = id.0, "update listener registered");
        id
    }

    /// Returns false when the listener was already removed
    pub fn remove_update_listener(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(existing, _)| *existing != id);
        before != self.listeners.len()
    }

    /// Run `f` against the tree, then notify listeners of the change
    pub fn update<F>(&mut self, tags: &[&str], f: F) -> Result<()>
    where
        F: FnOnce(&mut Tree) -> Result<()>,
    {
        self.tree.take_dirty();
        f(&mut self.tree)?;

        let payload = UpdatePayload {
            tags: tags.iter().map(|t| t.to_string()).collect(),
            dirty_leaves: self.tree.take_dirty(),
            composing: self.composing,
        };

        let mut listeners = std::mem::take(&mut self.listeners);
        let mut result = Ok(());
        for (_, listener) in listeners.iter_mut() {
            result = listener(&mut self.tree, &payload);
            if result.is_err() {
                break;
            }
        }
        listeners.append(&mut self.listeners);
        self.listeners = listeners;
        self.tree.take_dirty();
        result
    }

    /// Type text at the caret, one update per character
    pub fn type_text(&mut self, text: &str) -> Result<()> {
        for ch in text.chars() {
            let typed = ch.to_string();
            self.update(&[], |tree| tree.insert_text(&typed))?;
        }
        Ok(())
    }
}

impl Default for Editor {
    fn default() -> Self {
        Self::new(EditorConfig::default())
    }
}

impl std::fmt::Debug for Editor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Editor")
            .field("tree", &self.tree)
            .field("nodes", &self.nodes)
            .field("composing", &self.composing)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
