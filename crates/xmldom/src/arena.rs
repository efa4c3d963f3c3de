//! Arena-based XML tree storage
//!
//! ## Memory Layout
//!
//! ```text
//! Arena: Vec<XmlNode>
//!        [Node0][Node1][Node2]...
//!         ↑ 4-byte index, not 8-byte pointer
//! ```
//!
//! Children are owned through their parent's `children` id list. The
//! `parent` field is a back-index, so there are no reference cycles.
//! Detached nodes keep their slot until the arena is dropped.

use std::ops::{Index, IndexMut};

use crate::error::{Result, XmlError};
use crate::types::{NodeId, XmlNode};

/// Arena allocator for element nodes
#[derive(Debug, Clone, Default)]
pub struct NodeArena {
    /// All nodes stored sequentially
    nodes: Vec<XmlNode>,
}

impl NodeArena {
    /// Create a new empty arena
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    /// Create arena with specific capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(capacity),
        }
    }

    /// Add a node to the arena, returns its ID
    pub fn add_node(&mut self, node: XmlNode) -> NodeId {
        let node_id = self.nodes.len() as NodeId;
        self.nodes.push(node);
        node_id
    }

    /// Get node by ID (immutable)
    pub fn get(&self, node_id: NodeId) -> Result<&XmlNode> {
        self.nodes
            .get(node_id as usize)
            .ok_or(XmlError::NodeNotFound(node_id))
    }

    /// Get node by ID (mutable)
    pub fn get_mut(&mut self, node_id: NodeId) -> Result<&mut XmlNode> {
        self.nodes
            .get_mut(node_id as usize)
            .ok_or(XmlError::NodeNotFound(node_id))
    }

    pub fn contains(&self, node_id: NodeId) -> bool {
        (node_id as usize) < self.nodes.len()
    }

    /// Total number of node slots, detached ones included
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if arena is empty
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Link `child` as the last child of `parent`
    ///
    /// The child must not currently have a parent; use [`NodeArena::move_node`]
    /// for nodes that are already attached somewhere.
    pub fn append_child(&mut self, parent_id: NodeId, child_id: NodeId) -> Result<()> {
        self.get(child_id)?;
        self.get_mut(parent_id)?.children.push(child_id);
        self.get_mut(child_id)?.parent = Some(parent_id);
        Ok(())
    }

    /// Unlink a node from its parent. A node without parent is left as is.
    pub fn detach(&mut self, node_id: NodeId) -> Result<()> {
        let parent_id = match self.get(node_id)?.parent {
            Some(parent_id) => parent_id,
            None => return Ok(()),
        };
        self.get_mut(parent_id)?.children.retain(|id| *id != node_id);
        self.get_mut(node_id)?.parent = None;
        Ok(())
    }

    /// Re-parent `node_id` under `new_parent`, appending it last
    pub fn move_node(&mut self, node_id: NodeId, new_parent: NodeId) -> Result<()> {
        self.get(node_id)?;
        self.get(new_parent)?;
        if self.is_ancestor_or_self(node_id, new_parent) {
            return Err(XmlError::InvalidHierarchy {
                node: node_id,
                parent: new_parent,
            });
        }
        self.detach(node_id)?;
        self.append_child(new_parent, node_id)
    }

    /// True when `ancestor` is `node_id` or appears on its parent chain
    pub fn is_ancestor_or_self(&self, ancestor: NodeId, node_id: NodeId) -> bool {
        let mut current = Some(node_id);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.get(id).ok().and_then(|node| node.parent);
        }
        false
    }

    /// Walk parent links up to the top of the tree containing `node_id`
    ///
    /// Expects an id allocated by this arena; an unknown id is its own top.
    pub fn top(&self, node_id: NodeId) -> NodeId {
        let mut current = node_id;
        while let Some(parent_id) = self.get(current).ok().and_then(|node| node.parent) {
            current = parent_id;
        }
        current
    }

    /// Traverse tree depth-first in document order (iterative, no recursion)
    pub fn traverse_df<F>(&self, start_id: NodeId, mut visit: F) -> Result<()>
    where
        F: FnMut(NodeId, &XmlNode) -> Result<()>,
    {
        let mut stack = vec![start_id];

        while let Some(node_id) = stack.pop() {
            let node = self.get(node_id)?;
            visit(node_id, node)?;

            // Push children in reverse order (so they're visited left-to-right)
            for &child_id in node.children.iter().rev() {
                stack.push(child_id);
            }
        }

        Ok(())
    }

    /// Descendants of `start_id` matching `predicate`, in document order.
    /// The start node itself is never included.
    pub fn find<F>(&self, start_id: NodeId, predicate: F) -> Vec<NodeId>
    where
        F: Fn(&XmlNode) -> bool,
    {
        let mut found = Vec::new();
        let mut stack: Vec<NodeId> = match self.get(start_id) {
            Ok(node) => node.children.iter().rev().copied().collect(),
            Err(_) => return found,
        };

        while let Some(node_id) = stack.pop() {
            let Ok(node) = self.get(node_id) else {
                continue;
            };
            if predicate(node) {
                found.push(node_id);
            }
            stack.extend(node.children.iter().rev().copied());
        }

        found
    }

    /// First descendant of `start_id` matching `predicate`
    pub fn find_one<F>(&self, start_id: NodeId, predicate: F) -> Option<NodeId>
    where
        F: Fn(&XmlNode) -> bool,
    {
        let start = self.get(start_id).ok()?;
        let mut stack: Vec<NodeId> = start.children.iter().rev().copied().collect();

        while let Some(node_id) = stack.pop() {
            let Ok(node) = self.get(node_id) else {
                continue;
            };
            if predicate(node) {
                return Some(node_id);
            }
            stack.extend(node.children.iter().rev().copied());
        }

        None
    }

    /// Find all descendant elements by tag name (exact, case-sensitive)
    pub fn find_by_name(&self, start_id: NodeId, name: &str) -> Vec<NodeId> {
        self.find(start_id, |node| node.name == name)
    }

    /// Find descendant element by ID attribute
    pub fn find_by_id(&self, start_id: NodeId, id: &str) -> Option<NodeId> {
        self.find_one(start_id, |node| node.attr("id") == Some(id))
    }
}

impl Index<NodeId> for NodeArena {
    type Output = XmlNode;

    /// Panics if `node_id` was not allocated by this arena.
    fn index(&self, node_id: NodeId) -> &XmlNode {
        &self.nodes[node_id as usize]
    }
}

impl IndexMut<NodeId> for NodeArena {
    fn index_mut(&mut self, node_id: NodeId) -> &mut XmlNode {
        &mut self.nodes[node_id as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// root -> [a -> [b], c -> [b]]
    fn sample() -> (NodeArena, NodeId) {
        let mut arena = NodeArena::new();
        let root = arena.add_node(XmlNode::new("root"));
        let a = arena.add_node(XmlNode::new("a"));
        let b1 = arena.add_node(XmlNode::new("b"));
        let c = arena.add_node(XmlNode::new("c"));
        let b2 = arena.add_node(XmlNode::new("b"));
        arena.append_child(root, a).unwrap();
        arena.append_child(a, b1).unwrap();
        arena.append_child(root, c).unwrap();
        arena.append_child(c, b2).unwrap();
        arena.get_mut(b2).unwrap().set_attr("id", "second");
        (arena, root)
    }

    #[test]
    fn test_arena_basic() {
        let mut arena = NodeArena::new();
        let id = arena.add_node(XmlNode::new("div"));
        assert_eq!(id, 0);
        assert_eq!(arena.get(id).unwrap().name, "div");
        assert!(matches!(arena.get(7), Err(XmlError::NodeNotFound(7))));
    }

    #[test]
    fn test_traverse_df() {
        let (arena, root) = sample();

        let mut visited = Vec::new();
        arena
            .traverse_df(root, |_, node| {
                visited.push(node.name.clone());
                Ok(())
            })
            .unwrap();

        assert_eq!(visited, vec!["root", "a", "b", "c", "b"]);
    }

    #[test]
    fn test_find_excludes_start_and_keeps_order() {
        let (arena, root) = sample();

        assert_eq!(arena.find_by_name(root, "b"), vec![2, 4]);
        assert!(arena.find_by_name(root, "root").is_empty());
        assert_eq!(arena.find_by_id(root, "second"), Some(4));
        assert_eq!(arena.find_by_id(root, "missing"), None);
    }

    #[test]
    fn test_move_node_rejects_cycles() {
        let (mut arena, root) = sample();

        assert!(matches!(
            arena.move_node(root, 2),
            Err(XmlError::InvalidHierarchy { node: 0, parent: 2 })
        ));
        assert!(arena.move_node(1, 1).is_err());

        arena.move_node(2, 3).unwrap();
        assert!(arena.get(1).unwrap().children.is_empty());
        assert_eq!(arena.get(3).unwrap().children.as_slice(), &[4, 2]);
        assert_eq!(arena.get(2).unwrap().parent, Some(3));
    }

    #[test]
    fn test_detach_and_top() {
        let (mut arena, root) = sample();
        assert_eq!(arena.top(4), root);
        assert_eq!(arena.top(99), 99);

        arena.detach(3).unwrap();
        assert_eq!(arena.get(root).unwrap().children.as_slice(), &[1]);
        assert_eq!(arena.top(4), 3);
        assert_eq!(arena.find_by_name(root, "b"), vec![2]);
    }
}
