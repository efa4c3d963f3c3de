//! Node handles
//!
//! A handle is a document borrow plus a [`NodeId`]. [`Node`] is `Copy` and
//! read-only; [`NodeMut`] holds the exclusive borrow needed for mutation.
//! Ids are checked when a handle is created, so handle methods index the
//! arena directly.

use std::fmt;

use crate::document::Document;
use crate::error::{Result, XmlError};
use crate::query;
use crate::serializer::XmlSerializer;
use crate::types::{Attribute, NodeId, XmlNode};

/// Read-only view of one element
#[derive(Clone, Copy)]
pub struct Node<'a> {
    doc: &'a Document,
    id: NodeId,
}

impl<'a> Node<'a> {
    pub(crate) fn new(doc: &'a Document, id: NodeId) -> Self {
        Self { doc, id }
    }

    fn data(&self) -> &'a XmlNode {
        &self.doc.arena()[self.id]
    }

    fn wrap(&self, id: NodeId) -> Node<'a> {
        Node::new(self.doc, id)
    }

    fn wrap_all(&self, ids: Vec<NodeId>) -> Vec<Node<'a>> {
        ids.into_iter().map(|id| self.wrap(id)).collect()
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn document(&self) -> &'a Document {
        self.doc
    }

    /// Tag name, prefix included
    pub fn name(&self) -> &'a str {
        &self.data().name
    }

    pub fn text(&self) -> &'a str {
        &self.data().text
    }

    /// Attributes in source/insertion order
    pub fn attributes(&self) -> &'a [Attribute] {
        &self.data().attributes
    }

    pub fn parent(&self) -> Option<Node<'a>> {
        self.data().parent.map(|id| self.wrap(id))
    }

    pub fn children(&self) -> impl Iterator<Item = Node<'a>> + 'a {
        let doc = self.doc;
        self.data().children.iter().map(move |&id| Node::new(doc, id))
    }

    pub fn first_child(&self) -> Option<Node<'a>> {
        self.data().children.first().map(|&id| self.wrap(id))
    }

    pub fn last_child(&self) -> Option<Node<'a>> {
        self.data().children.last().map(|&id| self.wrap(id))
    }

    pub fn prev_sibling(&self) -> Option<Node<'a>> {
        let siblings = &self.parent()?.data().children;
        let index = siblings.iter().position(|&id| id == self.id)?;
        index.checked_sub(1).map(|i| self.wrap(siblings[i]))
    }

    pub fn next_sibling(&self) -> Option<Node<'a>> {
        let siblings = &self.parent()?.data().children;
        let index = siblings.iter().position(|&id| id == self.id)?;
        siblings.get(index + 1).map(|&id| self.wrap(id))
    }

    /// Top of the tree this node belongs to; the root returns itself
    pub fn root(&self) -> Node<'a> {
        self.wrap(self.doc.arena().top(self.id))
    }

    /// First direct child named `name`
    pub fn get_child(&self, name: &str) -> Option<Node<'a>> {
        self.children().find(|child| child.name() == name)
    }

    /// Direct children named `name`, in document order
    pub fn get_children(&self, name: &str) -> Vec<Node<'a>> {
        self.children().filter(|child| child.name() == name).collect()
    }

    pub fn get_attribute(&self, name: &str) -> Option<&'a Attribute> {
        self.data().attribute(name)
    }

    /// Attribute value, or `""` when the attribute is absent
    pub fn get_attribute_value(&self, name: &str) -> &'a str {
        self.data().attr(name).unwrap_or("")
    }

    /// Every descendant named `name`, depth-first in document order.
    /// The receiver itself is not considered.
    pub fn find_by_name(&self, name: &str) -> Vec<Node<'a>> {
        self.wrap_all(self.doc.arena().find_by_name(self.id, name))
    }

    pub fn find_one_by_name(&self, name: &str) -> Option<Node<'a>> {
        self.doc
            .arena()
            .find_one(self.id, |node| node.name == name)
            .map(|id| self.wrap(id))
    }

    /// First descendant whose `id` attribute equals `id`
    pub fn find_by_id(&self, id: &str) -> Option<Node<'a>> {
        self.doc
            .arena()
            .find_by_id(self.id, id)
            .map(|node_id| self.wrap(node_id))
    }

    /// Compact XML of this element and its subtree
    pub fn xml(&self) -> String {
        XmlSerializer::new().serialize_node(*self)
    }

    /// Indented XML of this element and its subtree
    pub fn xml_pretty(&self) -> String {
        XmlSerializer::pretty().serialize_node(*self)
    }

    /// Evaluate an XPath expression with this node as the context node
    ///
    /// Attribute and text results are reported as their owning element.
    pub fn query(&self, expr: &str) -> Result<Vec<Node<'a>>> {
        let ids = query::evaluate(self.doc, self.id, expr)?;
        Ok(self.wrap_all(ids))
    }

    /// First result of [`Node::query`], if any
    pub fn query_one(&self, expr: &str) -> Result<Option<Node<'a>>> {
        Ok(self.query(expr)?.into_iter().next())
    }

    /// Call `f(index, node)` for each result of [`Node::query`]
    pub fn query_each<F>(&self, expr: &str, mut f: F) -> Result<()>
    where
        F: FnMut(usize, Node<'a>),
    {
        for (index, node) in self.query(expr)?.into_iter().enumerate() {
            f(index, node);
        }
        Ok(())
    }
}

impl PartialEq for Node<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.doc, other.doc) && self.id == other.id
    }
}

impl Eq for Node<'_> {}

impl fmt::Debug for Node<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("name", &self.name())
            .finish()
    }
}

/// Mutable handle on one element
pub struct NodeMut<'a> {
    doc: &'a mut Document,
    id: NodeId,
}

impl<'a> NodeMut<'a> {
    pub(crate) fn new(doc: &'a mut Document, id: NodeId) -> Self {
        Self { doc, id }
    }

    fn data(&self) -> &XmlNode {
        &self.doc.arena()[self.id]
    }

    fn data_mut(&mut self) -> &mut XmlNode {
        &mut self.doc.arena_mut()[self.id]
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Read-only view, for the accessors and finders of [`Node`]
    pub fn as_node(&self) -> Node<'_> {
        Node::new(&*self.doc, self.id)
    }

    pub fn into_node(self) -> Node<'a> {
        Node::new(self.doc, self.id)
    }

    pub fn name(&self) -> &str {
        &self.data().name
    }

    pub fn text(&self) -> &str {
        &self.data().text
    }

    pub fn set_name(&mut self, name: impl Into<String>) -> &mut Self {
        self.data_mut().name = name.into();
        self
    }

    pub fn set_text(&mut self, text: impl Into<String>) -> &mut Self {
        self.data_mut().text = text.into();
        self
    }

    /// Update the attribute in place, or append it after the existing ones
    pub fn set_attribute_value(&mut self, name: &str, value: impl Into<String>) -> &mut Self {
        self.data_mut().set_attr(name, value);
        self
    }

    /// Remove the first attribute named `name`
    pub fn remove_attribute(&mut self, name: &str) -> Option<Attribute> {
        self.data_mut().remove_attr(name)
    }

    /// Append a new empty child element and return a handle to it
    pub fn create_node(&mut self, name: impl Into<String>) -> NodeMut<'_> {
        let arena = self.doc.arena_mut();
        let child = arena.add_node(XmlNode::new(name));
        arena[self.id].children.push(child);
        arena[child].parent = Some(self.id);
        NodeMut::new(&mut *self.doc, child)
    }

    /// Move an existing node of this document to the end of the children
    ///
    /// The node is detached from its previous parent first. Moving a node
    /// under itself or one of its descendants is an error.
    pub fn append_child(&mut self, child: NodeId) -> Result<&mut Self> {
        self.doc.arena_mut().move_node(child, self.id)?;
        Ok(self)
    }

    /// Detach a direct child; the child's subtree goes with it
    pub fn remove_child(&mut self, child: NodeId) -> Result<()> {
        if !self.data().children.contains(&child) {
            return Err(XmlError::NodeNotFound(child));
        }
        self.doc.arena_mut().detach(child)
    }
}

impl fmt::Debug for NodeMut<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeMut")
            .field("id", &self.id)
            .field("name", &self.name())
            .finish()
    }
}
