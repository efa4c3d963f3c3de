//! Document - owner of the node arena and entry point for parse/serialize

use std::fs;
use std::io::{Read, Write};
use std::path::Path;
use std::str::FromStr;

use crate::arena::NodeArena;
use crate::error::{Result, XmlError};
use crate::node::{Node, NodeMut};
use crate::parser::XmlParser;
use crate::serializer::XmlSerializer;
use crate::types::{Declaration, NodeId, XmlNode};

/// A parsed or constructed XML document
///
/// The document owns every node. [`Node`] and [`NodeMut`] are handles that
/// borrow the document, so readers and a writer can never overlap.
#[derive(Debug, Clone)]
pub struct Document {
    arena: NodeArena,
    root: NodeId,
    declaration: Option<Declaration>,
    doctype: Option<String>,
}

impl Document {
    /// New document with an empty root element named `root_name` and the
    /// default `<?xml version="1.0" encoding="UTF-8"?>` declaration
    pub fn new(root_name: impl Into<String>) -> Self {
        let mut arena = NodeArena::new();
        let root = arena.add_node(XmlNode::new(root_name));
        Self {
            arena,
            root,
            declaration: Some(Declaration::default()),
            doctype: None,
        }
    }

    pub(crate) fn from_parts(
        arena: NodeArena,
        root: NodeId,
        declaration: Option<Declaration>,
        doctype: Option<String>,
    ) -> Self {
        Self {
            arena,
            root,
            declaration,
            doctype,
        }
    }

    /// Parse UTF-8 encoded XML bytes
    pub fn parse(input: impl AsRef<[u8]>) -> Result<Self> {
        XmlParser::new().parse_bytes(input.as_ref())
    }

    /// Parse an XML string
    pub fn parse_str(input: &str) -> Result<Self> {
        XmlParser::new().parse_str(input)
    }

    /// Read everything from `reader`, then parse it
    pub fn parse_reader<R: Read>(mut reader: R) -> Result<Self> {
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf)?;
        Self::parse(buf)
    }

    /// Load and parse a file
    pub fn parse_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        tracing::debug!(path = %path.display(), "loading XML file");
        let bytes = fs::read(path)?;
        Self::parse(bytes)
    }

    /// The top-level element
    pub fn root(&self) -> Node<'_> {
        Node::new(self, self.root)
    }

    pub fn root_mut(&mut self) -> NodeMut<'_> {
        let root = self.root;
        NodeMut::new(self, root)
    }

    pub fn root_id(&self) -> NodeId {
        self.root
    }

    /// Handle for any node of this document, attached or not
    pub fn node(&self, node_id: NodeId) -> Option<Node<'_>> {
        if self.arena.contains(node_id) {
            Some(Node::new(self, node_id))
        } else {
            None
        }
    }

    /// Mutable handle for any node of this document, attached or not
    pub fn node_mut(&mut self, node_id: NodeId) -> Option<NodeMut<'_>> {
        if self.arena.contains(node_id) {
            Some(NodeMut::new(self, node_id))
        } else {
            None
        }
    }

    /// Like [`Document::node_mut`], but reports the missing id as an error
    pub fn try_node_mut(&mut self, node_id: NodeId) -> Result<NodeMut<'_>> {
        self.node_mut(node_id).ok_or(XmlError::NodeNotFound(node_id))
    }

    pub fn declaration(&self) -> Option<&Declaration> {
        self.declaration.as_ref()
    }

    pub fn set_declaration(&mut self, declaration: Option<Declaration>) {
        self.declaration = declaration;
    }

    /// Full `<!DOCTYPE ...>` text, if the source had one
    pub fn doctype(&self) -> Option<&str> {
        self.doctype.as_deref()
    }

    pub fn set_doctype(&mut self, doctype: Option<String>) {
        self.doctype = doctype;
    }

    /// Number of node slots in the arena, detached nodes included
    pub fn len(&self) -> usize {
        self.arena.len()
    }

    /// Always false: a document has at least its root
    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    pub(crate) fn arena(&self) -> &NodeArena {
        &self.arena
    }

    pub(crate) fn arena_mut(&mut self) -> &mut NodeArena {
        &mut self.arena
    }

    /// Compact serialization: declaration, doctype and root with no separators
    pub fn xml(&self) -> String {
        XmlSerializer::new().serialize_document(self)
    }

    /// One element per line, two spaces of indentation per level
    pub fn xml_pretty(&self) -> String {
        XmlSerializer::pretty().serialize_document(self)
    }

    /// Write the compact form to a byte sink
    pub fn write_to<W: Write>(&self, writer: W) -> Result<()> {
        XmlSerializer::new().write_document(self, writer)
    }

    /// Write the pretty form to a byte sink
    pub fn write_pretty_to<W: Write>(&self, writer: W) -> Result<()> {
        XmlSerializer::pretty().write_document(self, writer)
    }
}

impl FromStr for Document {
    type Err = XmlError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse_str(s)
    }
}

/// Unwrap a parse result, panicking with the error message on failure
///
/// For call sites that treat malformed input as a bug:
/// `let doc = xmldom::must(Document::parse_str(TEMPLATE));`
#[track_caller]
pub fn must<T>(result: Result<T>) -> T {
    match result {
        Ok(value) => value,
        Err(e) => panic!("xmldom: {}", e),
    }
}
