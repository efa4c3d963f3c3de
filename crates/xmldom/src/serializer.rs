//! XML Serializer - turn a document or subtree back into text
//!
//! Two layouts:
//! - compact: nothing inserted between tags
//! - pretty: one element per line, indented per depth
//!
//! Empty elements always render as `<name attr="v" />`. Text is written
//! before any children.

use std::io::Write;

use crate::arena::NodeArena;
use crate::document::Document;
use crate::error::Result;
use crate::node::Node;
use crate::types::NodeId;
use crate::utils::{escape_attribute, escape_text};

/// Serializer configuration
#[derive(Debug, Clone)]
pub struct SerializerConfig {
    pub pretty: bool,
    /// Indentation unit for one nesting level in pretty mode
    pub indent: String,
    /// Emit the XML declaration and DOCTYPE when serializing a document
    pub include_declaration: bool,
}

impl Default for SerializerConfig {
    fn default() -> Self {
        Self {
            pretty: false,
            indent: "  ".to_string(),
            include_declaration: true,
        }
    }
}

/// XML tree serializer
#[derive(Debug, Clone, Default)]
pub struct XmlSerializer {
    config: SerializerConfig,
}

impl XmlSerializer {
    /// Compact serializer
    pub fn new() -> Self {
        Self::with_config(SerializerConfig::default())
    }

    /// Pretty serializer with two-space indentation
    pub fn pretty() -> Self {
        Self::with_config(SerializerConfig {
            pretty: true,
            ..SerializerConfig::default()
        })
    }

    pub fn with_config(config: SerializerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SerializerConfig {
        &self.config
    }

    /// Serialize declaration, doctype and the root element
    pub fn serialize_document(&self, doc: &Document) -> String {
        let mut output = String::with_capacity(doc.len() * 32);

        if self.config.include_declaration {
            if let Some(declaration) = doc.declaration() {
                output.push_str(&declaration.to_string());
                self.line_break(&mut output);
            }
            if let Some(doctype) = doc.doctype() {
                output.push_str(doctype);
                self.line_break(&mut output);
            }
        }

        self.serialize_element(doc.arena(), doc.root_id(), 0, &mut output);
        output
    }

    /// Serialize one element and its subtree
    pub fn serialize_node(&self, node: Node<'_>) -> String {
        let mut output = String::new();
        self.serialize_element(node.document().arena(), node.id(), 0, &mut output);
        output
    }

    /// Serialize a document into a byte sink
    pub fn write_document<W: Write>(&self, doc: &Document, mut writer: W) -> Result<()> {
        writer.write_all(self.serialize_document(doc).as_bytes())?;
        writer.flush()?;
        Ok(())
    }

    fn line_break(&self, output: &mut String) {
        if self.config.pretty {
            output.push('\n');
        }
    }

    /// Serialize a single element recursively
    fn serialize_element(
        &self,
        arena: &NodeArena,
        node_id: NodeId,
        depth: usize,
        output: &mut String,
    ) {
        let node = &arena[node_id];

        if self.config.pretty {
            output.push_str(&self.config.indent.repeat(depth));
        }

        // Format: <tag id="123" class="foo">
        output.push('<');
        output.push_str(&node.name);
        for attr in &node.attributes {
            output.push(' ');
            output.push_str(&attr.name);
            output.push_str("=\"");
            output.push_str(&escape_attribute(&attr.value));
            output.push('"');
        }

        if node.is_empty() {
            output.push_str(" />");
            return;
        }
        output.push('>');

        if node.children.is_empty() {
            // Text-only elements stay on one line in both layouts
            output.push_str(&escape_text(&node.text));
        } else if self.config.pretty {
            if !node.text.is_empty() {
                output.push('\n');
                output.push_str(&self.config.indent.repeat(depth + 1));
                output.push_str(&escape_text(&node.text));
            }
            for &child_id in &node.children {
                output.push('\n');
                self.serialize_element(arena, child_id, depth + 1, output);
            }
            output.push('\n');
            output.push_str(&self.config.indent.repeat(depth));
        } else {
            output.push_str(&escape_text(&node.text));
            for &child_id in &node.children {
                self.serialize_element(arena, child_id, depth + 1, output);
            }
        }

        // Closing tag
        output.push_str("</");
        output.push_str(&node.name);
        output.push('>');
    }
}
