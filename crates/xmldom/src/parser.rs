//! XML Parser - builds a [`Document`] from the `quick-xml` event stream
//!
//! This handles:
//! - Element construction with attributes in source order
//! - Character data accumulation (text and CDATA)
//! - XML declaration and DOCTYPE capture
//! - Structural checks the tokenizer leaves to us (end tag names,
//!   unclosed elements, a single root)

use std::borrow::Cow;

use quick_xml::events::{BytesDecl, BytesStart, Event};
use quick_xml::Reader;

use crate::arena::NodeArena;
use crate::document::Document;
use crate::error::{Result, XmlError};
use crate::types::{Attribute, Declaration, NodeId, XmlNode};
use crate::utils;

/// Configuration for the parser
#[derive(Debug, Clone)]
pub struct ParserConfig {
    /// Trim the accumulated text of each element when it closes
    pub trim_text: bool,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self { trim_text: true }
    }
}

/// Event-driven tree builder
#[derive(Debug, Clone, Default)]
pub struct XmlParser {
    config: ParserConfig,
}

impl XmlParser {
    /// Create new parser with default config
    pub fn new() -> Self {
        Self::with_config(ParserConfig::default())
    }

    /// Create parser with custom config
    pub fn with_config(config: ParserConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// Parse raw bytes. Input must be UTF-8.
    pub fn parse_bytes(&self, input: &[u8]) -> Result<Document> {
        let text = std::str::from_utf8(input)?;
        self.parse_str(text)
    }

    /// Parse a complete XML document
    ///
    /// Reads every event before returning; there is no partial result.
    pub fn parse_str(&self, input: &str) -> Result<Document> {
        let mut reader = Reader::from_str(input);
        // End tag names and whitespace are handled by the builder.
        reader.check_end_names(false);
        reader.trim_text(false);
        reader.expand_empty_elements(false);

        let mut builder = TreeBuilder::new(&self.config, input.len() / 64);

        loop {
            let position = reader.buffer_position();
            let event = match reader.read_event() {
                Ok(event) => event,
                Err(e) => return Err(XmlError::parse(reader.buffer_position(), e.to_string())),
            };

            match event {
                Event::Start(start) => builder.open(&start, position, false)?,
                Event::Empty(start) => builder.open(&start, position, true)?,
                Event::End(end) => {
                    let name = decode(end.name().into_inner(), position)?;
                    builder.close(&name, position)?;
                }
                Event::Text(text) => {
                    let text = text
                        .unescape()
                        .map_err(|e| XmlError::parse(position, e.to_string()))?;
                    builder.text(&text, position)?;
                }
                Event::CData(cdata) => {
                    let raw = cdata.into_inner();
                    let text = decode(&raw, position)?;
                    builder.text(&text, position)?;
                }
                Event::Decl(decl) => builder.declaration(read_declaration(&decl, position)?),
                Event::DocType(doctype) => {
                    let raw = doctype.into_inner();
                    let content = decode(&raw, position)?;
                    builder.doctype(format!("<!DOCTYPE {}>", content.trim()));
                }
                // Comments and processing instructions are not kept in the tree
                Event::Comment(_) | Event::PI(_) => {}
                Event::Eof => break,
            }
        }

        builder.finish(reader.buffer_position())
    }
}

/// Parser state: arena under construction plus the stack of open elements
struct TreeBuilder<'c> {
    config: &'c ParserConfig,
    arena: NodeArena,
    stack: Vec<NodeId>,
    root: Option<NodeId>,
    declaration: Option<Declaration>,
    doctype: Option<String>,
}

impl<'c> TreeBuilder<'c> {
    fn new(config: &'c ParserConfig, capacity: usize) -> Self {
        Self {
            config,
            arena: NodeArena::with_capacity(capacity),
            stack: Vec::new(),
            root: None,
            declaration: None,
            doctype: None,
        }
    }

    fn open(&mut self, start: &BytesStart<'_>, position: usize, empty: bool) -> Result<()> {
        let name = decode(start.name().into_inner(), position)?;

        let parent = self.stack.last().copied();
        if parent.is_none() && self.root.is_some() {
            return Err(XmlError::parse(
                position,
                format!("unexpected element <{}> after the root element", name),
            ));
        }

        let mut node = XmlNode::new(name);
        for attr in start.attributes() {
            let attr = attr.map_err(|e| XmlError::parse(position, e.to_string()))?;
            // Raw key: prefixes such as `xlink:` are kept verbatim
            let key = decode(attr.key.into_inner(), position)?;
            let value = attr
                .unescape_value()
                .map_err(|e| XmlError::parse(position, e.to_string()))?;
            node.attributes.push(Attribute::new(key, value));
        }

        let node_id = self.arena.add_node(node);
        match parent {
            Some(parent_id) => self.arena.append_child(parent_id, node_id)?,
            None => self.root = Some(node_id),
        }

        if !empty {
            self.stack.push(node_id);
        }
        Ok(())
    }

    fn close(&mut self, name: &str, position: usize) -> Result<()> {
        let node_id = self.stack.pop().ok_or_else(|| {
            XmlError::parse(position, format!("unexpected end tag </{}>", name))
        })?;

        let node = self.arena.get_mut(node_id)?;
        if node.name != name {
            return Err(XmlError::parse(
                position,
                format!("mismatched end tag: expected </{}>, found </{}>", node.name, name),
            ));
        }

        if self.config.trim_text {
            utils::trim_in_place(&mut node.text);
        }
        Ok(())
    }

    fn text(&mut self, text: &str, position: usize) -> Result<()> {
        match self.stack.last() {
            Some(&node_id) => {
                self.arena.get_mut(node_id)?.text.push_str(text);
                Ok(())
            }
            None if utils::is_blank(text) => Ok(()),
            None => Err(XmlError::parse(
                position,
                "character data outside the root element",
            )),
        }
    }

    fn declaration(&mut self, declaration: Declaration) {
        if self.root.is_none() {
            self.declaration = Some(declaration);
        }
    }

    fn doctype(&mut self, doctype: String) {
        if self.root.is_none() {
            self.doctype = Some(doctype);
        }
    }

    fn finish(self, position: usize) -> Result<Document> {
        if let Some(&open_id) = self.stack.last() {
            let name = &self.arena.get(open_id)?.name;
            return Err(XmlError::parse(
                position,
                format!("unexpected end of input: <{}> is not closed", name),
            ));
        }

        let root = self
            .root
            .ok_or_else(|| XmlError::parse(position, "no root element"))?;

        tracing::debug!(nodes = self.arena.len(), "parsed XML document");

        Ok(Document::from_parts(
            self.arena,
            root,
            self.declaration,
            self.doctype,
        ))
    }
}

fn decode(bytes: &[u8], position: usize) -> Result<Cow<'_, str>> {
    std::str::from_utf8(bytes)
        .map(Cow::Borrowed)
        .map_err(|e| XmlError::parse(position, e.to_string()))
}

fn read_declaration(decl: &BytesDecl<'_>, position: usize) -> Result<Declaration> {
    let mut declaration = Declaration::new(declaration_field(decl.version(), position)?);
    declaration.encoding = decl
        .encoding()
        .map(|value| declaration_field(value, position))
        .transpose()?;
    declaration.standalone = decl
        .standalone()
        .map(|value| declaration_field(value, position))
        .transpose()?;
    Ok(declaration)
}

fn declaration_field(value: quick_xml::Result<Cow<'_, [u8]>>, position: usize) -> Result<String> {
    let value = value.map_err(|e| XmlError::parse(position, e.to_string()))?;
    Ok(decode(&value, position)?.into_owned())
}
