//! Core type definitions for the XML tree
//!
//! Key design principles:
//! 1. Use u32 for indices (4 bytes vs 8 bytes pointer)
//! 2. Parent links are plain indices, never owning pointers
//! 3. Use SmallVec for child lists (most elements have few children)
//! 4. Attribute names are stored exactly as written, prefix included

use smallvec::SmallVec;
use std::fmt;

/// Node identifier (index into the document arena)
pub type NodeId = u32;

/// A single `name="value"` pair of an element
///
/// Names keep any namespace prefix verbatim: `xlink:href` stays `xlink:href`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

impl Attribute {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// Replace the value in place. No validation is performed.
    pub fn set_value(&mut self, value: impl Into<String>) {
        self.value = value.into();
    }
}

/// The `<?xml ...?>` declaration of a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub version: String,
    pub encoding: Option<String>,
    pub standalone: Option<String>,
}

impl Declaration {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            encoding: None,
            standalone: None,
        }
    }

    pub fn with_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = Some(encoding.into());
        self
    }
}

impl Default for Declaration {
    fn default() -> Self {
        Self::new("1.0").with_encoding("UTF-8")
    }
}

impl fmt::Display for Declaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<?xml version=\"{}\"", self.version)?;
        if let Some(encoding) = &self.encoding {
            write!(f, " encoding=\"{}\"", encoding)?;
        }
        if let Some(standalone) = &self.standalone {
            write!(f, " standalone=\"{}\"", standalone)?;
        }
        f.write_str("?>")
    }
}

/// The element record stored in the arena
///
/// Design:
/// - `text` holds all character data of the element, concatenated
/// - `children` is the ordered list of owned child ids
/// - `parent` is a back-index, `None` for the root and for detached nodes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlNode {
    pub name: String,
    pub attributes: Vec<Attribute>,
    pub text: String,
    pub parent: Option<NodeId>,
    pub children: SmallVec<[NodeId; 4]>,
}

impl XmlNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// First attribute with exactly this name
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Get attribute value
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attribute(name).map(|a| a.value.as_str())
    }

    /// Update the first attribute named `name`, or append a new one
    pub fn set_attr(&mut self, name: &str, value: impl Into<String>) {
        match self.attributes.iter_mut().find(|a| a.name == name) {
            Some(existing) => existing.set_value(value),
            None => self.attributes.push(Attribute::new(name, value)),
        }
    }

    pub fn remove_attr(&mut self, name: &str) -> Option<Attribute> {
        let index = self.attributes.iter().position(|a| a.name == name)?;
        Some(self.attributes.remove(index))
    }

    /// No children and no text: serializes as `<name ... />`
    pub fn is_empty(&self) -> bool {
        self.children.is_empty() && self.text.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_attr_keeps_position() {
        let mut node = XmlNode::new("testcase");
        node.set_attr("classname", "a");
        node.set_attr("id", "b");
        node.set_attr("time", "0.1");

        node.set_attr("id", "changed");

        let names: Vec<&str> = node.attributes.iter().map(|a| a.name()).collect();
        assert_eq!(names, vec!["classname", "id", "time"]);
        assert_eq!(node.attr("id"), Some("changed"));
    }

    #[test]
    fn test_prefixed_attribute_is_not_aliased() {
        let mut node = XmlNode::new("use");
        node.set_attr("xlink:href", "#a");

        assert_eq!(node.attr("xlink:href"), Some("#a"));
        assert_eq!(node.attr("href"), None);
    }

    #[test]
    fn test_remove_attr() {
        let mut node = XmlNode::new("a");
        node.set_attr("x", "1");
        node.set_attr("y", "2");

        let removed = node.remove_attr("x").unwrap();
        assert_eq!(removed, Attribute::new("x", "1"));
        assert!(node.remove_attr("x").is_none());
        assert_eq!(node.attributes.len(), 1);
    }

    #[test]
    fn test_declaration_display() {
        assert_eq!(
            Declaration::default().to_string(),
            r#"<?xml version="1.0" encoding="UTF-8"?>"#
        );

        let mut decl = Declaration::new("1.1");
        decl.standalone = Some("yes".to_string());
        assert_eq!(decl.to_string(), r#"<?xml version="1.1" standalone="yes"?>"#);
    }
}
