//! XPath bridge
//!
//! The tree is mirrored into an `sxd-document` package, the expression is
//! evaluated by `sxd-xpath`, and result elements are mapped back to arena
//! ids. The mirror lives only for one call.
//!
//! ```text
//! Document (arena) → Mirror (sxd) → XPath → Nodeset → NodeId
//! ```

use ahash::{AHashMap, AHashSet};
use sxd_document::dom::{self, Element};
use sxd_document::{Package, QName};
use sxd_xpath::nodeset::Node as XPathNode;
use sxd_xpath::{Context, Factory, Value};

use crate::arena::NodeArena;
use crate::document::Document;
use crate::error::{Result, XmlError};
use crate::types::NodeId;

const XML_PREFIX: &str = "xml";
const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// Evaluate `expr` with `context_id` as the context node
///
/// The top element of the context's tree plays the document node, so
/// absolute paths (`//*`, `/name`) never select it. Non node-set results
/// (numbers, strings, booleans) select nothing. Results come back in
/// document order without duplicates.
pub(crate) fn evaluate(doc: &Document, context_id: NodeId, expr: &str) -> Result<Vec<NodeId>> {
    let arena = doc.arena();
    arena.get(context_id)?;
    let top = arena.top(context_id);

    let package = Package::new();
    let mirror = Mirror::build(package.as_document(), arena, top)?;
    let context_element = mirror
        .element(context_id)
        .ok_or(XmlError::NodeNotFound(context_id))?;

    let mut context = Context::new();
    for (prefix, uri) in &mirror.namespaces {
        context.set_namespace(prefix, uri);
    }

    let mut selected = AHashSet::new();
    for branch in union_branches(expr) {
        // sxd-xpath panics on unbound prefixes, so check them up front
        if let Some(prefix) = prefixes(branch)
            .into_iter()
            .find(|prefix| !mirror.namespaces.contains_key(*prefix))
        {
            return Err(XmlError::Query(format!(
                "no namespace bound to prefix {:?} in {:?}",
                prefix, expr
            )));
        }

        let xpath = Factory::new()
            .build(branch)
            .map_err(|e| XmlError::Query(e.to_string()))?
            .ok_or_else(|| XmlError::Query(format!("empty expression: {:?}", expr)))?;
        let value = xpath
            .evaluate(&context, context_element)
            .map_err(|e| XmlError::Query(e.to_string()))?;

        if let Value::Nodeset(nodes) = value {
            let absolute = branch.trim_start().starts_with('/');
            selected.extend(mirror.resolve(nodes.document_order(), absolute));
        }
    }

    let mut ids = Vec::with_capacity(selected.len());
    arena.traverse_df(top, |node_id, _| {
        if selected.contains(&node_id) {
            ids.push(node_id);
        }
        Ok(())
    })?;

    tracing::trace!(expr, results = ids.len(), "evaluated XPath");
    Ok(ids)
}

/// Split `expr` at top-level `|` operators
fn union_branches(expr: &str) -> Vec<&str> {
    let mut branches = Vec::new();
    let mut depth = 0usize;
    let mut quote = None;
    let mut start = 0;

    for (i, c) in expr.char_indices() {
        match (quote, c) {
            (Some(q), _) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '(' | '[') => depth += 1,
            (None, ')' | ']') => depth = depth.saturating_sub(1),
            (None, '|') if depth == 0 => {
                branches.push(&expr[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    branches.push(&expr[start..]);
    branches
}

/// Namespace prefixes of qualified names (`p:name`, `p:*`) outside literals
fn prefixes(expr: &str) -> Vec<&str> {
    let bytes = expr.as_bytes();
    let mut found = Vec::new();
    let mut quote = None;

    for (i, &b) in bytes.iter().enumerate() {
        match quote {
            Some(q) if b == q => quote = None,
            Some(_) => {}
            None if b == b'"' || b == b'\'' => quote = Some(b),
            None if b == b':' => {
                // `::` separates an axis from its node test
                let axis = (i > 0 && bytes[i - 1] == b':') || bytes.get(i + 1) == Some(&b':');
                if axis {
                    continue;
                }
                let head = &expr[..i];
                let start = head
                    .char_indices()
                    .rev()
                    .find(|&(_, c)| !is_name_char(c))
                    .map_or(0, |(p, c)| p + c.len_utf8());
                if start < i {
                    found.push(&expr[start..i]);
                }
            }
            None => {}
        }
    }
    found
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '.')
}

/// sxd-side copy of the tree with identity maps in both directions
struct Mirror<'d> {
    top: NodeId,
    /// Prefix bindings from `xmlns:*` attributes, first declaration wins
    namespaces: AHashMap<String, String>,
    to_node: AHashMap<Element<'d>, NodeId>,
    to_element: AHashMap<NodeId, Element<'d>>,
}

impl<'d> Mirror<'d> {
    fn build(target: dom::Document<'d>, arena: &NodeArena, top: NodeId) -> Result<Self> {
        let mut namespaces = AHashMap::new();
        namespaces.insert(XML_PREFIX.to_string(), XML_NAMESPACE.to_string());
        arena.traverse_df(top, |_, node| {
            for attr in &node.attributes {
                if let Some(prefix) = attr.name.strip_prefix("xmlns:") {
                    namespaces
                        .entry(prefix.to_string())
                        .or_insert_with(|| attr.value.clone());
                }
            }
            Ok(())
        })?;

        let mut mirror = Self {
            top,
            namespaces,
            to_node: AHashMap::with_capacity(arena.len()),
            to_element: AHashMap::with_capacity(arena.len()),
        };
        let root = mirror.copy_element(target, arena, top);
        target.root().append_child(root);
        Ok(mirror)
    }

    /// Bound prefixes become namespace-qualified names; anything else,
    /// `xmlns:*` included, stays a plain local part
    fn qualified<'n>(&'n self, name: &'n str) -> QName<'n> {
        match name.split_once(':') {
            Some((prefix, local)) if prefix != "xmlns" => match self.namespaces.get(prefix) {
                Some(uri) => QName::with_namespace_uri(Some(uri.as_str()), local),
                None => QName::new(name),
            },
            _ => QName::new(name),
        }
    }

    fn copy_element(
        &mut self,
        target: dom::Document<'d>,
        arena: &NodeArena,
        node_id: NodeId,
    ) -> Element<'d> {
        let node = &arena[node_id];

        let element = target.create_element(self.qualified(&node.name));
        for attr in &node.attributes {
            element.set_attribute_value(self.qualified(&attr.name), &attr.value);
        }
        if !node.text.is_empty() {
            element.append_child(target.create_text(&node.text));
        }
        for &child_id in &node.children {
            let child = self.copy_element(target, arena, child_id);
            element.append_child(child);
        }

        self.to_node.insert(element, node_id);
        self.to_element.insert(node_id, element);
        element
    }

    fn element(&self, node_id: NodeId) -> Option<Element<'d>> {
        self.to_element.get(&node_id).copied()
    }

    /// Map result nodes to arena ids, attributes and text to their element.
    /// The document node maps to the top element.
    fn resolve(&self, nodes: Vec<XPathNode<'d>>, absolute: bool) -> Vec<NodeId> {
        nodes
            .into_iter()
            .filter_map(|node| match node {
                XPathNode::Root(_) => Some(self.top),
                XPathNode::Element(element) => self
                    .to_node
                    .get(&element)
                    .copied()
                    .filter(|&id| !(absolute && id == self.top)),
                XPathNode::Attribute(attribute) => {
                    attribute.parent().and_then(|e| self.to_node.get(&e).copied())
                }
                XPathNode::Text(text) => text.parent().and_then(|e| self.to_node.get(&e).copied()),
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<testsuites>
        <testsuite name="s">
            <properties><property name="go.version">go1.8.1</property></properties>
            <testcase classname="x" id="first" time="0.004"></testcase>
            <testcase classname="x" id="second" time="0.005"></testcase>
        </testsuite>
    </testsuites>"#;

    fn names(doc: &Document, ids: &[NodeId]) -> Vec<String> {
        ids.iter()
            .map(|&id| doc.node(id).unwrap().name().to_string())
            .collect()
    }

    #[test]
    fn test_descendant_query() {
        let doc = Document::parse_str(SAMPLE).unwrap();
        let ids = evaluate(&doc, doc.root_id(), "//testcase").unwrap();
        assert_eq!(names(&doc, &ids), vec!["testcase", "testcase"]);

        // The root element stands in for the document node
        let all = evaluate(&doc, doc.root_id(), "//*").unwrap();
        assert_eq!(all.len(), 5);
        assert_eq!(names(&doc, &all[..1]), vec!["testsuite"]);
        assert!(evaluate(&doc, doc.root_id(), "/testsuites").unwrap().is_empty());
        assert_eq!(evaluate(&doc, doc.root_id(), ".").unwrap(), vec![doc.root_id()]);
        assert_eq!(evaluate(&doc, doc.root_id(), "/").unwrap(), vec![doc.root_id()]);
    }

    #[test]
    fn test_union_in_document_order() {
        let doc = Document::parse_str(SAMPLE).unwrap();
        let expr = "//testcase | //property | //testcase[@id='first']";
        let ids = evaluate(&doc, doc.root_id(), expr).unwrap();
        assert_eq!(names(&doc, &ids), vec!["property", "testcase", "testcase"]);
    }

    #[test]
    fn test_prefixed_names() {
        let doc =
            Document::parse_str(r#"<a xmlns:x="urn:x"><x:b x:k="1"/><c/><x:b/></a>"#).unwrap();

        let ids = evaluate(&doc, doc.root_id(), "//x:b").unwrap();
        assert_eq!(names(&doc, &ids), vec!["x:b", "x:b"]);

        let ids = evaluate(&doc, doc.root_id(), "//*[@x:k='1']").unwrap();
        assert_eq!(names(&doc, &ids), vec!["x:b"]);

        assert!(evaluate(&doc, doc.root_id(), "//b").unwrap().is_empty());
        assert_eq!(evaluate(&doc, doc.root_id(), "//c | //x:*").unwrap().len(), 3);
    }

    #[test]
    fn test_unbound_prefix_is_an_error() {
        let doc = Document::parse_str(r#"<a><y:b/></a>"#).unwrap();

        assert!(matches!(
            evaluate(&doc, doc.root_id(), "//y:b"),
            Err(XmlError::Query(_))
        ));
        assert!(matches!(
            evaluate(&doc, doc.root_id(), "//a | //@z:id"),
            Err(XmlError::Query(_))
        ));
        // Colons inside literals and axis separators are not prefixes
        assert!(evaluate(&doc, doc.root_id(), "child::*[name()='y:b']").is_ok());
    }

    #[test]
    fn test_detached_subtree() {
        let mut doc = Document::parse_str(SAMPLE).unwrap();
        let suite = doc.root().first_child().unwrap().id();
        let props = doc.node(suite).unwrap().get_child("properties").unwrap().id();
        doc.node_mut(suite).unwrap().remove_child(props).unwrap();

        assert_eq!(evaluate(&doc, props, ".").unwrap(), vec![props]);
        assert_eq!(names(&doc, &evaluate(&doc, props, "//*").unwrap()), vec!["property"]);
        assert!(evaluate(&doc, doc.root_id(), "//property").unwrap().is_empty());
    }

    #[test]
    fn test_expression_scanning() {
        assert_eq!(union_branches("a | b[x|y] | 'p|q'"), vec!["a ", " b[x|y] ", " 'p|q'"]);
        assert_eq!(prefixes("//x:b/@xlink:href"), vec!["x", "xlink"]);
        assert_eq!(prefixes("ancestor::p:*[@id='a:b']"), vec!["p"]);
        assert!(prefixes("descendant::node()").is_empty());
    }

    #[test]
    fn test_attribute_predicate() {
        let doc = Document::parse_str(SAMPLE).unwrap();
        let ids = evaluate(&doc, doc.root_id(), "//testcase[@id='second']").unwrap();
        assert_eq!(ids.len(), 1);
        assert_eq!(doc.node(ids[0]).unwrap().get_attribute_value("time"), "0.005");
    }

    #[test]
    fn test_relative_to_context_node() {
        let doc = Document::parse_str(SAMPLE).unwrap();
        let suite = doc.root().first_child().unwrap().id();

        let ids = evaluate(&doc, suite, "properties/property").unwrap();
        assert_eq!(names(&doc, &ids), vec!["property"]);

        let ids = evaluate(&doc, suite, "testcase[1]").unwrap();
        assert_eq!(doc.node(ids[0]).unwrap().get_attribute_value("id"), "first");
    }

    #[test]
    fn test_attribute_and_text_results_map_to_elements() {
        let doc = Document::parse_str(SAMPLE).unwrap();

        let ids = evaluate(&doc, doc.root_id(), "//testcase/@id").unwrap();
        assert_eq!(ids.len(), 2);

        let ids = evaluate(&doc, doc.root_id(), "//property/text()").unwrap();
        assert_eq!(names(&doc, &ids), vec!["property"]);

        let ids = evaluate(&doc, doc.root_id(), "//property[text()='go1.8.1']").unwrap();
        assert_eq!(ids.len(), 1);
    }

    #[test]
    fn test_non_nodeset_and_errors() {
        let doc = Document::parse_str(SAMPLE).unwrap();

        assert!(evaluate(&doc, doc.root_id(), "count(//testcase)").unwrap().is_empty());
        assert!(evaluate(&doc, doc.root_id(), "//nothing").unwrap().is_empty());
        assert!(matches!(
            evaluate(&doc, doc.root_id(), "//testcase[@id="),
            Err(XmlError::Query(_))
        ));
        assert!(matches!(
            evaluate(&doc, doc.root_id(), ""),
            Err(XmlError::Query(_))
        ));
    }
}
