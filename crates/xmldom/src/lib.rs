//! Mutable in-memory DOM for XML documents
//!
//! Parse a document, walk and edit it through node handles, query it with
//! XPath, and write it back out compactly or indented.
//!
//! ## Core Design
//!
//! ```text
//! bytes → quick-xml events → XmlParser → Document (NodeArena)
//!                                              ↓
//!                               Node / NodeMut handles (NodeId = u32)
//!                                              ↓
//!                              XmlSerializer / XPath (sxd-xpath)
//! ```
//!
//! ```
//! use xmldom::Document;
//!
//! let doc = Document::parse_str(r#"<suite><case id="a"/><case id="b"/></suite>"#)?;
//! let cases = doc.root().find_by_name("case");
//! assert_eq!(cases.len(), 2);
//! assert_eq!(cases[1].xml(), r#"<case id="b" />"#);
//! # Ok::<(), xmldom::XmlError>(())
//! ```

pub mod arena;
pub mod document;
pub mod error;
pub mod node;
pub mod parser;
mod query;
pub mod serializer;
pub mod types;
pub mod utils;

pub use arena::NodeArena;
pub use document::{must, Document};
pub use error::{Result, XmlError};
pub use node::{Node, NodeMut};
pub use parser::{ParserConfig, XmlParser};
pub use serializer::{SerializerConfig, XmlSerializer};
pub use types::*;
