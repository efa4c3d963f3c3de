//! Error types for XML tree operations
//!
//! Simple, flat error hierarchy. Lookups never fail: absence is `None`.

use crate::types::NodeId;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, XmlError>;

#[derive(Debug, Error)]
pub enum XmlError {
    #[error("Parse error at byte {position}: {message}")]
    Parse { position: usize, message: String },

    #[error("Invalid UTF-8 input: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XPath error: {0}")]
    Query(String),

    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("Cannot append node {node} under {parent}: it is the parent itself or one of its ancestors")]
    InvalidHierarchy { node: NodeId, parent: NodeId },
}

impl XmlError {
    pub(crate) fn parse(position: usize, message: impl Into<String>) -> Self {
        XmlError::Parse {
            position,
            message: message.into(),
        }
    }
}
