//! Utility functions for text handling

use std::borrow::Cow;

/// Escape character data for element content (`<`, `>`, `&`)
pub fn escape_text(text: &str) -> Cow<'_, str> {
    quick_xml::escape::partial_escape(text)
}

/// Escape an attribute value for a double-quoted attribute
pub fn escape_attribute(value: &str) -> Cow<'_, str> {
    quick_xml::escape::escape(value)
}

/// True for strings made only of XML whitespace (space, tab, CR, LF)
pub fn is_blank(text: &str) -> bool {
    text.bytes().all(|b| matches!(b, b' ' | b'\t' | b'\r' | b'\n'))
}

/// Trim `text` in place, reusing the allocation when nothing changes
pub fn trim_in_place(text: &mut String) {
    let trimmed = text.trim();
    if trimmed.len() != text.len() {
        *text = trimmed.to_string();
    }
}
