//! Recorded source spans for tracked elements, keyed by logical path.

use std::collections::HashMap;

use crate::position::{Position, Range};

/// An attribute as written in the source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeSpan {
    pub name: String,
    /// Unescaped value
    pub value: String,
    /// Bytes between the quotes, quotes excluded
    pub value_range: Range,
    /// `"` or `'`
    pub quote: char,
}

/// Source location of one tracked element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementPosition {
    pub tag_name: String,
    /// Attributes in source order
    pub attributes: Vec<AttributeSpan>,
    /// From `<` of the start tag to `>` of the end tag (or of `/>`)
    pub range: Range,
    /// Just past the `>` of the start tag
    pub start_tag_end: Position,
    /// The `</name>` end tag; `None` for self-closing elements
    pub end_tag: Option<Range>,
    /// Raw text between the start and end tags
    pub inner_content: String,
    pub self_closing: bool,
}

impl ElementPosition {
    pub fn attribute(&self, name: &str) -> Option<&AttributeSpan> {
        self.attributes.iter().find(|a| a.name == name)
    }

    pub fn attribute_value(&self, name: &str) -> Option<&str> {
        self.attribute(name).map(|a| a.value.as_str())
    }

    /// Range of the unquoted value of attribute `name`
    pub fn attr_range(&self, name: &str) -> Option<Range> {
        self.attribute(name).map(|a| a.value_range)
    }

    /// Quote style used by the element, taken from its first attribute
    pub fn quote_style(&self) -> char {
        self.attributes.first().map_or('"', |a| a.quote)
    }
}

/// Arena of element positions with a `path -> slot` lookup
#[derive(Debug, Clone, Default)]
pub struct PositionIndex {
    elements: Vec<(String, ElementPosition)>,
    by_path: HashMap<String, usize>,
}

impl PositionIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an element. Returns `false` (and records nothing) when the path
    /// is already taken.
    pub fn insert(&mut self, path: String, element: ElementPosition) -> bool {
        if self.by_path.contains_key(&path) {
            return false;
        }
        self.by_path.insert(path.clone(), self.elements.len());
        self.elements.push((path, element));
        true
    }

    pub fn get(&self, path: &str) -> Option<&ElementPosition> {
        self.by_path.get(path).map(|&slot| &self.elements[slot].1)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.by_path.contains_key(path)
    }

    /// Elements in the order they were closed while parsing
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ElementPosition)> {
        self.elements.iter().map(|(path, e)| (path.as_str(), e))
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

/// Builders for the stable keys used in a [`PositionIndex`]
pub mod paths {
    pub const CONFIGURATION: &str = "configuration";
    pub const PACKAGE_SOURCES: &str = "packageSources";
    pub const CREDENTIALS: &str = "packageSourceCredentials";
    pub const CONFIG: &str = "config";
    pub const DISABLED_SOURCES: &str = "disabledPackageSources";
    pub const ACTIVE_SOURCE: &str = "activePackageSource";
    pub const ACTIVE_SOURCE_ENTRY: &str = "activePackageSource/add";
    pub const CLEAR: &str = "packageSources/clear";

    pub fn source(key: &str) -> String {
        format!("{PACKAGE_SOURCES}/add[key={key}]")
    }

    pub fn credential_section(source: &str) -> String {
        format!("{CREDENTIALS}/{source}")
    }

    pub fn credential(source: &str, key: &str) -> String {
        format!("{CREDENTIALS}/{source}/add[key={key}]")
    }

    pub fn option(key: &str) -> String {
        format!("{CONFIG}/add[key={key}]")
    }

    pub fn disabled_source(key: &str) -> String {
        format!("{DISABLED_SOURCES}/add[key={key}]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::LineIndex;

    fn element(tag: &str) -> ElementPosition {
        let lines = LineIndex::new(b"<add/>");
        ElementPosition {
            tag_name: tag.to_string(),
            attributes: vec![],
            range: lines.range(0, 6),
            start_tag_end: lines.position(6),
            end_tag: None,
            inner_content: String::new(),
            self_closing: true,
        }
    }

    #[test]
    fn test_insert_rejects_duplicate_path() {
        let mut index = PositionIndex::new();
        assert!(index.insert(paths::source("a"), element("add")));
        assert!(!index.insert(paths::source("a"), element("other")));
        assert_eq!(index.len(), 1);
        assert_eq!(index.get(&paths::source("a")).unwrap().tag_name, "add");
    }

    #[test]
    fn test_paths() {
        assert_eq!(paths::source("nuget.org"), "packageSources/add[key=nuget.org]");
        assert_eq!(
            paths::credential("feed", "Username"),
            "packageSourceCredentials/feed/add[key=Username]"
        );
        assert_eq!(paths::option("http_proxy"), "config/add[key=http_proxy]");
    }
}
