//! Position-aware editor: queues surgical edits against one parse and
//! applies them in a single pass.

use std::collections::HashMap;

use quick_xml::escape::escape;

use crate::edit::{self, Edit, EditKind};
use crate::error::{ConfigError, Result};
use crate::index::{ElementPosition, PositionIndex, paths};
use crate::layout::{self, Indentation};
use crate::model::NuGetConfig;
use crate::parser::{ParseResult, parse_with_positions};
use crate::position::LineIndex;
use crate::queue::{EditQueue, QueueState};

/// Editor bound to a single [`ParseResult`].
///
/// Mutators only queue edits; [`ConfigEditor::config`] keeps returning the
/// parsed state until the caller re-parses the output of
/// [`ConfigEditor::apply_edits`]. Every mutator returns the number of edits
/// it queued.
#[derive(Debug)]
pub struct ConfigEditor {
    parsed: ParseResult,
    lines: LineIndex,
    indent_unit: Indentation,
    queue: EditQueue,
    /// Sources queued into a self-closing collection, by collection path
    expansions: HashMap<String, Vec<(String, String)>>,
}

impl ConfigEditor {
    pub fn new(parsed: ParseResult) -> Self {
        let lines = parsed.line_index();
        let indent_unit = std::str::from_utf8(parsed.original_bytes())
            .ok()
            .and_then(Indentation::determine)
            .unwrap_or_default();

        Self {
            parsed,
            lines,
            indent_unit,
            queue: EditQueue::new(),
            expansions: HashMap::new(),
        }
    }

    /// Parse `bytes` and bind a new editor to the result
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        parse_with_positions(bytes).map(Self::new)
    }

    /// The logical config as parsed; queued edits are not reflected
    pub fn config(&self) -> &NuGetConfig {
        self.parsed.config()
    }

    pub fn positions(&self) -> &PositionIndex {
        self.parsed.positions()
    }

    pub fn parse_result(&self) -> &ParseResult {
        &self.parsed
    }

    pub fn into_parse_result(self) -> ParseResult {
        self.parsed
    }

    pub fn pending(&self) -> &[Edit] {
        self.queue.as_slice()
    }

    pub fn state(&self) -> QueueState {
        self.queue.state()
    }

    pub fn is_dirty(&self) -> bool {
        self.queue.state() == QueueState::Dirty
    }

    /// Drop a queued edit, e.g. one reported in a conflict
    pub fn discard(&mut self, index: usize) -> Option<Edit> {
        let edit = self.queue.remove(index)?;
        self.expansions.remove(&edit.path);
        Some(edit)
    }

    /// Add a package source, or update the value/protocol version of an
    /// existing one.
    ///
    /// Updates touch only the quoted values that change. When a protocol
    /// version is requested for an element that has none, the element is
    /// rewritten with the attribute appended.
    pub fn add_or_update_source(
        &mut self,
        key: &str,
        value: &str,
        protocol_version: Option<&str>,
    ) -> Result<usize> {
        require("source key", key)?;
        require("source value", value)?;
        if let Some(version) = protocol_version {
            validate_protocol_version(version)?;
        }

        let Some(existing) = self.parsed.config().source(key) else {
            return self.insert_source(key, value, protocol_version);
        };

        let mut changes = Vec::new();
        if existing.value != value {
            changes.push(("value", value));
        }
        if let Some(version) = protocol_version {
            if existing.protocol_version.as_deref() != Some(version) {
                changes.push(("protocolVersion", version));
            }
        }
        self.update_element(&paths::source(key), &changes)
    }

    /// Delete a package source, taking its whole line when it sits alone on
    /// one
    pub fn remove_source(&mut self, key: &str) -> Result<usize> {
        require("source key", key)?;
        let path = paths::source(key);
        let element = self.source_element(key, &path)?;

        let buffer = self.parsed.original_bytes();
        let (start, end) = (element.range.start.offset, element.range.end.offset);
        let (start, end) = layout::owning_line(buffer, start, end).unwrap_or((start, end));
        let range = self.lines.range(start, end);

        self.queue.push(Edit::delete(path, range));
        Ok(1)
    }

    /// Replace the value of one attribute of a package source
    pub fn update_attribute(&mut self, key: &str, attribute: &str, value: &str) -> Result<usize> {
        require("source key", key)?;
        validate_attribute_name(attribute)?;
        if attribute == "key" {
            return Err(ConfigError::validation(
                "the `key` attribute identifies the source; remove and re-add it instead",
            ));
        }
        require("attribute value", value)?;
        if attribute == "protocolVersion" {
            validate_protocol_version(value)?;
        }

        let path = paths::source(key);
        self.source_element(key, &path)?;
        self.update_element(&path, &[(attribute, value)])
    }

    pub fn update_source_url(&mut self, key: &str, url: &str) -> Result<usize> {
        self.update_attribute(key, "value", url)
    }

    pub fn update_source_protocol_version(&mut self, key: &str, version: &str) -> Result<usize> {
        self.update_attribute(key, "protocolVersion", version)
    }

    /// Apply every queued edit to the original bytes.
    ///
    /// On success the queue is cleared and the new document returned. On
    /// failure the queue is left as it was.
    pub fn apply_edits(&mut self) -> Result<Vec<u8>> {
        let output = edit::apply_edits(self.parsed.original_bytes(), self.queue.as_slice())?;
        self.queue.clear();
        self.expansions.clear();
        Ok(output)
    }

    fn source_element(&self, key: &str, path: &str) -> Result<&ElementPosition> {
        if !self.parsed.config().has_source(key) {
            return Err(ConfigError::not_found(format!("package source `{key}`")));
        }
        self.parsed
            .positions()
            .get(path)
            .ok_or_else(|| ConfigError::not_found(format!("position of `{path}`")))
    }

    fn update_element(&mut self, path: &str, changes: &[(&str, &str)]) -> Result<usize> {
        if changes.is_empty() {
            return Ok(0);
        }
        let element = self
            .parsed
            .positions()
            .get(path)
            .ok_or_else(|| ConfigError::not_found(format!("position of `{path}`")))?;

        if changes.iter().all(|(name, _)| element.attribute(name).is_some()) {
            let mut queued = Vec::with_capacity(changes.len());
            for (name, value) in changes {
                if let Some(range) = element.attr_range(name) {
                    queued.push(Edit::update(path, range, escape(*value)));
                }
            }
            let count = queued.len();
            for edit in queued {
                self.queue.push(edit);
            }
            return Ok(count);
        }

        tracing::warn!(path, "attribute missing, rewriting whole element");
        let text = rewrite_element(self.parsed.original_bytes(), element, changes);
        self.queue.push(Edit::update(path, element.range, text));
        Ok(1)
    }

    fn insert_source(&mut self, key: &str, value: &str, protocol_version: Option<&str>) -> Result<usize> {
        let path = paths::source(key);
        let buffer = self.parsed.original_bytes();
        let positions = self.parsed.positions();
        let collection = positions
            .get(paths::PACKAGE_SOURCES)
            .ok_or_else(|| ConfigError::format("missing required <packageSources> section"))?;

        let sibling = last_child(positions, paths::PACKAGE_SOURCES);
        let quote = sibling
            .filter(|s| s.tag_name == "add")
            .map_or('"', ElementPosition::quote_style);
        let markup = render_add(key, value, protocol_version, quote);

        let newline = layout::newline_style(buffer);
        let parent_indent = layout::indent_before(buffer, collection.range.start.offset);
        let child_indent = sibling
            .and_then(|s| layout::indent_before(buffer, s.range.start.offset))
            .map(str::to_string)
            .unwrap_or_else(|| format!("{}{}", parent_indent.unwrap_or(""), self.indent_unit));

        if collection.self_closing {
            let children = self
                .expansions
                .entry(paths::PACKAGE_SOURCES.to_string())
                .or_default();
            match children.iter_mut().find(|(k, _)| k == key) {
                Some((_, slot)) => *slot = markup,
                None => children.push((key.to_string(), markup)),
            }
            let text = expand_collection(buffer, collection, children, parent_indent, &child_indent, newline);

            let queued = self
                .queue
                .iter_mut()
                .find(|e| e.path == paths::PACKAGE_SOURCES && e.kind == EditKind::Update);
            match queued {
                Some(edit) => edit.new_text = text,
                None => self
                    .queue
                    .push(Edit::update(paths::PACKAGE_SOURCES, collection.range, text)),
            }
            return Ok(1);
        }

        let end_tag = collection.end_tag.unwrap_or(collection.range);
        let (at, text) = match layout::indent_before(buffer, end_tag.start.offset) {
            Some(_) => (
                layout::line_start(buffer, end_tag.start.offset),
                format!("{child_indent}{markup}{newline}"),
            ),
            None => (end_tag.start.offset, markup),
        };

        let pending = self
            .queue
            .iter_mut()
            .find(|e| e.path == path && e.kind == EditKind::Add);
        match pending {
            Some(edit) => edit.new_text = text,
            None => {
                let at = self.lines.position(at);
                self.queue.push(Edit::add(path, at, text));
            }
        }
        Ok(1)
    }
}

fn require(what: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ConfigError::validation(format!("{what} must not be empty")));
    }
    Ok(())
}

fn validate_protocol_version(version: &str) -> Result<()> {
    if version.is_empty() || !version.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ConfigError::validation(format!(
            "protocol version `{version}` is not a number"
        )));
    }
    Ok(())
}

fn validate_attribute_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid = chars.next().is_some_and(|c| c.is_alphabetic() || c == '_')
        && chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | ':'));
    if !valid {
        return Err(ConfigError::validation(format!("`{name}` is not a valid attribute name")));
    }
    Ok(())
}

/// The child of `collection` that starts last in the document
fn last_child<'a>(positions: &'a PositionIndex, collection: &str) -> Option<&'a ElementPosition> {
    let prefix = format!("{collection}/");
    positions
        .iter()
        .filter(|(path, _)| path.starts_with(&prefix))
        .map(|(_, element)| element)
        .max_by_key(|element| element.range.start.offset)
}

fn render_add(key: &str, value: &str, protocol_version: Option<&str>, quote: char) -> String {
    let mut markup = format!(
        "<add key={quote}{}{quote} value={quote}{}{quote}",
        escape(key),
        escape(value)
    );
    if let Some(version) = protocol_version {
        markup.push_str(&format!(" protocolVersion={quote}{}{quote}", escape(version)));
    }
    markup.push_str(" />");
    markup
}

/// Rewrite an element's source text with `changes` applied: existing
/// attributes are replaced in place, missing ones appended after the last
/// attribute in the element's quote style
fn rewrite_element(buffer: &[u8], element: &ElementPosition, changes: &[(&str, &str)]) -> String {
    let base = element.range.start.offset;
    let quote = element.quote_style();
    let mut text = String::from_utf8_lossy(element.range.slice(buffer)).into_owned();

    let mut splices: Vec<(usize, usize, String)> = Vec::new();
    let mut appended = String::new();
    for (name, value) in changes {
        match element.attr_range(name) {
            Some(range) => splices.push((
                range.start.offset - base,
                range.end.offset - base,
                escape(*value).into_owned(),
            )),
            None => appended.push_str(&format!(" {name}={quote}{}{quote}", escape(*value))),
        }
    }

    // just past the closing quote of the last attribute, or the tag name
    let append_at = element
        .attributes
        .last()
        .map_or(1 + element.tag_name.len(), |last| last.value_range.end.offset + 1 - base);
    splices.push((append_at, append_at, appended));

    splices.sort_by(|a, b| b.0.cmp(&a.0));
    for (start, end, replacement) in splices {
        text.replace_range(start..end, &replacement);
    }
    text
}

/// Turn a self-closing collection into open/close form holding `children`
fn expand_collection(
    buffer: &[u8],
    collection: &ElementPosition,
    children: &[(String, String)],
    parent_indent: Option<&str>,
    child_indent: &str,
    newline: &str,
) -> String {
    let original = String::from_utf8_lossy(collection.range.slice(buffer));
    let open = original.trim_end_matches('>').trim_end_matches('/').trim_end();
    let mut text = format!("{open}>");

    match parent_indent {
        Some(indent) => {
            for (_, markup) in children {
                text.push_str(&format!("{newline}{child_indent}{markup}"));
            }
            text.push_str(&format!("{newline}{indent}"));
        }
        None => {
            for (_, markup) in children {
                text.push_str(markup);
            }
        }
    }
    text.push_str(&format!("</{}>", collection.tag_name));
    text
}
