//! Position-tracking parser for `NuGet.Config` documents.
//!
//! A single pass over the quick-xml event stream builds the logical
//! [`NuGetConfig`] and, for every element an editor may later target, an
//! [`ElementPosition`] keyed by its stable path (see [`crate::index::paths`]).

use quick_xml::Reader;
use quick_xml::events::{BytesEnd, BytesStart, Event};

use crate::error::{ConfigError, Result};
use crate::index::{AttributeSpan, ElementPosition, PositionIndex, paths};
use crate::model::{KeyValue, NuGetConfig, PackageSource, SourceCredential, decode_local_name};
use crate::position::LineIndex;

/// The immutable product of one parse: logical config, position index and
/// the bytes both were computed from
#[derive(Debug, Clone)]
pub struct ParseResult {
    config: NuGetConfig,
    positions: PositionIndex,
    original: Vec<u8>,
    checksum: String,
}

impl ParseResult {
    pub fn config(&self) -> &NuGetConfig {
        &self.config
    }

    pub fn positions(&self) -> &PositionIndex {
        &self.positions
    }

    pub fn original_bytes(&self) -> &[u8] {
        &self.original
    }

    /// BLAKE3 hash of the original bytes (hex-encoded)
    pub fn checksum(&self) -> &str {
        &self.checksum
    }

    pub fn line_index(&self) -> LineIndex {
        LineIndex::new(&self.original)
    }
}

/// Parse a document, recording the source span of every tracked element.
///
/// # Errors
///
/// * [`ConfigError::Parse`] for malformed markup or invalid UTF-8
/// * [`ConfigError::Format`] when the document does not have the minimal
///   structure (unknown root, missing `packageSources`, `add` without
///   `key`/`value`, duplicate keys)
pub fn parse_with_positions(bytes: &[u8]) -> Result<ParseResult> {
    let source = std::str::from_utf8(bytes).map_err(|err| {
        let lines = LineIndex::new(bytes);
        let at = lines.position(err.valid_up_to());
        ConfigError::Parse {
            line: at.line,
            column: at.column,
            context: String::new(),
            message: "invalid UTF-8".to_string(),
        }
    })?;

    let (config, positions) = ConfigParser::new(source).parse()?;
    tracing::debug!(
        elements = positions.len(),
        sources = config.package_sources.len(),
        "parsed configuration"
    );

    Ok(ParseResult {
        config,
        positions,
        original: bytes.to_vec(),
        checksum: crate::file::checksum(bytes),
    })
}

/// Parse a document into its logical form only
pub fn parse(bytes: &[u8]) -> Result<NuGetConfig> {
    parse_with_positions(bytes).map(|parsed| parsed.config)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RootKind {
    /// `<configuration>` wrapping the sections
    Configuration,
    /// A bare `<packageSources>` section
    Fragment,
}

/// An element whose end tag has not been seen yet
struct OpenElement {
    name: String,
    start: usize,
    start_tag_end: usize,
    attributes: Vec<AttributeSpan>,
}

struct ConfigParser<'a> {
    source: &'a str,
    reader: Reader<&'a [u8]>,
    /// Bytes skipped ahead of the reader's input (a byte order mark)
    base: usize,
    lines: LineIndex,
    stack: Vec<OpenElement>,
    root: Option<RootKind>,
    root_closed: bool,
    config: NuGetConfig,
    positions: PositionIndex,
    pending_credential: Option<SourceCredential>,
    saw_package_sources: bool,
}

impl<'a> ConfigParser<'a> {
    fn new(source: &'a str) -> Self {
        let base = if source.starts_with('\u{FEFF}') {
            '\u{FEFF}'.len_utf8()
        } else {
            0
        };
        let mut reader = Reader::from_str(&source[base..]);
        reader.config_mut().trim_text_start = false;
        reader.config_mut().trim_text_end = false;

        Self {
            source,
            reader,
            base,
            lines: LineIndex::new(source.as_bytes()),
            stack: Vec::new(),
            root: None,
            root_closed: false,
            config: NuGetConfig::default(),
            positions: PositionIndex::new(),
            pending_credential: None,
            saw_package_sources: false,
        }
    }

    fn parse(mut self) -> Result<(NuGetConfig, PositionIndex)> {
        loop {
            let event_start = self.offset();

            match self.reader.read_event() {
                Ok(Event::Start(e)) => self.handle_start(&e, event_start)?,
                Ok(Event::End(e)) => self.handle_end(&e, event_start)?,
                Ok(Event::Empty(e)) => self.handle_empty(&e, event_start)?,
                Ok(Event::Text(e)) => {
                    if self.stack.is_empty() && !e.iter().all(u8::is_ascii_whitespace) {
                        return Err(self.error_at(event_start, "text outside the root element"));
                    }
                }
                Ok(Event::Eof) => break,
                // comments, CDATA, declarations and processing instructions
                // carry nothing the config model needs
                Ok(_) => {}
                Err(e) => {
                    let at = self.base + self.reader.error_position() as usize;
                    return Err(self.error_at(at, e.to_string()));
                }
            }
        }

        if let Some(open) = self.stack.last() {
            let message = format!("unexpected end of input, expected </{}>", open.name);
            return Err(self.error_at(self.source.len(), message));
        }
        if self.root.is_none() {
            return Err(ConfigError::format("document has no root element"));
        }
        if !self.saw_package_sources {
            return Err(ConfigError::format("missing required <packageSources> section"));
        }

        Ok((self.config, self.positions))
    }

    fn handle_start(&mut self, e: &BytesStart<'_>, event_start: usize) -> Result<()> {
        let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
        self.check_root(&name, event_start)?;

        let start_tag_end = self.offset();
        let attributes = self.scan_attributes(e, event_start, start_tag_end)?;

        if self.section_parents() == [paths::CREDENTIALS] {
            self.pending_credential = Some(SourceCredential::default());
        }

        self.stack.push(OpenElement {
            name,
            start: event_start,
            start_tag_end,
            attributes,
        });
        Ok(())
    }

    fn handle_end(&mut self, e: &BytesEnd<'_>, event_start: usize) -> Result<()> {
        let end_name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
        let open = self
            .stack
            .pop()
            .ok_or_else(|| self.error_at(event_start, format!("unexpected closing tag </{end_name}>")))?;

        if open.name != end_name {
            let message = format!("mismatched end tag: expected </{}>, found </{}>", open.name, end_name);
            return Err(self.error_at(event_start, message));
        }

        let end = self.offset();
        let element = ElementPosition {
            tag_name: open.name,
            attributes: open.attributes,
            range: self.lines.range(open.start, end),
            start_tag_end: self.lines.position(open.start_tag_end),
            end_tag: Some(self.lines.range(event_start, end)),
            inner_content: self.source[open.start_tag_end..event_start].to_string(),
            self_closing: false,
        };
        self.close_element(element)
    }

    fn handle_empty(&mut self, e: &BytesStart<'_>, event_start: usize) -> Result<()> {
        let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
        self.check_root(&name, event_start)?;

        let end = self.offset();
        let attributes = self.scan_attributes(e, event_start, end)?;
        let element = ElementPosition {
            tag_name: name,
            attributes,
            range: self.lines.range(event_start, end),
            start_tag_end: self.lines.position(end),
            end_tag: None,
            inner_content: String::new(),
            self_closing: true,
        };
        self.close_element(element)
    }

    fn check_root(&mut self, name: &str, event_start: usize) -> Result<()> {
        if !self.stack.is_empty() {
            return Ok(());
        }
        if self.root_closed {
            return Err(self.error_at(event_start, "multiple root elements"));
        }
        self.root = Some(match name {
            paths::CONFIGURATION => RootKind::Configuration,
            paths::PACKAGE_SOURCES => RootKind::Fragment,
            other => {
                return Err(ConfigError::format(format!(
                    "unexpected root element <{other}>, expected <configuration>"
                )));
            }
        });
        Ok(())
    }

    /// Names of the open elements below the section level
    ///
    /// For `<configuration><packageSources><add/>` this is `["packageSources"]`
    /// while the `add` is processed; a fragment root counts as a section.
    fn section_parents(&self) -> Vec<&str> {
        let skip = match self.root {
            Some(RootKind::Configuration) => 1,
            _ => 0,
        };
        self.stack.iter().skip(skip).map(|o| o.name.as_str()).collect()
    }

    fn close_element(&mut self, element: ElementPosition) -> Result<()> {
        if self.stack.is_empty() {
            self.root_closed = true;
        }

        let parents: Vec<String> = self.section_parents().into_iter().map(str::to_string).collect();
        let parents: Vec<&str> = parents.iter().map(String::as_str).collect();

        let tag = element.tag_name.clone();
        match (parents.as_slice(), tag.as_str()) {
            ([], paths::CONFIGURATION) if self.stack.is_empty() => {
                self.record(paths::CONFIGURATION.to_string(), element)
            }
            ([], section) => {
                match section {
                    paths::PACKAGE_SOURCES => self.saw_package_sources = true,
                    paths::CREDENTIALS | paths::CONFIG | paths::DISABLED_SOURCES | paths::ACTIVE_SOURCE => {}
                    _ => return Ok(()),
                }
                self.record(section.to_string(), element)
            }
            ([paths::PACKAGE_SOURCES], "add") => {
                let (key, value) = self.key_value(&element)?;
                let protocol_version = element.attribute_value("protocolVersion").map(str::to_string);
                self.record(paths::source(&key), element)?;
                self.config.package_sources.push(PackageSource {
                    key,
                    value,
                    protocol_version,
                });
                Ok(())
            }
            ([paths::PACKAGE_SOURCES], "clear") => {
                self.config.clear_sources = true;
                self.record(paths::CLEAR.to_string(), element)
            }
            ([paths::CREDENTIALS], raw_name) => {
                let source = decode_local_name(raw_name);
                let credential = self.pending_credential.take().unwrap_or_default();
                self.record(paths::credential_section(&source), element)?;
                self.config.credentials.insert(source, credential);
                Ok(())
            }
            ([paths::CREDENTIALS, raw_name], "add") => {
                let source = decode_local_name(raw_name);
                let (key, value) = self.key_value(&element)?;
                self.record(paths::credential(&source, &key), element)?;
                let credential = self.pending_credential.get_or_insert_with(Default::default);
                if !credential.set_field(&key, value) {
                    tracing::warn!(source = %source, key = %key, "ignoring unknown credential key");
                }
                Ok(())
            }
            ([paths::CONFIG], "add") => {
                let (key, value) = self.key_value(&element)?;
                self.record(paths::option(&key), element)?;
                self.config.options.push(KeyValue { key, value });
                Ok(())
            }
            ([paths::DISABLED_SOURCES], "add") => {
                let (key, value) = self.key_value(&element)?;
                self.record(paths::disabled_source(&key), element)?;
                self.config.disabled_sources.push(KeyValue { key, value });
                Ok(())
            }
            ([paths::ACTIVE_SOURCE], "add") => {
                let (key, value) = self.key_value(&element)?;
                self.record(paths::ACTIVE_SOURCE_ENTRY.to_string(), element)?;
                self.config.active_source = Some(KeyValue { key, value });
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn record(&mut self, path: String, element: ElementPosition) -> Result<()> {
        if self.positions.contains(&path) {
            return Err(ConfigError::format(format!(
                "duplicate entry `{path}` at line {}",
                element.range.start.line
            )));
        }
        self.positions.insert(path, element);
        Ok(())
    }

    fn key_value(&self, element: &ElementPosition) -> Result<(String, String)> {
        let at = element.range.start;
        let key = element
            .attribute_value("key")
            .ok_or_else(|| ConfigError::format(format!("<{}> at {at} is missing `key`", element.tag_name)))?;
        let value = element
            .attribute_value("value")
            .ok_or_else(|| ConfigError::format(format!("<{}> at {at} is missing `value`", element.tag_name)))?;
        Ok((key.to_string(), value.to_string()))
    }

    /// Locate every attribute of the tag spanning `tag_start..tag_end`.
    ///
    /// quick-xml validates the attribute list; the byte ranges come from a
    /// scan of the raw tag text.
    fn scan_attributes(
        &self,
        e: &BytesStart<'_>,
        tag_start: usize,
        tag_end: usize,
    ) -> Result<Vec<AttributeSpan>> {
        for attr in e.attributes() {
            attr.map_err(|err| self.error_at(tag_start, format!("invalid attribute: {err}")))?;
        }

        let bytes = self.source.as_bytes();
        let mut i = tag_start + 1 + e.name().as_ref().len();
        let mut attributes = Vec::new();

        loop {
            while i < tag_end && bytes[i].is_ascii_whitespace() {
                i += 1;
            }
            if i >= tag_end || matches!(bytes[i], b'/' | b'>') {
                break;
            }

            let name_start = i;
            while i < tag_end && !bytes[i].is_ascii_whitespace() && bytes[i] != b'=' {
                i += 1;
            }
            let name = &self.source[name_start..i];

            while i < tag_end && bytes[i].is_ascii_whitespace() {
                i += 1;
            }
            if i >= tag_end || bytes[i] != b'=' {
                return Err(self.error_at(name_start, format!("attribute `{name}` has no value")));
            }
            i += 1;
            while i < tag_end && bytes[i].is_ascii_whitespace() {
                i += 1;
            }

            let quote = bytes.get(i).copied().filter(|q| matches!(q, b'"' | b'\''));
            let Some(quote) = quote else {
                return Err(self.error_at(i, format!("attribute `{name}` value is not quoted")));
            };
            let value_start = i + 1;
            let value_len = bytes[value_start..tag_end]
                .iter()
                .position(|&b| b == quote)
                .ok_or_else(|| self.error_at(value_start, "unterminated attribute value"))?;
            let value_end = value_start + value_len;

            let raw = &self.source[value_start..value_end];
            let value = quick_xml::escape::unescape(raw)
                .map_err(|err| self.error_at(value_start, format!("invalid attribute value: {err}")))?;

            attributes.push(AttributeSpan {
                name: name.to_string(),
                value: value.into_owned(),
                value_range: self.lines.range(value_start, value_end),
                quote: quote as char,
            });
            i = value_end + 1;
        }

        Ok(attributes)
    }

    /// Reader position as an offset into `self.source`
    fn offset(&self) -> usize {
        self.base + self.reader.buffer_position() as usize
    }

    fn error_at(&self, offset: usize, message: impl Into<String>) -> ConfigError {
        let at = self.lines.position(offset);
        let line_start = self.lines.line_start(at.line).unwrap_or(0);
        let line_end = self.source[line_start..]
            .find('\n')
            .map_or(self.source.len(), |n| line_start + n);
        let context: String = self.source[line_start..line_end].trim().chars().take(60).collect();

        ConfigError::Parse {
            line: at.line,
            column: at.column,
            context,
            message: message.into(),
        }
    }
}
