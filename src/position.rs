/// Position in a configuration document (line, column and byte offset)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Position {
    /// Line number (1-indexed)
    pub line: usize,
    /// Column number (1-indexed, in bytes)
    pub column: usize,
    /// Byte offset from the start of the buffer (0-indexed)
    pub offset: usize,
}

impl Position {
    pub fn new(line: usize, column: usize, offset: usize) -> Self {
        Self { line, column, offset }
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Half-open byte range in a configuration document
///
/// `end.offset` is exclusive. `start.offset <= end.offset` always holds for
/// ranges produced by [`LineIndex::range`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    pub fn new(start: Position, end: Position) -> Self {
        debug_assert!(start.offset <= end.offset);
        Self { start, end }
    }

    /// Zero-length range at a single point
    pub fn point(at: Position) -> Self {
        Self { start: at, end: at }
    }

    pub fn len(&self) -> usize {
        self.end.offset - self.start.offset
    }

    pub fn is_empty(&self) -> bool {
        self.start.offset == self.end.offset
    }

    pub fn byte_range(&self) -> std::ops::Range<usize> {
        self.start.offset..self.end.offset
    }

    /// Slice the bytes covered by this range out of `buffer`
    pub fn slice<'a>(&self, buffer: &'a [u8]) -> &'a [u8] {
        &buffer[self.byte_range()]
    }

    /// Whether two ranges share at least one byte.
    ///
    /// A zero-length range only intersects a range that strictly contains its
    /// point; two zero-length ranges never intersect.
    pub fn intersects(&self, other: &Range) -> bool {
        let (a, b) = (self.start.offset, self.end.offset);
        let (c, d) = (other.start.offset, other.end.offset);
        match (self.is_empty(), other.is_empty()) {
            (true, true) => false,
            (true, false) => c < a && a < d,
            (false, true) => a < c && c < b,
            (false, false) => a < d && c < b,
        }
    }
}

impl std::fmt::Display for Range {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..{} (bytes {}..{})", self.start, self.end, self.start.offset, self.end.offset)
    }
}

/// Precomputed line starts for fast offset -> position lookups
#[derive(Debug, Clone)]
pub struct LineIndex {
    line_starts: Vec<usize>,
    len: usize,
}

impl LineIndex {
    pub fn new(content: &[u8]) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(
            content
                .iter()
                .enumerate()
                .filter(|&(_, &b)| b == b'\n')
                .map(|(i, _)| i + 1),
        );
        Self { line_starts, len: content.len() }
    }

    /// Convert a byte offset into a [`Position`].
    ///
    /// Offsets past the end are clamped to the buffer length.
    pub fn position(&self, offset: usize) -> Position {
        let offset = offset.min(self.len);
        let line = match self.line_starts.binary_search(&offset) {
            Ok(exact) => exact,
            Err(insert) => insert - 1,
        };
        Position {
            line: line + 1,
            column: offset - self.line_starts[line] + 1,
            offset,
        }
    }

    pub fn range(&self, start: usize, end: usize) -> Range {
        Range::new(self.position(start), self.position(end.max(start)))
    }

    /// Byte offset where the given 1-indexed line begins
    pub fn line_start(&self, line: usize) -> Option<usize> {
        line.checked_sub(1).and_then(|i| self.line_starts.get(i).copied())
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }
}

/// Convert a byte offset to a position
///
/// # Arguments
/// * `content` - The document bytes
/// * `byte_offset` - The byte offset to convert
///
/// # Returns
/// * `Position` with 1-indexed line and column; offsets past the end clamp to
///   the end of the buffer
pub fn byte_to_position(content: &[u8], byte_offset: usize) -> Position {
    LineIndex::new(content).position(byte_offset)
}
