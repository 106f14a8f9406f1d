//! Line and indentation helpers for producing edits that blend into the
//! surrounding document.

use std::fmt::{self, Display, Formatter, Write};

#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd)]
pub enum Indentation {
    Spaces(u8),
    Tabs,
}

impl Default for Indentation {
    fn default() -> Self {
        Indentation::Spaces(2)
    }
}

impl Display for Indentation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Indentation::Spaces(spaces) => {
                for _ in 0..*spaces {
                    f.write_char(' ')?;
                }
                Ok(())
            }
            Indentation::Tabs => f.write_char('\t'),
        }
    }
}

impl Indentation {
    /// Most common indentation step between consecutive lines, if any
    pub fn determine(source: &str) -> Option<Self> {
        let mut counts = std::collections::BTreeMap::new();
        let mut last_indentation = 0;
        for line in source.lines().take(100) {
            if line.starts_with('\t') {
                *counts.entry(Self::Tabs).or_insert(0usize) += 1;
                continue;
            }
            let current = line.chars().take_while(|c| *c == ' ').count();
            if line.trim().is_empty() {
                continue;
            }
            let diff = current.abs_diff(last_indentation);
            last_indentation = current;
            if let Ok(diff) = u8::try_from(diff) {
                if diff > 0 {
                    *counts.entry(Self::Spaces(diff)).or_insert(0usize) += 1;
                }
            }
        }
        counts
            .into_iter()
            .max_by_key(|(_, count)| *count)
            .map(|(indentation, _)| indentation)
    }
}

/// Line terminator used by the document
pub fn newline_style(buffer: &[u8]) -> &'static str {
    if buffer.windows(2).any(|w| w == b"\r\n") {
        "\r\n"
    } else {
        "\n"
    }
}

/// Offset of the first byte of the line containing `offset`
pub fn line_start(buffer: &[u8], offset: usize) -> usize {
    buffer[..offset]
        .iter()
        .rposition(|&b| b == b'\n')
        .map_or(0, |n| n + 1)
}

fn is_blank(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\r')
}

/// Leading whitespace of the line containing `offset`, provided nothing but
/// whitespace precedes `offset` on that line
pub fn indent_before(buffer: &[u8], offset: usize) -> Option<&str> {
    let start = line_start(buffer, offset);
    let prefix = &buffer[start..offset];
    if prefix.iter().all(|&b| b == b' ' || b == b'\t') {
        std::str::from_utf8(prefix).ok()
    } else {
        None
    }
}

/// The bytes to remove so that deleting `start..end` takes its whole line
/// with it.
///
/// Applies only when `start..end` is the sole non-whitespace content of its
/// line(s). The returned range runs from the first byte after the previous
/// newline through the trailing newline. On a last line without a newline,
/// the preceding line break is taken instead.
pub fn owning_line(buffer: &[u8], start: usize, end: usize) -> Option<(usize, usize)> {
    let from = line_start(buffer, start);
    if !buffer[from..start].iter().all(|&b| is_blank(b)) {
        return None;
    }

    let mut to = end;
    while to < buffer.len() && is_blank(buffer[to]) {
        to += 1;
    }
    match buffer.get(to) {
        Some(b'\n') => Some((from, to + 1)),
        Some(_) => None,
        None if from > 0 => {
            let mut from = from - 1;
            if from > 0 && buffer[from - 1] == b'\r' {
                from -= 1;
            }
            Some((from, to))
        }
        None => Some((from, to)),
    }
}
