use crate::error::{ConfigError, Result};
use crate::position::{Position, Range};

/// What a queued edit does to the document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EditKind {
    Add,
    Update,
    Delete,
}

impl EditKind {
    pub fn name(&self) -> &'static str {
        match self {
            EditKind::Add => "add",
            EditKind::Update => "update",
            EditKind::Delete => "delete",
        }
    }
}

/// Where an edit lands in the original buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditTarget {
    /// Insert at a point; nothing is removed
    Insert(Position),
    /// Replace the bytes of a range
    Replace(Range),
}

/// A byte-range edit against the original buffer of a parse
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub kind: EditKind,
    pub target: EditTarget,
    /// Replacement text (empty for deletes)
    pub new_text: String,
    /// Logical path of the element the edit was derived from
    pub path: String,
}

impl Edit {
    pub fn add(path: impl Into<String>, at: Position, new_text: impl Into<String>) -> Self {
        Self {
            kind: EditKind::Add,
            target: EditTarget::Insert(at),
            new_text: new_text.into(),
            path: path.into(),
        }
    }

    pub fn update(path: impl Into<String>, range: Range, new_text: impl Into<String>) -> Self {
        Self {
            kind: EditKind::Update,
            target: EditTarget::Replace(range),
            new_text: new_text.into(),
            path: path.into(),
        }
    }

    pub fn delete(path: impl Into<String>, range: Range) -> Self {
        Self {
            kind: EditKind::Delete,
            target: EditTarget::Replace(range),
            new_text: String::new(),
            path: path.into(),
        }
    }

    /// The replaced range; zero-length at the insertion point for adds
    pub fn range(&self) -> Range {
        match self.target {
            EditTarget::Insert(at) => Range::point(at),
            EditTarget::Replace(range) => range,
        }
    }

    /// Byte shift introduced by this edit (positive = content grew)
    pub fn byte_shift(&self) -> i64 {
        self.new_text.len() as i64 - self.range().len() as i64
    }
}

/// Validate an edit's byte span against the buffer it will be applied to
///
/// # Returns
/// * `Ok(())` if the span is ordered and in bounds
/// * `Err(ConfigError::Validation)` otherwise
pub fn validate_edit_span(edit: &Edit, content_len: usize) -> Result<()> {
    let range = edit.range();

    if range.end.offset < range.start.offset {
        return Err(ConfigError::validation(format!(
            "edit for `{}` has end ({}) before start ({})",
            edit.path, range.end.offset, range.start.offset
        )));
    }

    if range.end.offset > content_len {
        return Err(ConfigError::validation(format!(
            "edit for `{}` spans bytes {}..{} beyond content length {}",
            edit.path, range.start.offset, range.end.offset, content_len
        )));
    }

    Ok(())
}

/// Indices of `edits` in document order.
///
/// Ties on the start offset keep inserts ahead of replacements, and queue
/// order among equals, so inserts at one point come out in the order they
/// were queued.
fn document_order(edits: &[Edit]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..edits.len()).collect();
    order.sort_by_key(|&i| {
        let range = edits[i].range();
        (range.start.offset, !range.is_empty(), i)
    });
    order
}

/// Sort edits by start offset in descending order for sequential application
///
/// Applying from the end of the buffer toward the start keeps every offset
/// recorded against the original buffer valid: a splice only moves bytes
/// that come after it, and those have already been handled.
pub fn sort_edits_descending(edits: &[Edit]) -> Vec<&Edit> {
    document_order(edits).into_iter().rev().map(|i| &edits[i]).collect()
}

/// Reject any pair of edits whose ranges share a byte.
///
/// Inserts at the same point never conflict with each other, nor with a
/// replacement that starts or ends at that point.
pub fn check_conflicts(edits: &[Edit]) -> Result<()> {
    let mut widest: Option<&Edit> = None;

    for i in document_order(edits) {
        let edit = &edits[i];
        let range = edit.range();

        if let Some(previous) = widest {
            if previous.range().intersects(&range) {
                return Err(ConfigError::Conflict {
                    first: previous.range(),
                    first_path: previous.path.clone(),
                    second: range,
                    second_path: edit.path.clone(),
                });
            }
        }

        let extends = widest.is_none_or(|w| range.end.offset > w.range().end.offset);
        if !range.is_empty() && extends {
            widest = Some(edit);
        }
    }

    Ok(())
}

/// Total byte shift across a batch of edits
pub fn total_byte_shift(edits: &[Edit]) -> i64 {
    edits.iter().map(Edit::byte_shift).sum()
}

/// Apply a batch of edits to the original buffer in reverse byte order
///
/// This function:
/// 1. Validates every span against the buffer
/// 2. Rejects the batch if any two edits overlap
/// 3. Splices replacements into a copy, last edit first
///
/// The input buffer is never modified; on error nothing is produced.
pub fn apply_edits(original: &[u8], edits: &[Edit]) -> Result<Vec<u8>> {
    for edit in edits {
        validate_edit_span(edit, original.len())?;
    }
    check_conflicts(edits)?;

    let mut buffer = original.to_vec();
    for edit in sort_edits_descending(edits) {
        buffer.splice(edit.range().byte_range(), edit.new_text.bytes());
    }

    tracing::debug!(
        edits = edits.len(),
        byte_shift = total_byte_shift(edits),
        "applied edits"
    );
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::LineIndex;

    const CONTENT: &str = "The quick brown fox jumps over the lazy dog.";

    fn lines() -> LineIndex {
        LineIndex::new(CONTENT.as_bytes())
    }

    #[test]
    fn test_sort_edits_descending() {
        let lines = lines();
        let edits = vec![
            Edit::update("a", lines.range(10, 20), "a"),
            Edit::update("b", lines.range(35, 39), "b"),
            Edit::update("c", lines.range(21, 30), "c"),
        ];

        let sorted = sort_edits_descending(&edits);

        assert_eq!(sorted[0].path, "b");
        assert_eq!(sorted[1].path, "c");
        assert_eq!(sorted[2].path, "a");
    }

    #[test]
    fn test_apply_edits_multiple() {
        let lines = lines();
        // "quick" (4..9) -> "slow", "lazy" (35..39) -> "active"
        let edits = vec![
            Edit::update("quick", lines.range(4, 9), "slow"),
            Edit::update("lazy", lines.range(35, 39), "active"),
        ];

        let output = apply_edits(CONTENT.as_bytes(), &edits).unwrap();

        assert_eq!(output, b"The slow brown fox jumps over the active dog.");
        assert_eq!(total_byte_shift(&edits), 1);
    }

    #[test]
    fn test_apply_empty_batch_is_identity() {
        let output = apply_edits(CONTENT.as_bytes(), &[]).unwrap();
        assert_eq!(output, CONTENT.as_bytes());
    }

    #[test]
    fn test_inserts_at_same_point_keep_queue_order() {
        let lines = lines();
        let at = lines.position(4);
        let edits = vec![
            Edit::add("one", at, "1"),
            Edit::update("quick", lines.range(4, 9), "Q"),
            Edit::add("two", at, "2"),
        ];

        let output = apply_edits(CONTENT.as_bytes(), &edits).unwrap();

        assert!(output.starts_with(b"The 12Q brown"));
    }

    #[test]
    fn test_overlap_is_conflict() {
        let lines = lines();
        let edits = vec![
            Edit::update("wide", lines.range(4, 15), "x"),
            Edit::delete("narrow", lines.range(10, 12)),
        ];

        let err = apply_edits(CONTENT.as_bytes(), &edits).unwrap_err();

        match err {
            ConfigError::Conflict { first_path, second_path, .. } => {
                assert_eq!(first_path, "wide");
                assert_eq!(second_path, "narrow");
            }
            other => panic!("expected conflict, got {other:?}"),
        }
    }

    #[test]
    fn test_identical_ranges_conflict() {
        let lines = lines();
        let edits = vec![
            Edit::update("first", lines.range(4, 9), "a"),
            Edit::update("second", lines.range(4, 9), "b"),
        ];

        assert!(matches!(check_conflicts(&edits), Err(ConfigError::Conflict { .. })));
    }

    #[test]
    fn test_insert_inside_range_conflicts() {
        let lines = lines();
        let edits = vec![
            Edit::delete("word", lines.range(4, 9)),
            Edit::add("inside", lines.position(6), "!"),
        ];

        assert!(check_conflicts(&edits).is_err());
    }

    #[test]
    fn test_adjacent_ranges_do_not_conflict() {
        let lines = lines();
        let edits = vec![
            Edit::update("left", lines.range(0, 4), ""),
            Edit::update("right", lines.range(4, 10), ""),
            Edit::add("edge", lines.position(10), "X"),
        ];

        assert_eq!(apply_edits(CONTENT.as_bytes(), &edits).unwrap(), b"Xbrown fox jumps over the lazy dog.");
    }

    #[test]
    fn test_out_of_bounds_is_validation_error() {
        let far = Position::new(1, 100, 99);
        let edit = Edit::add("far", far, "x");

        let err = apply_edits(CONTENT.as_bytes(), &[edit]).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { .. }));
    }
}
