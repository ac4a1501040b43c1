//! Document assembly: places converted segments at absolute document indices
//!
//! The whole converted text is inserted in one request, so every segment's
//! final position can be computed up front. Style requests built from these
//! positions never need the document to be re-read after insertion.

use serde::Serialize;

use crate::markdown::Segment;

/// Half-open range of absolute document indices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexRange {
    pub start_index: i64,
    pub end_index: i64,
}

impl IndexRange {
    pub fn new(start_index: i64, end_index: i64) -> Self {
        Self {
            start_index,
            end_index,
        }
    }

    pub fn len(&self) -> i64 {
        self.end_index - self.start_index
    }

    pub fn is_empty(&self) -> bool {
        self.len() <= 0
    }

    /// Shift a segment-relative range by the segment's absolute start
    pub fn offset(&self, by: i64) -> Self {
        Self::new(self.start_index + by, self.end_index + by)
    }
}

/// Where converted content goes in the target document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertionAnchor {
    /// Insert at this index; the first segment starts here
    Index(i64),
    /// Add paragraphs after the last one in a non-empty document whose body
    /// ends at `end_index`
    ///
    /// The last valid insertion point is `end_index - 1`, in front of the
    /// document's final newline. Inserting a paragraph break there first and
    /// reusing that final newline for the last segment keeps the existing
    /// last paragraph intact. Segments then start at `end_index`.
    AfterLastParagraph { end_index: i64 },
}

impl InsertionAnchor {
    /// Anchor for appending to a document whose body ends at `end_index`
    ///
    /// A document holding only its mandatory trailing newline (`end_index`
    /// of 2 or less) is treated as empty.
    pub fn append_at(end_index: i64) -> Self {
        if end_index <= 2 {
            InsertionAnchor::Index(1)
        } else {
            InsertionAnchor::AfterLastParagraph { end_index }
        }
    }
}

/// A segment together with its absolute position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedSegment<'a> {
    pub segment: &'a Segment,
    pub range: IndexRange,
}

/// The text to insert and where each segment ends up
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledDocument<'a> {
    /// Index the insertion request targets
    pub insert_index: i64,
    /// Text of the insertion request
    pub insert_text: String,
    pub placed: Vec<PlacedSegment<'a>>,
}

impl AssembledDocument<'_> {
    /// Range covered by all segments once inserted
    pub fn span(&self) -> Option<IndexRange> {
        let first = self.placed.first()?;
        let last = self.placed.last()?;
        Some(IndexRange::new(first.range.start_index, last.range.end_index))
    }
}

/// Concatenate segment texts and compute contiguous absolute ranges
pub fn assemble(segments: &[Segment], anchor: InsertionAnchor) -> AssembledDocument<'_> {
    let blob: String = segments.iter().map(|s| s.text.as_str()).collect();

    let (insert_index, insert_text, first_start) = match anchor {
        InsertionAnchor::Index(index) => (index, blob, index),
        InsertionAnchor::AfterLastParagraph { end_index } => {
            let body = blob.strip_suffix('\n').unwrap_or(&blob);
            (end_index - 1, format!("\n{}", body), end_index)
        }
    };

    let mut start = first_start;
    let placed = segments
        .iter()
        .map(|segment| {
            let end = start + segment.utf16_len();
            let range = IndexRange::new(start, end);
            start = end;
            PlacedSegment { segment, range }
        })
        .collect();

    AssembledDocument {
        insert_index,
        insert_text,
        placed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markdown::{parse_markdown, utf16_len};

    #[test]
    fn test_assemble_at_index() {
        let segments = parse_markdown("# Title\n\nBody **bold** text");
        let doc = assemble(&segments, InsertionAnchor::Index(1));

        assert_eq!(doc.insert_index, 1);
        assert_eq!(doc.insert_text, "Title\n\nBody bold text\n");

        let ranges: Vec<_> = doc.placed.iter().map(|p| p.range).collect();
        assert_eq!(
            ranges,
            vec![
                IndexRange::new(1, 7),
                IndexRange::new(7, 8),
                IndexRange::new(8, 23),
            ]
        );
    }

    #[test]
    fn test_ranges_are_contiguous_and_cover_text() {
        let segments = parse_markdown("a😀\n- b\n## ç\n1. **d**");
        let doc = assemble(&segments, InsertionAnchor::Index(10));

        for pair in doc.placed.windows(2) {
            assert_eq!(pair[0].range.end_index, pair[1].range.start_index);
        }
        let span = doc.span().unwrap();
        assert_eq!(span.start_index, 10);
        assert_eq!(span.len(), utf16_len(&doc.insert_text));
    }

    #[test]
    fn test_assemble_after_last_paragraph() {
        let segments = parse_markdown("- x\n- y");
        let doc = assemble(
            &segments,
            InsertionAnchor::AfterLastParagraph { end_index: 12 },
        );

        assert_eq!(doc.insert_index, 11);
        assert_eq!(doc.insert_text, "\nx\ny");
        assert_eq!(doc.placed[0].range, IndexRange::new(12, 14));
        assert_eq!(doc.placed[1].range, IndexRange::new(14, 16));
    }

    #[test]
    fn test_append_anchor_for_empty_document() {
        assert_eq!(InsertionAnchor::append_at(1), InsertionAnchor::Index(1));
        assert_eq!(InsertionAnchor::append_at(2), InsertionAnchor::Index(1));
        assert_eq!(
            InsertionAnchor::append_at(3),
            InsertionAnchor::AfterLastParagraph { end_index: 3 }
        );
    }

    #[test]
    fn test_index_range_helpers() {
        let range = IndexRange::new(3, 7);
        assert_eq!(range.len(), 4);
        assert!(!range.is_empty());
        assert_eq!(range.offset(10), IndexRange::new(13, 17));
        assert!(IndexRange::new(5, 5).is_empty());
    }
}
