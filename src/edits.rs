//! Edit requests for the Docs `batchUpdate` endpoint
//!
//! A conversion produces one insertion request plus a list of style requests
//! addressed at absolute indices. The insertion must be applied before any
//! style request, and style requests are applied in order, in batches no
//! larger than the API's per-call limit.

use serde::Serialize;

use crate::error::{Result, WorkspaceError};
use crate::layout::{assemble, AssembledDocument, IndexRange, InsertionAnchor};
use crate::markdown::{parse_markdown, BlockStyle, Emphasis, ListKind};

/// Default maximum number of requests per `batchUpdate` call
pub const DEFAULT_MAX_BATCH_REQUESTS: usize = 50;

/// A single document edit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum EditRequest {
    #[serde(rename_all = "camelCase")]
    InsertText { index: i64, text: String },
    #[serde(rename_all = "camelCase")]
    DeleteContentRange { range: IndexRange },
    #[serde(rename_all = "camelCase")]
    UpdateParagraphStyle {
        range: IndexRange,
        block_style: BlockStyle,
    },
    #[serde(rename_all = "camelCase")]
    CreateParagraphBullets { range: IndexRange, list_kind: ListKind },
    #[serde(rename_all = "camelCase")]
    UpdateTextStyle { range: IndexRange, emphasis: Emphasis },
}

impl EditRequest {
    /// Reject requests the API would refuse because of their addressing
    ///
    /// Index 0 holds the body's section break, so nothing may start before 1.
    pub fn validate(&self) -> Result<()> {
        match self {
            EditRequest::InsertText { index, text } => {
                if *index < 1 {
                    return Err(WorkspaceError::MalformedEdit(format!(
                        "insert index {} is before the start of the body",
                        index
                    )));
                }
                if text.is_empty() {
                    return Err(WorkspaceError::MalformedEdit(
                        "insert text is empty".to_string(),
                    ));
                }
                Ok(())
            }
            EditRequest::DeleteContentRange { range }
            | EditRequest::UpdateParagraphStyle { range, .. }
            | EditRequest::CreateParagraphBullets { range, .. }
            | EditRequest::UpdateTextStyle { range, .. } => validate_range(range),
        }
    }

    /// Range this request applies to, if it is a range request
    pub fn range(&self) -> Option<IndexRange> {
        match self {
            EditRequest::InsertText { .. } => None,
            EditRequest::DeleteContentRange { range }
            | EditRequest::UpdateParagraphStyle { range, .. }
            | EditRequest::CreateParagraphBullets { range, .. }
            | EditRequest::UpdateTextStyle { range, .. } => Some(*range),
        }
    }
}

fn validate_range(range: &IndexRange) -> Result<()> {
    if range.start_index < 1 {
        return Err(WorkspaceError::MalformedEdit(format!(
            "range [{}, {}) starts before the body",
            range.start_index, range.end_index
        )));
    }
    if range.is_empty() {
        return Err(WorkspaceError::MalformedEdit(format!(
            "range [{}, {}) is empty or inverted",
            range.start_index, range.end_index
        )));
    }
    Ok(())
}

/// Check a batch before it is sent
pub fn validate_batch(batch: &[EditRequest], max_batch_requests: usize) -> Result<()> {
    if batch.len() > max_batch_requests {
        return Err(WorkspaceError::MalformedEdit(format!(
            "batch of {} requests exceeds the limit of {}",
            batch.len(),
            max_batch_requests
        )));
    }
    batch.iter().try_for_each(EditRequest::validate)
}

/// Insertion plus ordered style requests for one conversion
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EditPlan {
    pub insertion: EditRequest,
    pub styling: Vec<EditRequest>,
}

impl EditPlan {
    /// Convert markdown into an edit plan anchored in the target document
    pub fn from_markdown(markdown: &str, anchor: InsertionAnchor) -> Self {
        let segments = parse_markdown(markdown);
        let assembled = assemble(&segments, anchor);
        plan_edits(&assembled)
    }

    /// Validate every request in the plan
    pub fn validate(&self) -> Result<()> {
        self.insertion.validate()?;
        self.styling.iter().try_for_each(EditRequest::validate)
    }

    /// Split style requests into ordered batches of at most `max` requests
    pub fn style_batches(&self, max: usize) -> Result<Vec<Vec<EditRequest>>> {
        if max == 0 {
            return Err(WorkspaceError::MalformedEdit(
                "batch size limit must be at least 1".to_string(),
            ));
        }
        Ok(self.styling.chunks(max).map(<[EditRequest]>::to_vec).collect())
    }
}

/// Build the insertion and style requests for an assembled document
///
/// Per segment, style requests are ordered paragraph style, then bullets,
/// then emphasis.
pub fn plan_edits(assembled: &AssembledDocument<'_>) -> EditPlan {
    let insertion = EditRequest::InsertText {
        index: assembled.insert_index,
        text: assembled.insert_text.clone(),
    };

    let mut styling = Vec::new();
    for placed in &assembled.placed {
        let segment = placed.segment;
        let range = placed.range;

        if segment.block_style != BlockStyle::Plain {
            styling.push(EditRequest::UpdateParagraphStyle {
                range,
                block_style: segment.block_style,
            });
        }

        if segment.list_kind != ListKind::None {
            styling.push(EditRequest::CreateParagraphBullets {
                range,
                list_kind: segment.list_kind,
            });
        }

        for emphasis in &segment.emphasis {
            styling.push(EditRequest::UpdateTextStyle {
                range: IndexRange::new(emphasis.start, emphasis.end).offset(range.start_index),
                emphasis: emphasis.emphasis,
            });
        }
    }

    EditPlan { insertion, styling }
}
