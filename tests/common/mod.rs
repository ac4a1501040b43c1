//! Common test utilities and fixtures

#![allow(dead_code)]

use async_trait::async_trait;
use gworkspace::docs::DocumentStore;
use gworkspace::edits::EditRequest;
use gworkspace::error::{Result, WorkspaceError};
use gworkspace::layout::IndexRange;
use gworkspace::models::{DocumentSnapshot, StructuralBlock};
use std::sync::Mutex;

/// In-memory document that applies edit requests the way the Docs API does
///
/// Text is held as UTF-16 code units; index 1 is the first unit of the body
/// and the body always ends with a newline. Style requests are recorded with
/// their ranges and shifted by later insertions and deletions.
pub struct FakeDocumentStore {
    document_id: String,
    state: Mutex<FakeState>,
    fail_on_call: Option<usize>,
}

#[derive(Default)]
struct FakeState {
    text: Vec<u16>,
    styles: Vec<EditRequest>,
    calls: Vec<Vec<EditRequest>>,
}

impl FakeDocumentStore {
    /// A document with body text `body` (a trailing newline is added if missing)
    pub fn new(document_id: &str, body: &str) -> Self {
        let mut body = body.to_string();
        if !body.ends_with('\n') {
            body.push('\n');
        }
        Self {
            document_id: document_id.to_string(),
            state: Mutex::new(FakeState {
                text: body.encode_utf16().collect(),
                ..Default::default()
            }),
            fail_on_call: None,
        }
    }

    pub fn empty(document_id: &str) -> Self {
        Self::new(document_id, "\n")
    }

    /// Fail the nth `batch_update` call (1-based) with a server error
    pub fn failing_on_call(mut self, call: usize) -> Self {
        self.fail_on_call = Some(call);
        self
    }

    pub fn text(&self) -> String {
        String::from_utf16_lossy(&self.state.lock().unwrap().text)
    }

    pub fn styles(&self) -> Vec<EditRequest> {
        self.state.lock().unwrap().styles.clone()
    }

    /// Every successful or failed `batch_update` payload, in call order
    pub fn calls(&self) -> Vec<Vec<EditRequest>> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn end_index(&self) -> i64 {
        1 + self.state.lock().unwrap().text.len() as i64
    }
}

fn bad_request(message: String) -> WorkspaceError {
    WorkspaceError::BadRequest(message)
}

fn with_range(request: &EditRequest, range: IndexRange) -> EditRequest {
    match request.clone() {
        EditRequest::UpdateParagraphStyle { block_style, .. } => {
            EditRequest::UpdateParagraphStyle { range, block_style }
        }
        EditRequest::CreateParagraphBullets { list_kind, .. } => {
            EditRequest::CreateParagraphBullets { range, list_kind }
        }
        EditRequest::UpdateTextStyle { emphasis, .. } => {
            EditRequest::UpdateTextStyle { range, emphasis }
        }
        other => other,
    }
}

impl FakeState {
    fn end_index(&self) -> i64 {
        1 + self.text.len() as i64
    }

    fn apply(&mut self, request: &EditRequest) -> Result<()> {
        let end = self.end_index();
        match request {
            EditRequest::InsertText { index, text } => {
                if *index < 1 || *index > end - 1 {
                    return Err(bad_request(format!(
                        "insertion index {} outside [1, {}]",
                        index,
                        end - 1
                    )));
                }
                let units: Vec<u16> = text.encode_utf16().collect();
                let len = units.len() as i64;
                let at = (*index - 1) as usize;
                self.text.splice(at..at, units);
                for style in &mut self.styles {
                    if let Some(range) = style.range() {
                        if range.start_index >= *index {
                            *style = with_range(style, range.offset(len));
                        }
                    }
                }
            }
            EditRequest::DeleteContentRange { range } => {
                if range.end_index > end - 1 {
                    return Err(bad_request(
                        "cannot delete the final newline of the body".to_string(),
                    ));
                }
                let start = (range.start_index - 1) as usize;
                let stop = (range.end_index - 1) as usize;
                self.text.drain(start..stop);

                let removed = range.len();
                self.styles.retain(|style| {
                    style.range().map_or(true, |r| {
                        r.end_index <= range.start_index || r.start_index >= range.end_index
                    })
                });
                for style in &mut self.styles {
                    if let Some(r) = style.range() {
                        if r.start_index >= range.end_index {
                            *style = with_range(style, r.offset(-removed));
                        }
                    }
                }
            }
            other => {
                let Some(range) = other.range() else {
                    return Err(bad_request("request without a range".to_string()));
                };
                if range.end_index > end {
                    return Err(bad_request(format!(
                        "range [{}, {}) past the end of the body ({})",
                        range.start_index, range.end_index, end
                    )));
                }
                self.styles.push(other.clone());
            }
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for FakeDocumentStore {
    async fn get(&self, document_id: &str) -> Result<DocumentSnapshot> {
        if document_id != self.document_id {
            return Err(WorkspaceError::DocumentNotFound {
                id: document_id.to_string(),
            });
        }

        let state = self.state.lock().unwrap();
        let text = String::from_utf16_lossy(&state.text);
        let body = text
            .split_inclusive('\n')
            .map(|line| StructuralBlock::Paragraph(vec![line.to_string()]))
            .collect();

        Ok(DocumentSnapshot {
            document_id: self.document_id.clone(),
            title: "Fake".to_string(),
            revision_id: None,
            body,
            end_index: state.end_index(),
        })
    }

    async fn batch_update(&self, document_id: &str, requests: Vec<EditRequest>) -> Result<()> {
        if document_id != self.document_id {
            return Err(WorkspaceError::DocumentNotFound {
                id: document_id.to_string(),
            });
        }

        let mut state = self.state.lock().unwrap();
        state.calls.push(requests.clone());
        if self.fail_on_call == Some(state.calls.len()) {
            return Err(WorkspaceError::ServerError {
                status: 503,
                message: "HTTP 503: Service Unavailable".to_string(),
            });
        }

        // Whole-batch semantics: apply to a copy, commit only on success
        let mut staged = FakeState {
            text: state.text.clone(),
            styles: state.styles.clone(),
            calls: Vec::new(),
        };
        for request in &requests {
            staged.apply(request)?;
        }
        state.text = staged.text;
        state.styles = staged.styles;
        Ok(())
    }
}
