//! Google Docs operations: markdown write/append/clear and text extraction

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::edits::{validate_batch, EditPlan, EditRequest};
use crate::error::{Result, WorkspaceError};
use crate::layout::{IndexRange, InsertionAnchor};
use crate::models::{DocumentSnapshot, StructuralBlock};

/// Mime type of native Google Docs in Drive
pub const MIME_GOOGLE_DOC: &str = "application/vnd.google-apps.document";

/// Progress callback for style batches: `(applied, total)`
pub type ProgressCallback = Arc<dyn Fn(usize, usize) + Send + Sync>;

/// Document storage operations the markdown writer needs
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch a document. Fails with `DocumentNotFound` for unknown IDs.
    async fn get(&self, document_id: &str) -> Result<DocumentSnapshot>;

    /// Apply requests in order as one atomic batch
    async fn batch_update(&self, document_id: &str, requests: Vec<EditRequest>) -> Result<()>;
}

#[async_trait]
impl<T: DocumentStore + ?Sized> DocumentStore for Arc<T> {
    async fn get(&self, document_id: &str) -> Result<DocumentSnapshot> {
        (**self).get(document_id).await
    }

    async fn batch_update(&self, document_id: &str, requests: Vec<EditRequest>) -> Result<()> {
        (**self).batch_update(document_id, requests).await
    }
}

#[async_trait]
impl<T: DocumentStore + ?Sized> DocumentStore for &T {
    async fn get(&self, document_id: &str) -> Result<DocumentSnapshot> {
        (**self).get(document_id).await
    }

    async fn batch_update(&self, document_id: &str, requests: Vec<EditRequest>) -> Result<()> {
        (**self).batch_update(document_id, requests).await
    }
}

/// Phase of a markdown write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WritePhase {
    /// Inserting the converted text in one request
    Inserting,
    /// Applying paragraph, list and emphasis styles in batches
    Styling,
}

/// Writes converted markdown into documents through a `DocumentStore`
pub struct DocsWriter<S> {
    store: S,
    max_batch_requests: usize,
    on_progress: Option<ProgressCallback>,
}

impl<S: DocumentStore> DocsWriter<S> {
    /// Create a writer that sends at most `max_batch_requests` style
    /// requests per `batch_update` call
    pub fn new(store: S, max_batch_requests: usize) -> Self {
        Self {
            store,
            max_batch_requests,
            on_progress: None,
        }
    }

    /// Report style batch progress through `callback`
    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.on_progress = Some(callback);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Replace the document's content with converted markdown
    ///
    /// Returns the document ID.
    pub async fn write(&self, document_id: &str, markdown: &str) -> Result<String> {
        let document_id = require_document_id(document_id)?;
        let plan = EditPlan::from_markdown(markdown, InsertionAnchor::Index(1));
        plan.validate()?;

        let snapshot = self.store.get(document_id).await?;
        self.clear_content(document_id, &snapshot).await?;
        self.apply(document_id, &plan).await?;

        info!("Wrote {} bytes of markdown to document {}", markdown.len(), document_id);
        Ok(document_id.to_string())
    }

    /// Add converted markdown after the document's existing content
    ///
    /// Returns the document ID.
    pub async fn append(&self, document_id: &str, markdown: &str) -> Result<String> {
        let document_id = require_document_id(document_id)?;
        let snapshot = self.store.get(document_id).await?;

        let anchor = InsertionAnchor::append_at(snapshot.end_index);
        debug!("Appending at {:?} (document end index {})", anchor, snapshot.end_index);
        let plan = EditPlan::from_markdown(markdown, anchor);
        plan.validate()?;
        self.apply(document_id, &plan).await?;

        info!("Appended {} bytes of markdown to document {}", markdown.len(), document_id);
        Ok(document_id.to_string())
    }

    /// Delete all content, keeping the mandatory trailing newline
    ///
    /// Returns the document ID.
    pub async fn clear(&self, document_id: &str) -> Result<String> {
        let document_id = require_document_id(document_id)?;
        let snapshot = self.store.get(document_id).await?;
        self.clear_content(document_id, &snapshot).await?;
        Ok(document_id.to_string())
    }

    async fn clear_content(&self, document_id: &str, snapshot: &DocumentSnapshot) -> Result<()> {
        // Only the final newline left
        if snapshot.end_index <= 2 {
            debug!("Document {} is already empty", document_id);
            return Ok(());
        }

        let delete = EditRequest::DeleteContentRange {
            range: IndexRange::new(1, snapshot.end_index - 1),
        };
        delete.validate()?;
        self.store.batch_update(document_id, vec![delete]).await?;
        debug!(
            "Cleared document {} (deleted [1, {}))",
            document_id,
            snapshot.end_index - 1
        );
        Ok(())
    }

    /// Insert the text, then apply styles batch by batch
    async fn apply(&self, document_id: &str, plan: &EditPlan) -> Result<()> {
        let batches = plan.style_batches(self.max_batch_requests)?;
        batches
            .iter()
            .try_for_each(|batch| validate_batch(batch, self.max_batch_requests))?;
        let total = batches.len();

        debug!(phase = ?WritePhase::Inserting, "Inserting converted text into {}", document_id);
        self.store
            .batch_update(document_id, vec![plan.insertion.clone()])
            .await?;

        debug!(
            phase = ?WritePhase::Styling,
            "Applying {} style requests in {} batches",
            plan.styling.len(),
            total
        );
        for (applied, batch) in batches.into_iter().enumerate() {
            if let Err(source) = self.store.batch_update(document_id, batch).await {
                warn!(
                    "Style batch {}/{} failed for document {}: {}",
                    applied + 1,
                    total,
                    document_id,
                    source
                );
                return Err(WorkspaceError::StylingIncomplete {
                    document_id: document_id.to_string(),
                    applied_batches: applied,
                    total_batches: total,
                    source: Box::new(source),
                });
            }

            if let Some(callback) = &self.on_progress {
                callback(applied + 1, total);
            }
        }

        Ok(())
    }
}

/// Trimmed document ID, or a `Usage` error when empty
pub fn require_document_id(document_id: &str) -> Result<&str> {
    let id = document_id.trim();
    if id.is_empty() {
        return Err(WorkspaceError::Usage("empty docId".to_string()));
    }
    Ok(id)
}

/// Browser link for a document, `None` for an empty ID
pub fn web_view_link(document_id: &str) -> Option<String> {
    let id = document_id.trim();
    if id.is_empty() {
        return None;
    }
    Some(format!("https://docs.google.com/document/d/{}/edit", id))
}

/// Extract the document's plain text
///
/// Table cells are separated by tabs and rows by newlines. Output stops after
/// `max_bytes` bytes, cut back to a UTF-8 boundary; 0 means unlimited.
pub fn plain_text(snapshot: &DocumentSnapshot, max_bytes: usize) -> String {
    let mut buf = LimitedText::new(max_bytes);
    for block in &snapshot.body {
        if !append_block_text(&mut buf, block) {
            break;
        }
    }
    buf.text
}

struct LimitedText {
    text: String,
    max_bytes: usize,
}

impl LimitedText {
    fn new(max_bytes: usize) -> Self {
        Self {
            text: String::new(),
            max_bytes,
        }
    }

    /// Append as much of `s` as fits. Returns false once the limit is hit.
    fn push(&mut self, s: &str) -> bool {
        if self.max_bytes == 0 {
            self.text.push_str(s);
            return true;
        }

        let remaining = self.max_bytes.saturating_sub(self.text.len());
        if remaining == 0 {
            return false;
        }
        if s.len() > remaining {
            let mut cut = remaining;
            while !s.is_char_boundary(cut) {
                cut -= 1;
            }
            self.text.push_str(&s[..cut]);
            return false;
        }
        self.text.push_str(s);
        true
    }
}

fn append_block_text(buf: &mut LimitedText, block: &StructuralBlock) -> bool {
    match block {
        StructuralBlock::Paragraph(runs) => runs.iter().all(|run| buf.push(run)),
        StructuralBlock::Table(rows) => {
            for (row_idx, row) in rows.iter().enumerate() {
                if row_idx > 0 && !buf.push("\n") {
                    return false;
                }
                for (cell_idx, cell) in row.iter().enumerate() {
                    if cell_idx > 0 && !buf.push("\t") {
                        return false;
                    }
                    if !cell.iter().all(|content| append_block_text(buf, content)) {
                        return false;
                    }
                }
            }
            true
        }
        StructuralBlock::TableOfContents(content) => {
            content.iter().all(|block| append_block_text(buf, block))
        }
        StructuralBlock::Other => true,
    }
}
