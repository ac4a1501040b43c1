//! Google API clients behind the store traits
//!
//! Reads are retried with exponential backoff on transient errors.
//! `batchUpdate` is never retried: a repeated insertion would duplicate text.

use async_trait::async_trait;
use google_docs1::api::{
    BatchUpdateDocumentRequest, CreateParagraphBulletsRequest, DeleteContentRangeRequest, Document,
    InsertTextRequest, Location, ParagraphStyle, Range, Request, StructuralElement, TextStyle,
    UpdateParagraphStyleRequest, UpdateTextStyleRequest,
};
use google_docs1::FieldMask;
use std::future::Future;
use std::io::Cursor;
use std::time::Duration;
use tracing::{debug, warn};

use crate::auth::{
    DocsHub, DriveApiHub, GmailHub, WorkspaceHubs, DOCS_SCOPE, DRIVE_SCOPE, GMAIL_READONLY_SCOPE,
};
use crate::docs::DocumentStore;
use crate::drive::DriveStore;
use crate::edits::EditRequest;
use crate::error::{Result, WorkspaceError};
use crate::gmail::{MailStore, MessageFormat};
use crate::layout::IndexRange;
use crate::markdown::Emphasis;
use crate::models::{
    DocumentSnapshot, DriveFile, MailMessage, MessageHeader, MessagePart, StructuralBlock,
};

/// Upper bound for a single API call
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Retries after the first attempt for read-only calls
const MAX_READ_RETRIES: u32 = 3;

const DRIVE_FILE_FIELDS: &str = "id,name,mimeType,webViewLink";

/// Check if an error is retryable
fn should_retry(error: &WorkspaceError) -> bool {
    matches!(
        error,
        WorkspaceError::ServerError { .. }
            | WorkspaceError::RateLimitExceeded { .. }
            | WorkspaceError::NetworkError(_)
    )
}

/// Execute an async operation with exponential backoff retry
async fn with_retry<T, F, Fut>(operation_name: &str, max_retries: u32, mut operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut delay = Duration::from_secs(1);
    let mut attempts = 0;

    loop {
        attempts += 1;
        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) if should_retry(&e) && attempts <= max_retries => {
                let wait = match e {
                    WorkspaceError::RateLimitExceeded { retry_after } => {
                        Duration::from_secs(retry_after).max(delay)
                    }
                    _ => delay,
                };
                warn!(
                    "{} failed (attempt {}/{}): {}. Retrying in {:?}...",
                    operation_name,
                    attempts,
                    max_retries + 1,
                    e,
                    wait
                );
                tokio::time::sleep(wait).await;
                delay = std::cmp::min(delay * 2, Duration::from_secs(30));
            }
            Err(e) => return Err(e),
        }
    }
}

/// Wrap an API call in a timeout to prevent indefinite hangs
async fn with_timeout<T, Fut>(operation_name: &str, call: Fut) -> Result<T>
where
    Fut: Future<Output = Result<T>>,
{
    match tokio::time::timeout(REQUEST_TIMEOUT, call).await {
        Ok(result) => result,
        Err(_) => Err(WorkspaceError::NetworkError(format!(
            "{} timed out after {:?}",
            operation_name, REQUEST_TIMEOUT
        ))),
    }
}

/// Docs API client
pub struct ProductionDocsClient {
    hub: DocsHub,
}

impl ProductionDocsClient {
    pub fn new(hub: DocsHub) -> Self {
        Self { hub }
    }
}

#[async_trait]
impl DocumentStore for ProductionDocsClient {
    async fn get(&self, document_id: &str) -> Result<DocumentSnapshot> {
        let document = with_retry("documents.get", MAX_READ_RETRIES, || async {
            with_timeout("documents.get", async {
                let (_, document) = self
                    .hub
                    .documents()
                    .get(document_id)
                    .add_scope(DOCS_SCOPE)
                    .doit()
                    .await?;
                Ok::<_, WorkspaceError>(document)
            })
            .await
        })
        .await
        .map_err(|e| match e {
            WorkspaceError::NotFound(_) => WorkspaceError::DocumentNotFound {
                id: document_id.to_string(),
            },
            other => other,
        })?;

        Ok(document_snapshot(document, document_id))
    }

    async fn batch_update(&self, document_id: &str, requests: Vec<EditRequest>) -> Result<()> {
        let count = requests.len();
        let requests = requests
            .iter()
            .map(api_request)
            .collect::<Result<Vec<Request>>>()?;

        let body = BatchUpdateDocumentRequest {
            requests: Some(requests),
            ..Default::default()
        };

        with_timeout("documents.batchUpdate", async {
            self.hub
                .documents()
                .batch_update(body, document_id)
                .add_scope(DOCS_SCOPE)
                .doit()
                .await?;
            Ok::<_, WorkspaceError>(())
        })
        .await?;

        debug!("batchUpdate applied {} requests to {}", count, document_id);
        Ok(())
    }
}

fn api_index(value: i64) -> Result<i32> {
    i32::try_from(value).map_err(|_| {
        WorkspaceError::MalformedEdit(format!("index {} is out of range for the Docs API", value))
    })
}

fn api_range(range: &IndexRange) -> Result<Range> {
    Ok(Range {
        start_index: Some(api_index(range.start_index)?),
        end_index: Some(api_index(range.end_index)?),
        ..Default::default()
    })
}

/// Convert an edit into the Docs API request shape
pub fn api_request(request: &EditRequest) -> Result<Request> {
    let converted = match request {
        EditRequest::InsertText { index, text } => Request {
            insert_text: Some(InsertTextRequest {
                location: Some(Location {
                    index: Some(api_index(*index)?),
                    ..Default::default()
                }),
                text: Some(text.clone()),
                ..Default::default()
            }),
            ..Default::default()
        },
        EditRequest::DeleteContentRange { range } => Request {
            delete_content_range: Some(DeleteContentRangeRequest {
                range: Some(api_range(range)?),
                ..Default::default()
            }),
            ..Default::default()
        },
        EditRequest::UpdateParagraphStyle { range, block_style } => Request {
            update_paragraph_style: Some(UpdateParagraphStyleRequest {
                range: Some(api_range(range)?),
                paragraph_style: Some(ParagraphStyle {
                    named_style_type: Some(block_style.named_style_type().to_string()),
                    ..Default::default()
                }),
                fields: Some(FieldMask::new(&["namedStyleType"])),
                ..Default::default()
            }),
            ..Default::default()
        },
        EditRequest::CreateParagraphBullets { range, list_kind } => {
            let preset = list_kind.bullet_preset().ok_or_else(|| {
                WorkspaceError::MalformedEdit("bullets requested for a non-list paragraph".to_string())
            })?;
            Request {
                create_paragraph_bullets: Some(CreateParagraphBulletsRequest {
                    range: Some(api_range(range)?),
                    bullet_preset: Some(preset.to_string()),
                    ..Default::default()
                }),
                ..Default::default()
            }
        }
        EditRequest::UpdateTextStyle { range, emphasis } => {
            let (text_style, field) = match emphasis {
                Emphasis::Bold => (
                    TextStyle {
                        bold: Some(true),
                        ..Default::default()
                    },
                    "bold",
                ),
                Emphasis::Italic => (
                    TextStyle {
                        italic: Some(true),
                        ..Default::default()
                    },
                    "italic",
                ),
            };
            Request {
                update_text_style: Some(UpdateTextStyleRequest {
                    range: Some(api_range(range)?),
                    text_style: Some(text_style),
                    fields: Some(FieldMask::new(&[field])),
                    ..Default::default()
                }),
                ..Default::default()
            }
        }
    };
    Ok(converted)
}

/// Reduce a Docs API document to a snapshot
///
/// The end index is the largest element end index in the body, or 1 for an
/// empty body.
pub fn document_snapshot(document: Document, requested_id: &str) -> DocumentSnapshot {
    let content = document
        .body
        .and_then(|body| body.content)
        .unwrap_or_default();

    let end_index = content
        .iter()
        .filter_map(|element| element.end_index)
        .max()
        .map(i64::from)
        .unwrap_or(1);

    DocumentSnapshot {
        document_id: document
            .document_id
            .unwrap_or_else(|| requested_id.to_string()),
        title: document.title.unwrap_or_default(),
        revision_id: document.revision_id,
        body: structural_blocks(&content),
        end_index,
    }
}

fn structural_blocks(content: &[StructuralElement]) -> Vec<StructuralBlock> {
    content.iter().map(structural_block).collect()
}

fn structural_block(element: &StructuralElement) -> StructuralBlock {
    if let Some(paragraph) = &element.paragraph {
        let runs = paragraph
            .elements
            .iter()
            .flatten()
            .filter_map(|e| e.text_run.as_ref())
            .filter_map(|run| run.content.clone())
            .collect();
        return StructuralBlock::Paragraph(runs);
    }

    if let Some(table) = &element.table {
        let rows = table
            .table_rows
            .iter()
            .flatten()
            .map(|row| {
                row.table_cells
                    .iter()
                    .flatten()
                    .map(|cell| structural_blocks(cell.content.as_deref().unwrap_or_default()))
                    .collect()
            })
            .collect();
        return StructuralBlock::Table(rows);
    }

    if let Some(toc) = &element.table_of_contents {
        return StructuralBlock::TableOfContents(structural_blocks(
            toc.content.as_deref().unwrap_or_default(),
        ));
    }

    StructuralBlock::Other
}

/// Drive API client
pub struct ProductionDriveClient {
    hub: DriveApiHub,
}

impl ProductionDriveClient {
    pub fn new(hub: DriveApiHub) -> Self {
        Self { hub }
    }
}

fn drive_file(file: google_drive3::api::File) -> Result<DriveFile> {
    let id = file
        .id
        .ok_or_else(|| WorkspaceError::ApiError("Drive returned a file without an id".to_string()))?;
    Ok(DriveFile {
        id,
        name: file.name.unwrap_or_default(),
        mime_type: file.mime_type.unwrap_or_default(),
        web_view_link: file.web_view_link,
    })
}

#[async_trait]
impl DriveStore for ProductionDriveClient {
    async fn get_file(&self, file_id: &str) -> Result<DriveFile> {
        let file = with_retry("files.get", MAX_READ_RETRIES, || async {
            with_timeout("files.get", async {
                let (_, file) = self
                    .hub
                    .files()
                    .get(file_id)
                    .supports_all_drives(true)
                    .param("fields", DRIVE_FILE_FIELDS)
                    .add_scope(DRIVE_SCOPE)
                    .doit()
                    .await?;
                Ok::<_, WorkspaceError>(file)
            })
            .await
        })
        .await?;

        drive_file(file)
    }

    async fn create_file(
        &self,
        name: &str,
        mime_type: &str,
        parent: Option<String>,
    ) -> Result<DriveFile> {
        let request = google_drive3::api::File {
            name: Some(name.to_string()),
            mime_type: Some(mime_type.to_string()),
            parents: parent.map(|p| vec![p]),
            ..Default::default()
        };

        let (_, file) = with_timeout("files.create", async {
            let created = self
                .hub
                .files()
                .create(request)
                .supports_all_drives(true)
                .param("fields", DRIVE_FILE_FIELDS)
                .add_scope(DRIVE_SCOPE)
                .upload(Cursor::new(Vec::<u8>::new()), mime::APPLICATION_OCTET_STREAM)
                .await?;
            Ok::<_, WorkspaceError>(created)
        })
        .await?;

        drive_file(file)
    }

    async fn copy_file(&self, file_id: &str, name: &str, parent: Option<String>) -> Result<DriveFile> {
        let request = google_drive3::api::File {
            name: Some(name.to_string()),
            parents: parent.map(|p| vec![p]),
            ..Default::default()
        };

        let (_, file) = with_timeout("files.copy", async {
            let copied = self
                .hub
                .files()
                .copy(request, file_id)
                .supports_all_drives(true)
                .param("fields", DRIVE_FILE_FIELDS)
                .add_scope(DRIVE_SCOPE)
                .doit()
                .await?;
            Ok::<_, WorkspaceError>(copied)
        })
        .await?;

        drive_file(file)
    }

    async fn export_file(&self, file_id: &str, mime_type: &str) -> Result<Vec<u8>> {
        let data = with_retry("files.export", MAX_READ_RETRIES, || async {
            with_timeout("files.export", async {
                let response = self
                    .hub
                    .files()
                    .export(file_id, mime_type)
                    .add_scope(DRIVE_SCOPE)
                    .doit()
                    .await?;
                let bytes = google_drive3::common::to_bytes(response.into_body())
                    .await
                    .ok_or_else(|| {
                        WorkspaceError::NetworkError("Failed to read export body".to_string())
                    })?;
                Ok::<_, WorkspaceError>(bytes.to_vec())
            })
            .await
        })
        .await?;

        debug!("Exported {} as {} ({} bytes)", file_id, mime_type, data.len());
        Ok(data)
    }
}

/// Gmail API client
pub struct ProductionMailClient {
    hub: GmailHub,
}

impl ProductionMailClient {
    pub fn new(hub: GmailHub) -> Self {
        Self { hub }
    }

    /// Email address of the signed-in account
    pub async fn email_address(&self) -> Result<String> {
        let (_, profile) = with_timeout("users.getProfile", async {
            let profile = self
                .hub
                .users()
                .get_profile("me")
                .add_scope(GMAIL_READONLY_SCOPE)
                .doit()
                .await?;
            Ok::<_, WorkspaceError>(profile)
        })
        .await?;

        Ok(profile.email_address.unwrap_or_default())
    }
}

#[async_trait]
impl MailStore for ProductionMailClient {
    async fn get_message(
        &self,
        message_id: &str,
        format: MessageFormat,
        metadata_headers: Vec<String>,
    ) -> Result<MailMessage> {
        let message = with_retry("messages.get", MAX_READ_RETRIES, || async {
            with_timeout("messages.get", async {
                let mut call = self
                    .hub
                    .users()
                    .messages_get("me", message_id)
                    .format(format.as_str());
                for header in &metadata_headers {
                    call = call.add_metadata_headers(header);
                }
                let (_, message) = call.add_scope(GMAIL_READONLY_SCOPE).doit().await?;
                Ok::<_, WorkspaceError>(message)
            })
            .await
        })
        .await?;

        mail_message(message)
    }
}

/// Convert a Gmail API message, decoding text bodies as lossy UTF-8
pub fn mail_message(message: google_gmail1::api::Message) -> Result<MailMessage> {
    let id = message
        .id
        .ok_or_else(|| WorkspaceError::InvalidMessageFormat("Missing message ID".to_string()))?;

    Ok(MailMessage {
        id,
        thread_id: message.thread_id.unwrap_or_default(),
        label_ids: message.label_ids.unwrap_or_default(),
        snippet: message.snippet,
        payload: message.payload.map(message_part),
        raw: message
            .raw
            .map(|raw| String::from_utf8_lossy(&raw).into_owned()),
    })
}

fn message_part(part: google_gmail1::api::MessagePart) -> MessagePart {
    let mime_type = part.mime_type.unwrap_or_default();
    let body = if mime_type.to_ascii_lowercase().starts_with("text/") {
        part.body
            .and_then(|b| b.data)
            .map(|data| String::from_utf8_lossy(&data).into_owned())
    } else {
        None
    };

    MessagePart {
        headers: part
            .headers
            .unwrap_or_default()
            .into_iter()
            .filter_map(|h| match (h.name, h.value) {
                (Some(name), value) => Some(MessageHeader {
                    name,
                    value: value.unwrap_or_default(),
                }),
                (None, _) => None,
            })
            .collect(),
        parts: part
            .parts
            .unwrap_or_default()
            .into_iter()
            .map(message_part)
            .collect(),
        mime_type,
        body,
    }
}

/// Store clients built from one set of authenticated hubs
pub struct WorkspaceClients {
    pub docs: ProductionDocsClient,
    pub drive: ProductionDriveClient,
    pub mail: ProductionMailClient,
}

impl WorkspaceClients {
    pub fn new(hubs: WorkspaceHubs) -> Self {
        Self {
            docs: ProductionDocsClient::new(hubs.docs),
            drive: ProductionDriveClient::new(hubs.drive),
            mail: ProductionMailClient::new(hubs.gmail),
        }
    }
}
