//! Drive operations on Google Docs: create, copy and export

use async_trait::async_trait;
use clap::ValueEnum;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info};

use crate::docs::MIME_GOOGLE_DOC;
use crate::error::{Result, WorkspaceError};
use crate::models::DriveFile;

/// Drive file operations used by the docs commands
#[async_trait]
pub trait DriveStore: Send + Sync {
    /// Fetch file metadata
    async fn get_file(&self, file_id: &str) -> Result<DriveFile>;

    /// Create an empty file of the given mime type
    async fn create_file(
        &self,
        name: &str,
        mime_type: &str,
        parent: Option<String>,
    ) -> Result<DriveFile>;

    /// Copy a file under a new name
    async fn copy_file(&self, file_id: &str, name: &str, parent: Option<String>)
        -> Result<DriveFile>;

    /// Export a Google Workspace file to `mime_type`
    async fn export_file(&self, file_id: &str, mime_type: &str) -> Result<Vec<u8>>;
}

/// Export formats for Google Docs
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Pdf,
    Docx,
    Txt,
}

impl ExportFormat {
    pub fn mime_type(&self) -> &'static str {
        match self {
            ExportFormat::Pdf => "application/pdf",
            ExportFormat::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            ExportFormat::Txt => "text/plain",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Pdf => "pdf",
            ExportFormat::Docx => "docx",
            ExportFormat::Txt => "txt",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = WorkspaceError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "pdf" => Ok(ExportFormat::Pdf),
            "docx" => Ok(ExportFormat::Docx),
            "txt" => Ok(ExportFormat::Txt),
            other => Err(WorkspaceError::Usage(format!(
                "invalid export format: {:?} (expected pdf|docx|txt)",
                other
            ))),
        }
    }
}

/// Result of an export written to disk
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportedFile {
    pub file: DriveFile,
    pub path: PathBuf,
    pub format: ExportFormat,
    pub bytes: usize,
}

fn require(value: &str, what: &str) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(WorkspaceError::Usage(format!("empty {}", what)));
    }
    Ok(value.to_string())
}

fn optional(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Fetch a file and check that it is a Google Doc
async fn require_google_doc<S: DriveStore + ?Sized>(store: &S, file_id: &str) -> Result<DriveFile> {
    let file = store.get_file(file_id).await.map_err(|e| {
        if e.is_not_found() {
            WorkspaceError::DocumentNotFound {
                id: file_id.to_string(),
            }
        } else {
            e
        }
    })?;

    if file.mime_type != MIME_GOOGLE_DOC {
        return Err(WorkspaceError::Usage(format!(
            "file is not a Google Doc (id={}, mimeType={})",
            file_id, file.mime_type
        )));
    }
    Ok(file)
}

/// Create an empty Google Doc
pub async fn create_google_doc<S: DriveStore + ?Sized>(
    store: &S,
    title: &str,
    parent: Option<&str>,
) -> Result<DriveFile> {
    let title = require(title, "title")?;
    let file = store
        .create_file(&title, MIME_GOOGLE_DOC, optional(parent))
        .await?;
    info!("Created Google Doc {} ({})", file.name, file.id);
    Ok(file)
}

/// Copy a Google Doc under a new title
pub async fn copy_google_doc<S: DriveStore + ?Sized>(
    store: &S,
    file_id: &str,
    title: &str,
    parent: Option<&str>,
) -> Result<DriveFile> {
    let file_id = require(file_id, "docId")?;
    let title = require(title, "title")?;

    require_google_doc(store, &file_id).await?;
    let copied = store.copy_file(&file_id, &title, optional(parent)).await?;
    info!("Copied {} to {} ({})", file_id, copied.name, copied.id);
    Ok(copied)
}

/// Export a Google Doc and write it to `out`, or `<name>.<ext>` by default
pub async fn export_google_doc<S: DriveStore + ?Sized>(
    store: &S,
    file_id: &str,
    format: ExportFormat,
    out: Option<&Path>,
) -> Result<ExportedFile> {
    let file_id = require(file_id, "docId")?;
    let file = require_google_doc(store, &file_id).await?;

    let data = store.export_file(&file_id, format.mime_type()).await?;
    let path = match out {
        Some(path) => path.to_path_buf(),
        None => default_export_path(&file.name, &file_id, format),
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(&path, &data).await?;
    debug!("Exported {} bytes to {:?}", data.len(), path);

    Ok(ExportedFile {
        file,
        path,
        format,
        bytes: data.len(),
    })
}

/// File name for an export, from the document name with unsafe characters
/// replaced
fn default_export_path(name: &str, file_id: &str, format: ExportFormat) -> PathBuf {
    let stem: String = name
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let stem = if stem.trim_matches(|c| c == '.' || c == '_').is_empty() {
        file_id.to_string()
    } else {
        stem
    };
    PathBuf::from(format!("{}.{}", stem, format.extension()))
}
