//! Command-line interface

use clap::{Parser, Subcommand};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncReadExt;

use crate::config::DEFAULT_CONFIG_PATH;
use crate::docs::{
    plain_text, require_document_id, web_view_link, DocsWriter, DocumentStore, ProgressCallback,
};
use crate::drive::{self, DriveStore, ExportFormat};
use crate::edits::{EditPlan, EditRequest};
use crate::error::{Result, WorkspaceError};
use crate::gmail::{self, MailStore, MessageFormat};
use crate::layout::InsertionAnchor;
use crate::output::Printer;

#[derive(Parser, Debug)]
#[command(name = "gworkspace")]
#[command(version)]
#[command(about = "Google Docs, Drive and Gmail from the command line", long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Google account to act as
    #[arg(short, long, global = true, env = "GWORKSPACE_ACCOUNT")]
    pub account: Option<String>,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    /// Verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Authorize an account and cache its token
    Auth {
        /// Discard the cached token and authorize again
        #[arg(long)]
        force: bool,
    },

    /// Generate example configuration file
    InitConfig {
        /// Path to create config file
        #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
        output: PathBuf,

        /// Overwrite existing file
        #[arg(long)]
        force: bool,
    },

    /// Google Docs commands
    Docs {
        #[command(subcommand)]
        command: DocsCommand,
    },

    /// Gmail commands
    Gmail {
        #[command(subcommand)]
        command: GmailCommand,
    },
}

#[derive(Subcommand, Debug)]
pub enum DocsCommand {
    /// Show document metadata
    Info { doc_id: String },

    /// Print the document's plain text
    Cat {
        doc_id: String,

        /// Stop after this many bytes (0 = unlimited)
        #[arg(long)]
        max_bytes: Option<usize>,
    },

    /// Create an empty Google Doc
    Create {
        title: String,

        /// Parent folder ID
        #[arg(long)]
        parent: Option<String>,
    },

    /// Copy a Google Doc
    Copy {
        doc_id: String,
        title: String,

        /// Parent folder ID
        #[arg(long)]
        parent: Option<String>,
    },

    /// Export a Google Doc to a file
    Export {
        doc_id: String,

        #[arg(long, value_enum)]
        format: Option<ExportFormat>,

        /// Output path (default: <name>.<ext>)
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Replace the document's content with markdown
    Write {
        doc_id: String,

        /// Markdown file (default: stdin)
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Add markdown after the document's content
    Append {
        doc_id: String,

        /// Markdown file (default: stdin)
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Delete all document content
    Clear { doc_id: String },

    /// Show the edit requests markdown converts to, without calling the API
    Plan {
        /// Markdown file (default: stdin)
        #[arg(long)]
        file: Option<PathBuf>,

        /// Index the content would be inserted at
        #[arg(long, default_value_t = 1)]
        start_index: i64,
    },
}

#[derive(Subcommand, Debug)]
pub enum GmailCommand {
    /// Fetch a message
    Get {
        message_id: String,

        #[arg(long, value_enum, default_value_t = MessageFormat::Full)]
        format: MessageFormat,

        /// Comma-separated headers for `--format metadata`
        #[arg(long, default_value = "")]
        headers: String,
    },
}

/// Progress reporter using indicatif
pub struct ProgressReporter {
    multi: MultiProgress,
    spinner_style: ProgressStyle,
    bar_style: ProgressStyle,
}

impl ProgressReporter {
    pub fn with_multi_progress(multi: MultiProgress) -> Self {
        let spinner_style = ProgressStyle::with_template("{spinner:.green} [{elapsed:>6}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ");

        let bar_style =
            ProgressStyle::with_template("[{elapsed:>6}] {bar:40.cyan/blue} {pos:>4}/{len:4} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("##-");

        Self {
            multi,
            spinner_style,
            bar_style,
        }
    }

    pub fn multi_progress(&self) -> &MultiProgress {
        &self.multi
    }

    pub fn add_spinner(&self, msg: &str) -> ProgressBar {
        let pb = self.multi.add(ProgressBar::new_spinner());
        pb.set_style(self.spinner_style.clone());
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    }

    pub fn add_progress_bar(&self, len: u64, msg: &str) -> ProgressBar {
        let pb = self.multi.add(ProgressBar::new(len));
        pb.set_style(self.bar_style.clone());
        pb.set_message(msg.to_string());
        pb
    }

    /// Finish a spinner and clear it from the multi-progress display
    pub fn finish_spinner(&self, pb: &ProgressBar, msg: &str) {
        pb.finish_and_clear();
        let _ = self.multi.println(format!("  ✓ {}", msg));
    }

    /// Progress callback driving a bar for style batches
    pub fn style_batch_progress(&self) -> (ProgressBar, ProgressCallback) {
        let bar = self.add_progress_bar(0, "Applying styles...");
        let handle = bar.clone();
        let callback: ProgressCallback = Arc::new(move |applied: usize, total: usize| {
            handle.set_length(total as u64);
            handle.set_position(applied as u64);
        });
        (bar, callback)
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::with_multi_progress(MultiProgress::new())
    }
}

/// Account to act as, or a `Usage` error
pub fn require_account(account: Option<&str>) -> Result<&str> {
    match account.map(str::trim) {
        Some(account) if !account.is_empty() => Ok(account),
        _ => Err(WorkspaceError::Usage("missing --account".to_string())),
    }
}

/// Read markdown from a file, or stdin when no file is given
pub async fn read_input(file: Option<&Path>) -> Result<String> {
    match file {
        Some(path) => tokio::fs::read_to_string(path).await.map_err(|e| {
            WorkspaceError::Usage(format!("cannot read {}: {}", path.display(), e))
        }),
        None => {
            let mut input = String::new();
            tokio::io::stdin().read_to_string(&mut input).await?;
            Ok(input)
        }
    }
}

/// Follow-up advice printed under an error
pub fn hint_for(error: &WorkspaceError) -> Option<&'static str> {
    match error {
        WorkspaceError::AuthError(_) => {
            Some("Run `gworkspace auth --account <email> --force` to authorize again")
        }
        WorkspaceError::ConfigError(_) => {
            Some("Check gworkspace.toml, or run `gworkspace init-config` to create one")
        }
        WorkspaceError::DocumentNotFound { .. } => {
            Some("Check the document ID and that the account can open it")
        }
        WorkspaceError::Forbidden(_) => Some("The account lacks permission for this resource"),
        WorkspaceError::StylingIncomplete { .. } => {
            Some("The text was inserted; run `docs write` again to rewrite the document")
        }
        WorkspaceError::Usage(_) => Some("For help, run: gworkspace --help"),
        _ => None,
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DocumentIdOutput<'a> {
    document_id: &'a str,
}

pub async fn docs_info<D, F, O, E>(
    docs: &D,
    drive: &F,
    printer: &mut Printer<O, E>,
    doc_id: &str,
) -> Result<()>
where
    D: DocumentStore + ?Sized,
    F: DriveStore + ?Sized,
    O: Write,
    E: Write,
{
    let doc_id = require_document_id(doc_id)?;
    let file = drive.get_file(doc_id).await.map_err(|e| {
        if e.is_not_found() {
            WorkspaceError::DocumentNotFound {
                id: doc_id.to_string(),
            }
        } else {
            e
        }
    })?;
    let document = docs.get(doc_id).await?;

    if printer.is_json() {
        return printer.json(&serde_json::json!({ "file": file, "document": document }));
    }

    let link = file
        .web_view_link
        .clone()
        .or_else(|| web_view_link(doc_id))
        .unwrap_or_default();
    printer.kv("id", &file.id)?;
    printer.kv("name", &file.name)?;
    printer.kv("mime_type", &file.mime_type)?;
    printer.kv("link", &link)?;
    printer.kv("revision", document.revision_id.as_deref().unwrap_or(""))?;
    Ok(())
}

pub async fn docs_cat<D, O, E>(
    docs: &D,
    printer: &mut Printer<O, E>,
    doc_id: &str,
    max_bytes: usize,
) -> Result<()>
where
    D: DocumentStore + ?Sized,
    O: Write,
    E: Write,
{
    let doc_id = require_document_id(doc_id)?;
    let document = docs.get(doc_id).await?;
    let text = plain_text(&document, max_bytes);

    if printer.is_json() {
        return printer.json(&serde_json::json!({ "text": text }));
    }
    printer.raw(&text)
}

fn print_file<O: Write, E: Write>(
    printer: &mut Printer<O, E>,
    file: &crate::models::DriveFile,
) -> Result<()> {
    if printer.is_json() {
        return printer.json(&serde_json::json!({ "file": file }));
    }
    let link = file
        .web_view_link
        .clone()
        .or_else(|| web_view_link(&file.id))
        .unwrap_or_default();
    printer.kv("id", &file.id)?;
    printer.kv("name", &file.name)?;
    printer.kv("link", &link)
}

pub async fn docs_create<F, O, E>(
    drive: &F,
    printer: &mut Printer<O, E>,
    title: &str,
    parent: Option<&str>,
) -> Result<()>
where
    F: DriveStore + ?Sized,
    O: Write,
    E: Write,
{
    let file = drive::create_google_doc(drive, title, parent).await?;
    print_file(printer, &file)
}

pub async fn docs_copy<F, O, E>(
    drive: &F,
    printer: &mut Printer<O, E>,
    doc_id: &str,
    title: &str,
    parent: Option<&str>,
) -> Result<()>
where
    F: DriveStore + ?Sized,
    O: Write,
    E: Write,
{
    let file = drive::copy_google_doc(drive, doc_id, title, parent).await?;
    print_file(printer, &file)
}

pub async fn docs_export<F, O, E>(
    drive: &F,
    printer: &mut Printer<O, E>,
    doc_id: &str,
    format: ExportFormat,
    out: Option<&Path>,
) -> Result<()>
where
    F: DriveStore + ?Sized,
    O: Write,
    E: Write,
{
    let exported = drive::export_google_doc(drive, doc_id, format, out).await?;

    if printer.is_json() {
        return printer.json(&exported);
    }
    printer.kv("id", &exported.file.id)?;
    printer.kv("format", exported.format.extension())?;
    printer.kv("path", &exported.path.display().to_string())?;
    printer.kv("bytes", &exported.bytes.to_string())
}

/// Which markdown entry point to run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    Replace,
    Append,
}

pub async fn docs_write<S, O, E>(
    writer: &DocsWriter<S>,
    printer: &mut Printer<O, E>,
    doc_id: &str,
    markdown: &str,
    mode: WriteMode,
) -> Result<()>
where
    S: DocumentStore,
    O: Write,
    E: Write,
{
    let (id, verb) = match mode {
        WriteMode::Replace => (writer.write(doc_id, markdown).await?, "wrote document"),
        WriteMode::Append => (writer.append(doc_id, markdown).await?, "appended to document"),
    };

    if printer.is_json() {
        return printer.json(&DocumentIdOutput { document_id: &id });
    }
    printer.line(&format!("{} {}", verb, id))
}

pub async fn docs_clear<S, O, E>(
    writer: &DocsWriter<S>,
    printer: &mut Printer<O, E>,
    doc_id: &str,
) -> Result<()>
where
    S: DocumentStore,
    O: Write,
    E: Write,
{
    let id = writer.clear(doc_id).await?;

    if printer.is_json() {
        return printer.json(&DocumentIdOutput { document_id: &id });
    }
    printer.line(&format!("cleared document {}", id))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PlanOutput {
    insertion: EditRequest,
    style_batches: Vec<Vec<EditRequest>>,
}

/// Print the requests markdown converts to when inserted at `start_index`
pub fn docs_plan<O: Write, E: Write>(
    printer: &mut Printer<O, E>,
    markdown: &str,
    start_index: i64,
    max_batch_requests: usize,
) -> Result<()> {
    if start_index < 1 {
        return Err(WorkspaceError::Usage(format!(
            "--start-index must be at least 1 (got {})",
            start_index
        )));
    }

    let plan = EditPlan::from_markdown(markdown, InsertionAnchor::Index(start_index));
    plan.validate()?;
    let output = PlanOutput {
        style_batches: plan.style_batches(max_batch_requests)?,
        insertion: plan.insertion,
    };
    printer.json(&output)
}

pub async fn gmail_get<M, O, E>(
    mail: &M,
    printer: &mut Printer<O, E>,
    message_id: &str,
    format: MessageFormat,
    headers: &str,
    default_headers: &[String],
) -> Result<()>
where
    M: MailStore + ?Sized,
    O: Write,
    E: Write,
{
    let message = gmail::fetch_message(mail, message_id, format, headers, default_headers).await?;
    gmail::render_message(printer, &message, format)
}
