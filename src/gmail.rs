//! Gmail message retrieval and rendering

use async_trait::async_trait;
use clap::ValueEnum;
use std::io::Write;

use crate::error::{Result, WorkspaceError};
use crate::models::{MailMessage, MessagePart};
use crate::output::Printer;

/// Headers requested for `metadata` when none are configured
pub const DEFAULT_METADATA_HEADERS: &[&str] = &["From", "To", "Subject", "Date"];

/// Gmail message retrieval
#[async_trait]
pub trait MailStore: Send + Sync {
    /// Fetch a message of the signed-in user
    ///
    /// `metadata_headers` is only sent with `MessageFormat::Metadata`.
    async fn get_message(
        &self,
        message_id: &str,
        format: MessageFormat,
        metadata_headers: Vec<String>,
    ) -> Result<MailMessage>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum MessageFormat {
    #[default]
    Full,
    Metadata,
    Raw,
}

impl MessageFormat {
    /// Value of the API's `format` parameter
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageFormat::Full => "full",
            MessageFormat::Metadata => "metadata",
            MessageFormat::Raw => "raw",
        }
    }
}

/// Split a comma-separated list, dropping empty entries
pub fn split_csv(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Value of the first header named `name` (case-insensitive), or ""
pub fn header_value<'a>(part: Option<&'a MessagePart>, name: &str) -> &'a str {
    part.and_then(|p| {
        p.headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
    })
    .map(|h| h.value.as_str())
    .unwrap_or("")
}

/// Most readable body of a message: the first `text/plain` part found
/// depth-first, otherwise the first `text/html` part
pub fn best_body_text(part: Option<&MessagePart>) -> Option<String> {
    let part = part?;
    find_body(part, "text/plain")
        .or_else(|| find_body(part, "text/html"))
        .map(|body| body.trim_end().to_string())
        .filter(|body| !body.is_empty())
}

fn find_body<'a>(part: &'a MessagePart, mime_type: &str) -> Option<&'a str> {
    if part.mime_type.eq_ignore_ascii_case(mime_type) {
        if let Some(body) = part.body.as_deref().filter(|b| !b.is_empty()) {
            return Some(body);
        }
    }
    part.parts.iter().find_map(|child| find_body(child, mime_type))
}

/// Fetch a message, applying default metadata headers
pub async fn fetch_message<S: MailStore + ?Sized>(
    store: &S,
    message_id: &str,
    format: MessageFormat,
    headers: &str,
    default_headers: &[String],
) -> Result<MailMessage> {
    let message_id = message_id.trim();
    if message_id.is_empty() {
        return Err(WorkspaceError::Usage("empty messageId".to_string()));
    }

    let metadata_headers = match format {
        MessageFormat::Metadata => {
            let requested = split_csv(headers);
            if requested.is_empty() {
                default_headers.to_vec()
            } else {
                requested
            }
        }
        _ => Vec::new(),
    };

    store.get_message(message_id, format, metadata_headers).await
}

/// Print a message as `key\tvalue` lines, or as `{"message": ...}` in JSON mode
pub fn render_message<O: Write, E: Write>(
    printer: &mut Printer<O, E>,
    message: &MailMessage,
    format: MessageFormat,
) -> Result<()> {
    if printer.is_json() {
        return printer.json(&serde_json::json!({ "message": message }));
    }

    printer.kv("id", &message.id)?;
    printer.kv("thread_id", &message.thread_id)?;
    printer.kv("label_ids", &message.label_ids.join(","))?;

    match format {
        MessageFormat::Raw => match message.raw.as_deref().filter(|r| !r.is_empty()) {
            Some(raw) => {
                printer.line("")?;
                printer.line(raw)?;
            }
            None => printer.warn("Empty raw message")?,
        },
        MessageFormat::Metadata | MessageFormat::Full => {
            let payload = message.payload.as_ref();
            printer.kv("from", header_value(payload, "From"))?;
            printer.kv("to", header_value(payload, "To"))?;
            printer.kv("subject", header_value(payload, "Subject"))?;
            printer.kv("date", header_value(payload, "Date"))?;

            if format == MessageFormat::Full {
                if let Some(body) = best_body_text(payload) {
                    printer.line("")?;
                    printer.line(&body)?;
                }
            }
        }
    }
    Ok(())
}
