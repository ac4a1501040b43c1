//! Google Workspace from the command line
//!
//! Converts a markdown subset into Google Docs edit requests and applies them,
//! alongside a few Drive and Gmail helpers.
//!
//! # Overview
//!
//! - **Markdown conversion**: headings (`#`, `##`, `###`), bullet and numbered
//!   lists, `**bold**` and `*italic*` spans, with offsets in UTF-16 code units
//! - **Docs editing**: write, append and clear through one text insertion
//!   followed by ordered style batches
//! - **Drive**: create, copy and export Google Docs
//! - **Gmail**: fetch a message in `full`, `metadata` or `raw` format
//!
//! # Example Usage
//!
//! ```no_run
//! use gworkspace::{auth, client::WorkspaceClients, config::Config, docs::DocsWriter};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("gworkspace.toml".as_ref()).await?;
//!
//!     let token_cache = auth::token_cache_path(&config.auth.token_dir, "ada@example.com")?;
//!     let hubs = auth::initialize_hubs(&config.auth.credentials_path, &token_cache).await?;
//!     let clients = WorkspaceClients::new(hubs);
//!
//!     let writer = DocsWriter::new(&clients.docs, config.docs.max_batch_requests);
//!     writer.write("your-doc-id", "# Title\n\nBody **bold** text").await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! # Module Organization
//!
//! - [`markdown`] - Line tokenizer and inline span extractor
//! - [`layout`] - Places segments at absolute document indices
//! - [`edits`] - Edit requests and batching
//! - [`docs`] - `DocumentStore` trait, markdown writer and text extraction
//! - [`drive`] - `DriveStore` trait and Google Doc file operations
//! - [`gmail`] - `MailStore` trait and message rendering
//! - [`client`] - Google API clients implementing the store traits
//! - [`auth`] - OAuth2 authentication and API hub initialization
//! - [`cli`] - Command-line interface and command handlers
//! - [`config`] - Configuration management
//! - [`output`] - Text and JSON output
//! - [`error`] - Error types and result aliases
//! - [`models`] - Core data structures

pub mod auth;
pub mod cli;
pub mod client;
pub mod config;
pub mod docs;
pub mod drive;
pub mod edits;
pub mod error;
pub mod gmail;
pub mod layout;
pub mod markdown;
pub mod models;
pub mod output;

// Re-export commonly used types for convenience
pub use error::{Result, WorkspaceError};

// Conversion pipeline
pub use edits::{EditPlan, EditRequest, DEFAULT_MAX_BATCH_REQUESTS};
pub use layout::{assemble, IndexRange, InsertionAnchor};
pub use markdown::{parse_markdown, BlockStyle, Emphasis, EmphasisRange, ListKind, Segment};

// Store traits and writer
pub use docs::{DocsWriter, DocumentStore};
pub use drive::{DriveStore, ExportFormat};
pub use gmail::{MailStore, MessageFormat};

// Core data models
pub use models::{DocumentSnapshot, DriveFile, MailMessage, StructuralBlock};

// Config types
pub use config::Config;

// CLI types (for binary usage)
pub use cli::{Cli, Commands, ProgressReporter};
