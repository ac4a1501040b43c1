use anyhow::Result;
use clap::Parser;
use gworkspace::auth;
use gworkspace::cli::{self, Cli, Commands, DocsCommand, GmailCommand, ProgressReporter, WriteMode};
use gworkspace::client::WorkspaceClients;
use gworkspace::config::Config;
use gworkspace::docs::DocsWriter;
use gworkspace::error::WorkspaceError;
use gworkspace::output::{OutputMode, Printer};
use indicatif::MultiProgress;
use std::io::Write;
use std::path::PathBuf;
use std::process;
use std::sync::{Arc, Mutex};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

/// A writer that prints through MultiProgress to avoid progress bar conflicts
#[derive(Clone)]
struct MultiProgressWriter {
    multi: Arc<MultiProgress>,
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl MultiProgressWriter {
    fn new(multi: Arc<MultiProgress>) -> Self {
        Self {
            multi,
            buffer: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl Write for MultiProgressWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let mut buffer = self
            .buffer
            .lock()
            .map_err(|_| std::io::Error::new(std::io::ErrorKind::Other, "log buffer poisoned"))?;
        buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        let mut buffer = self
            .buffer
            .lock()
            .map_err(|_| std::io::Error::new(std::io::ErrorKind::Other, "log buffer poisoned"))?;
        if buffer.is_empty() {
            return Ok(());
        }

        let msg = String::from_utf8_lossy(&buffer);
        let msg = msg.trim_end_matches('\n');
        if !msg.is_empty() {
            // println is a no-op on a hidden draw target (stderr not a terminal)
            if self.multi.is_hidden() {
                eprintln!("{}", msg);
            } else {
                let _ = self.multi.println(msg);
            }
        }
        buffer.clear();
        Ok(())
    }
}

impl Drop for MultiProgressWriter {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

/// MakeWriter implementation for tracing
#[derive(Clone)]
struct MultiProgressMakeWriter {
    multi: Arc<MultiProgress>,
}

impl<'a> MakeWriter<'a> for MultiProgressMakeWriter {
    type Writer = MultiProgressWriter;

    fn make_writer(&'a self) -> Self::Writer {
        MultiProgressWriter::new(Arc::clone(&self.multi))
    }
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        display_error(&e);
        process::exit(1);
    }
}

fn display_error(error: &anyhow::Error) {
    eprintln!("Error: {}", error);
    for cause in error.chain().skip(1) {
        eprintln!("  caused by: {}", cause);
    }

    let hint = error
        .chain()
        .find_map(|cause| cause.downcast_ref::<WorkspaceError>())
        .and_then(cli::hint_for);
    if let Some(hint) = hint {
        eprintln!("\n{}", hint);
    }
}

async fn run() -> Result<()> {
    // Several dependencies pull in different rustls crypto providers
    #[cfg(not(windows))]
    rustls::crypto::aws_lc_rs::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install default crypto provider"))?;

    #[cfg(windows)]
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install default crypto provider"))?;

    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("gworkspace=debug,info"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("gworkspace=warn"))
    };

    let multi_progress = Arc::new(MultiProgress::new());
    let make_writer = MultiProgressMakeWriter {
        multi: Arc::clone(&multi_progress),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(make_writer)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    if let Commands::InitConfig { output, force } = &cli.command {
        if output.exists() && !force {
            return Err(WorkspaceError::ConfigError(format!(
                "Configuration file already exists at {:?}. Use --force to overwrite.",
                output
            ))
            .into());
        }

        Config::create_example(output).await?;
        println!("Created example configuration file at: {:?}", output);
        println!("\nKey settings to review:");
        println!("  - auth.credentials_path: OAuth2 client secret downloaded from Google Cloud");
        println!("  - auth.token_dir: Where per-account tokens are cached");
        println!("  - docs.max_batch_requests: Style requests per batchUpdate call (1-50)");
        println!("  - docs.default_export_format: 'pdf', 'docx', or 'txt'");
        return Ok(());
    }

    let config = Config::load(&cli.config).await?;
    let mode = OutputMode::from_json_flag(cli.json || config.output.json);
    let mut printer = Printer::stdio(mode);

    // Planning needs no account or network access
    if let Commands::Docs {
        command: DocsCommand::Plan { file, start_index },
    } = &cli.command
    {
        let markdown = cli::read_input(file.as_deref()).await?;
        cli::docs_plan(
            &mut printer,
            &markdown,
            *start_index,
            config.docs.max_batch_requests,
        )?;
        return Ok(());
    }

    let account = cli::require_account(cli.account.as_deref())?;
    let token_cache = auth::token_cache_path(&config.auth.token_dir, account)?;
    let reporter = ProgressReporter::with_multi_progress((*multi_progress).clone());

    if let Commands::Auth { force: true } = &cli.command {
        if auth::remove_cached_token(&token_cache).await? {
            tracing::info!("Removed existing token cache for {}", account);
        }
    }

    let auth_spinner = reporter.add_spinner("Authenticating with Google...");
    let hubs = auth::initialize_hubs(&config.auth.credentials_path, &token_cache).await?;
    reporter.finish_spinner(&auth_spinner, "Authenticated");
    let clients = WorkspaceClients::new(hubs);

    match cli.command {
        Commands::Auth { .. } => {
            let email = clients.mail.email_address().await?;
            if printer.is_json() {
                printer.json(&serde_json::json!({
                    "account": email,
                    "tokenCache": token_cache,
                }))?;
            } else {
                printer.kv("account", &email)?;
                printer.kv("token_cache", &token_cache.display().to_string())?;
            }
        }

        Commands::Docs { command } => {
            run_docs(command, &clients, &config, &reporter, &mut printer).await?;
        }

        Commands::Gmail {
            command:
                GmailCommand::Get {
                    message_id,
                    format,
                    headers,
                },
        } => {
            cli::gmail_get(
                &clients.mail,
                &mut printer,
                &message_id,
                format,
                &headers,
                &config.gmail.metadata_headers,
            )
            .await?;
        }

        Commands::InitConfig { .. } => {}
    }

    Ok(())
}

async fn run_docs(
    command: DocsCommand,
    clients: &WorkspaceClients,
    config: &Config,
    reporter: &ProgressReporter,
    printer: &mut Printer<std::io::Stdout, std::io::Stderr>,
) -> Result<()> {
    match command {
        DocsCommand::Info { doc_id } => {
            cli::docs_info(&clients.docs, &clients.drive, printer, &doc_id).await?;
        }

        DocsCommand::Cat { doc_id, max_bytes } => {
            let max_bytes = max_bytes.unwrap_or(config.docs.cat_max_bytes);
            cli::docs_cat(&clients.docs, printer, &doc_id, max_bytes).await?;
        }

        DocsCommand::Create { title, parent } => {
            cli::docs_create(&clients.drive, printer, &title, parent.as_deref()).await?;
        }

        DocsCommand::Copy {
            doc_id,
            title,
            parent,
        } => {
            cli::docs_copy(&clients.drive, printer, &doc_id, &title, parent.as_deref()).await?;
        }

        DocsCommand::Export {
            doc_id,
            format,
            out,
        } => {
            let format = match format {
                Some(format) => format,
                None => config.docs.export_format()?,
            };
            cli::docs_export(&clients.drive, printer, &doc_id, format, out.as_deref()).await?;
        }

        DocsCommand::Write { doc_id, file } => {
            write_markdown(clients, config, reporter, printer, &doc_id, file, WriteMode::Replace)
                .await?;
        }

        DocsCommand::Append { doc_id, file } => {
            write_markdown(clients, config, reporter, printer, &doc_id, file, WriteMode::Append)
                .await?;
        }

        DocsCommand::Clear { doc_id } => {
            let writer = DocsWriter::new(&clients.docs, config.docs.max_batch_requests);
            cli::docs_clear(&writer, printer, &doc_id).await?;
        }

        DocsCommand::Plan { .. } => {}
    }

    Ok(())
}

async fn write_markdown(
    clients: &WorkspaceClients,
    config: &Config,
    reporter: &ProgressReporter,
    printer: &mut Printer<std::io::Stdout, std::io::Stderr>,
    doc_id: &str,
    file: Option<PathBuf>,
    mode: WriteMode,
) -> Result<()> {
    let markdown = cli::read_input(file.as_deref()).await?;

    let (bar, on_progress) = reporter.style_batch_progress();
    let writer =
        DocsWriter::new(&clients.docs, config.docs.max_batch_requests).with_progress(on_progress);
    let result = cli::docs_write(&writer, printer, doc_id, &markdown, mode).await;
    bar.finish_and_clear();

    result?;
    Ok(())
}
