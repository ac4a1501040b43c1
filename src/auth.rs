//! OAuth2 authentication and API hub construction for Docs, Drive and Gmail

use google_docs1::{hyper_rustls, hyper_util, yup_oauth2, Docs};
use google_drive3::DriveHub;
use google_gmail1::Gmail;
use std::env;
use std::path::{Path, PathBuf};
use yup_oauth2::ApplicationSecret;

use crate::error::{Result, WorkspaceError};

/// Scopes requested for every account
///
/// - documents: read and edit Google Docs
/// - drive: create, copy and export files
/// - gmail.readonly: read messages
pub const REQUIRED_SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/documents",
    "https://www.googleapis.com/auth/drive",
    "https://www.googleapis.com/auth/gmail.readonly",
];

pub const DOCS_SCOPE: &str = "https://www.googleapis.com/auth/documents";
pub const DRIVE_SCOPE: &str = "https://www.googleapis.com/auth/drive";
pub const GMAIL_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/gmail.readonly";

pub type HttpsConnector =
    hyper_rustls::HttpsConnector<hyper_util::client::legacy::connect::HttpConnector>;

pub type DocsHub = Docs<HttpsConnector>;
pub type DriveApiHub = DriveHub<HttpsConnector>;
pub type GmailHub = Gmail<HttpsConnector>;

/// API hubs sharing one authenticator and one HTTP client
#[derive(Clone)]
pub struct WorkspaceHubs {
    pub docs: DocsHub,
    pub drive: DriveApiHub,
    pub gmail: GmailHub,
}

/// Token cache file for an account: `<token_dir>/<sanitized account>.json`
pub fn token_cache_path(token_dir: &Path, account: &str) -> Result<PathBuf> {
    let account = account.trim();
    if account.is_empty() {
        return Err(WorkspaceError::Usage("missing --account".to_string()));
    }

    let name: String = account
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '@' | '.' | '-' | '_' | '+') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if name.chars().all(|c| c == '.') {
        return Err(WorkspaceError::Usage(format!(
            "invalid account name: {:?}",
            account
        )));
    }

    Ok(token_dir.join(format!("{}.json", name)))
}

/// Read the installed-app secret, falling back to environment variables
/// when the credentials file does not exist
pub async fn read_application_secret(credentials_path: &Path) -> Result<ApplicationSecret> {
    if !credentials_path.exists() {
        tracing::warn!(
            "Credentials file {:?} not found, trying GWORKSPACE_CLIENT_ID",
            credentials_path
        );
        return load_credentials_from_env().map_err(|_| {
            WorkspaceError::AuthError(format!(
                "Credentials file not found: {}",
                credentials_path.display()
            ))
        });
    }

    yup_oauth2::read_application_secret(credentials_path)
        .await
        .map_err(|e| WorkspaceError::AuthError(format!("Failed to read credentials: {}", e)))
}

/// Initialize the Docs, Drive and Gmail hubs with OAuth2 authentication
///
/// Sets up:
/// - an InstalledFlow authenticator (browser redirect) persisting tokens to
///   `token_cache_path`
/// - one HTTP/1 client with TLS, cloned into every hub
pub async fn initialize_hubs(
    credentials_path: &Path,
    token_cache_path: &Path,
) -> Result<WorkspaceHubs> {
    let secret = read_application_secret(credentials_path).await?;

    if let Some(parent) = token_cache_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    let auth = yup_oauth2::InstalledFlowAuthenticator::builder(
        secret,
        yup_oauth2::InstalledFlowReturnMethod::HTTPRedirect,
    )
    .persist_tokens_to_disk(token_cache_path)
    .build()
    .await
    .map_err(|e| WorkspaceError::AuthError(format!("Failed to build authenticator: {}", e)))?;

    // Obtain the token for all scopes up front so each hub reuses it
    let _token = auth
        .token(REQUIRED_SCOPES)
        .await
        .map_err(|e| WorkspaceError::AuthError(format!("Failed to obtain token: {}", e)))?;

    if token_cache_path.exists() {
        secure_token_file(token_cache_path).await?;
    }

    let client = hyper_util::client::legacy::Client::builder(hyper_util::rt::TokioExecutor::new())
        .build(
            hyper_rustls::HttpsConnectorBuilder::new()
                .with_native_roots()
                .map_err(|e| {
                    WorkspaceError::AuthError(format!("Failed to load TLS roots: {}", e))
                })?
                .https_or_http()
                .enable_http1()
                .build(),
        );

    Ok(WorkspaceHubs {
        docs: Docs::new(client.clone(), auth.clone()),
        drive: DriveHub::new(client.clone(), auth.clone()),
        gmail: Gmail::new(client, auth),
    })
}

/// Remove a cached token so the next run re-authorizes
pub async fn remove_cached_token(token_cache_path: &Path) -> Result<bool> {
    match tokio::fs::remove_file(token_cache_path).await {
        Ok(()) => {
            tracing::info!("Removed cached token {:?}", token_cache_path);
            Ok(true)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// Load OAuth2 credentials from environment variables
///
/// # Environment Variables
/// - `GWORKSPACE_CLIENT_ID`: OAuth2 client ID
/// - `GWORKSPACE_CLIENT_SECRET`: OAuth2 client secret
/// - `GWORKSPACE_REDIRECT_URI`: Redirect URI (optional, defaults to http://localhost:8080)
pub fn load_credentials_from_env() -> Result<ApplicationSecret> {
    let client_id = env::var("GWORKSPACE_CLIENT_ID")
        .map_err(|_| WorkspaceError::ConfigError("GWORKSPACE_CLIENT_ID not set".to_string()))?;
    let client_secret = env::var("GWORKSPACE_CLIENT_SECRET").map_err(|_| {
        WorkspaceError::ConfigError("GWORKSPACE_CLIENT_SECRET not set".to_string())
    })?;
    let redirect_uri = env::var("GWORKSPACE_REDIRECT_URI")
        .unwrap_or_else(|_| "http://localhost:8080".to_string());

    Ok(ApplicationSecret {
        client_id,
        client_secret,
        auth_uri: "https://accounts.google.com/o/oauth2/auth".to_string(),
        token_uri: "https://oauth2.googleapis.com/token".to_string(),
        redirect_uris: vec![redirect_uri],
        ..Default::default()
    })
}

/// Restrict a token file to its owner (0600)
#[cfg(unix)]
pub async fn secure_token_file(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut perms = tokio::fs::metadata(path).await?.permissions();
    perms.set_mode(0o600);
    tokio::fs::set_permissions(path, perms).await?;
    Ok(())
}

/// Windows relies on the profile directory's ACLs
#[cfg(windows)]
pub async fn secure_token_file(_path: &Path) -> Result<()> {
    Ok(())
}
