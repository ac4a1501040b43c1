use thiserror::Error;

/// Type alias for Result with WorkspaceError
pub type Result<T> = std::result::Result<T, WorkspaceError>;

/// Error types for the Google Workspace client
#[derive(Error, Debug)]
pub enum WorkspaceError {
    /// Google API returned an error
    #[error("Google API error: {0}")]
    ApiError(String),

    /// Authentication failed
    #[error("Authentication failed: {0}")]
    AuthError(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded, retry after {retry_after} seconds")]
    RateLimitExceeded { retry_after: u64 },

    /// Network-related error (connection issues, timeouts, etc.)
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Server returned 5xx error
    #[error("Server error (HTTP {status}): {message}")]
    ServerError { status: u16, message: String },

    /// Resource not found (404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// The target document does not exist or is not a Google Doc
    #[error("doc not found or not a Google Doc (id={id})")]
    DocumentNotFound { id: String },

    /// Bad request (400)
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Forbidden (403)
    #[error("Access forbidden: {0}")]
    Forbidden(String),

    /// A computed edit request is invalid. Always a conversion bug.
    #[error("Malformed edit request: {0}")]
    MalformedEdit(String),

    /// Text was inserted but a formatting batch failed
    #[error(
        "document {document_id}: text inserted but formatting incomplete \
         ({applied_batches}/{total_batches} style batches applied): {source}"
    )]
    StylingIncomplete {
        document_id: String,
        applied_batches: usize,
        total_batches: usize,
        #[source]
        source: Box<WorkspaceError>,
    },

    /// Invalid command-line usage
    #[error("{0}")]
    Usage(String),

    /// Invalid message format or parsing error
    #[error("Invalid message format: {0}")]
    InvalidMessageFormat(String),

    /// IO error (file operations, etc.)
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Generic catch-all error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl WorkspaceError {
    /// Check if the error is transient (a retry by the user may succeed)
    pub fn is_transient(&self) -> bool {
        match self {
            WorkspaceError::RateLimitExceeded { .. }
            | WorkspaceError::ServerError { .. }
            | WorkspaceError::NetworkError(_) => true,
            WorkspaceError::StylingIncomplete { source, .. } => source.is_transient(),
            _ => false,
        }
    }

    /// Check if the error is permanent
    pub fn is_permanent(&self) -> bool {
        !self.is_transient()
    }

    /// Check if the error is an HTTP 404 from the API
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            WorkspaceError::NotFound(_) | WorkspaceError::DocumentNotFound { .. }
        )
    }
}

/// Parse the Retry-After header from an HTTP response
///
/// Only the delay-seconds form is understood. Missing or unparseable values
/// fall back to 5 seconds.
fn parse_retry_after_header<B>(response: &hyper::Response<B>) -> u64 {
    const DEFAULT_RETRY_AFTER: u64 = 5;

    response
        .headers()
        .get("retry-after")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
        .unwrap_or(DEFAULT_RETRY_AFTER)
}

// google-docs1, google-drive3 and google-gmail1 all re-export the same
// google-apis-common error type, so this impl covers every hub.
impl From<google_docs1::Error> for WorkspaceError {
    fn from(error: google_docs1::Error) -> Self {
        match error {
            google_docs1::Error::Failure(ref response) => {
                let status = response.status();
                let status_code = status.as_u16();
                let message = format!(
                    "HTTP {}: {}",
                    status_code,
                    status.canonical_reason().unwrap_or("Unknown")
                );

                match status_code {
                    429 => {
                        let retry_after = parse_retry_after_header(response);
                        WorkspaceError::RateLimitExceeded { retry_after }
                    }
                    404 => WorkspaceError::NotFound("Resource not found".to_string()),
                    400 => WorkspaceError::BadRequest(message),
                    401 => WorkspaceError::AuthError(message),
                    403 => WorkspaceError::Forbidden(message),
                    500..=599 => WorkspaceError::ServerError {
                        status: status_code,
                        message,
                    },
                    _ => WorkspaceError::ApiError(message),
                }
            }
            google_docs1::Error::BadRequest(ref err) => {
                WorkspaceError::BadRequest(format!("{}", err))
            }
            google_docs1::Error::HttpError(ref err) => {
                WorkspaceError::NetworkError(format!("Connection error: {}", err))
            }
            google_docs1::Error::Io(err) => WorkspaceError::NetworkError(err.to_string()),
            google_docs1::Error::MissingToken(ref err) => {
                WorkspaceError::AuthError(format!("{}", err))
            }
            _ => WorkspaceError::ApiError(error.to_string()),
        }
    }
}
