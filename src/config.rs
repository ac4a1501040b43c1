use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::drive::ExportFormat;
use crate::edits::DEFAULT_MAX_BATCH_REQUESTS;
use crate::error::{Result, WorkspaceError};
use crate::gmail::DEFAULT_METADATA_HEADERS;

/// Default location of the configuration file
pub const DEFAULT_CONFIG_PATH: &str = "gworkspace.toml";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub docs: DocsConfig,
    #[serde(default)]
    pub gmail: GmailConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "default_credentials_path")]
    pub credentials_path: PathBuf,
    #[serde(default = "default_token_dir")]
    pub token_dir: PathBuf,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            credentials_path: default_credentials_path(),
            token_dir: default_token_dir(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocsConfig {
    #[serde(default = "default_max_batch_requests")]
    pub max_batch_requests: usize,
    /// Byte limit for `docs cat`; 0 disables the limit
    #[serde(default = "default_cat_max_bytes")]
    pub cat_max_bytes: usize,
    #[serde(default = "default_export_format")]
    pub default_export_format: String,
}

impl Default for DocsConfig {
    fn default() -> Self {
        Self {
            max_batch_requests: default_max_batch_requests(),
            cat_max_bytes: default_cat_max_bytes(),
            default_export_format: default_export_format(),
        }
    }
}

impl DocsConfig {
    pub fn export_format(&self) -> Result<ExportFormat> {
        self.default_export_format.parse()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GmailConfig {
    #[serde(default = "default_metadata_headers")]
    pub metadata_headers: Vec<String>,
}

impl Default for GmailConfig {
    fn default() -> Self {
        Self {
            metadata_headers: default_metadata_headers(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OutputConfig {
    #[serde(default)]
    pub json: bool,
}

fn default_credentials_path() -> PathBuf {
    PathBuf::from("credentials.json")
}

fn default_token_dir() -> PathBuf {
    PathBuf::from(".gworkspace/tokens")
}

fn default_max_batch_requests() -> usize {
    DEFAULT_MAX_BATCH_REQUESTS
}

fn default_cat_max_bytes() -> usize {
    2_000_000
}

fn default_export_format() -> String {
    "pdf".to_string()
}

fn default_metadata_headers() -> Vec<String> {
    DEFAULT_METADATA_HEADERS
        .iter()
        .map(|h| h.to_string())
        .collect()
}

impl Config {
    pub async fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::warn!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            WorkspaceError::ConfigError(format!("Failed to read config file: {}", e))
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| {
            WorkspaceError::ConfigError(format!("Failed to parse config file: {}", e))
        })?;

        config.validate()?;

        tracing::debug!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                WorkspaceError::ConfigError(format!("Failed to create config directory: {}", e))
            })?;
        }

        let content = toml::to_string_pretty(self).map_err(|e| {
            WorkspaceError::ConfigError(format!("Failed to serialize config: {}", e))
        })?;

        tokio::fs::write(path, content).await.map_err(|e| {
            WorkspaceError::ConfigError(format!("Failed to write config file: {}", e))
        })?;

        tracing::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.auth.credentials_path.as_os_str().is_empty() {
            return Err(WorkspaceError::ConfigError(
                "auth.credentials_path cannot be empty".to_string(),
            ));
        }
        if self.auth.token_dir.as_os_str().is_empty() {
            return Err(WorkspaceError::ConfigError(
                "auth.token_dir cannot be empty".to_string(),
            ));
        }

        // The Docs API caps batchUpdate payloads; 50 is the documented safe size
        if self.docs.max_batch_requests == 0 {
            return Err(WorkspaceError::ConfigError(
                "docs.max_batch_requests must be at least 1".to_string(),
            ));
        }
        if self.docs.max_batch_requests > DEFAULT_MAX_BATCH_REQUESTS {
            return Err(WorkspaceError::ConfigError(format!(
                "docs.max_batch_requests cannot exceed {}",
                DEFAULT_MAX_BATCH_REQUESTS
            )));
        }

        if self.docs.export_format().is_err() {
            return Err(WorkspaceError::ConfigError(format!(
                "Invalid docs.default_export_format: '{}'. Must be 'pdf', 'docx', or 'txt'",
                self.docs.default_export_format
            )));
        }

        for header in &self.gmail.metadata_headers {
            if header.trim().is_empty() {
                return Err(WorkspaceError::ConfigError(
                    "gmail.metadata_headers cannot contain empty strings".to_string(),
                ));
            }
        }

        tracing::debug!("Configuration validation passed");
        Ok(())
    }

    /// Create an example configuration file
    pub async fn create_example(path: &Path) -> Result<()> {
        let config = Self::default();
        config.save(path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.auth.credentials_path, PathBuf::from("credentials.json"));
        assert_eq!(config.auth.token_dir, PathBuf::from(".gworkspace/tokens"));

        assert_eq!(config.docs.max_batch_requests, 50);
        assert_eq!(config.docs.cat_max_bytes, 2_000_000);
        assert_eq!(config.docs.export_format().unwrap(), ExportFormat::Pdf);

        assert_eq!(
            config.gmail.metadata_headers,
            vec!["From", "To", "Subject", "Date"]
        );
        assert!(!config.output.json);
    }

    #[test]
    fn test_config_validation_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_config_validation_max_batch_zero() {
        let mut config = Config::default();
        config.docs.max_batch_requests = 0;
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("at least 1"));
    }

    #[test]
    fn test_config_validation_max_batch_too_high() {
        let mut config = Config::default();
        config.docs.max_batch_requests = 51;
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("cannot exceed 50"));
    }

    #[test]
    fn test_config_validation_max_batch_boundary_valid() {
        let mut config = Config::default();

        config.docs.max_batch_requests = 1;
        assert!(config.validate().is_ok());

        config.docs.max_batch_requests = 50;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_invalid_export_format() {
        let mut config = Config::default();
        config.docs.default_export_format = "rtf".to_string();
        let result = config.validate();
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Invalid docs.default_export_format"));
    }

    #[test]
    fn test_config_validation_empty_header() {
        let mut config = Config::default();
        config.gmail.metadata_headers.push(" ".to_string());
        let result = config.validate();
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("metadata_headers cannot contain empty strings"));
    }

    #[test]
    fn test_config_validation_empty_token_dir() {
        let mut config = Config::default();
        config.auth.token_dir = PathBuf::new();
        assert!(config.validate().is_err());
    }

    #[tokio::test]
    async fn test_config_load_save_roundtrip() {
        let temp_file = NamedTempFile::new().unwrap();
        let path = temp_file.path();

        let mut config = Config::default();
        config.docs.max_batch_requests = 20;
        config.output.json = true;
        config.save(path).await.unwrap();

        let loaded = Config::load(path).await.unwrap();
        assert_eq!(loaded.docs.max_batch_requests, 20);
        assert!(loaded.output.json);
        assert_eq!(loaded.auth.token_dir, config.auth.token_dir);
    }

    #[tokio::test]
    async fn test_config_load_nonexistent_returns_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.toml");

        let config = Config::load(&path).await.unwrap();
        assert_eq!(config.docs.max_batch_requests, 50);
    }

    #[derive(Clone, Default)]
    struct LogBuffer(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_config_load_nonexistent_warns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.toml");

        let logs = LogBuffer::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::WARN)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        Config::load(&path).await.unwrap();

        let output = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("WARN"));
        assert!(output.contains("using defaults"));
    }

    #[tokio::test]
    async fn test_config_load_invalid_toml() {
        let temp_file = NamedTempFile::new().unwrap();
        let path = temp_file.path();

        tokio::fs::write(path, "this is not valid toml {[}]")
            .await
            .unwrap();

        let result = Config::load(path).await;
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Failed to parse config file"));
    }

    #[tokio::test]
    async fn test_config_load_rejects_invalid_values() {
        let temp_file = NamedTempFile::new().unwrap();
        let path = temp_file.path();

        tokio::fs::write(path, "[docs]\nmax_batch_requests = 500\n")
            .await
            .unwrap();

        assert!(Config::load(path).await.is_err());
    }

    #[tokio::test]
    async fn test_config_partial_with_defaults() {
        let temp_file = NamedTempFile::new().unwrap();
        let path = temp_file.path();

        let partial_config = r#"
[docs]
cat_max_bytes = 0
default_export_format = "docx"

[output]
json = true
"#;
        tokio::fs::write(path, partial_config).await.unwrap();

        let config = Config::load(path).await.unwrap();

        assert_eq!(config.docs.cat_max_bytes, 0);
        assert_eq!(config.docs.export_format().unwrap(), ExportFormat::Docx);
        assert!(config.output.json);

        assert_eq!(config.docs.max_batch_requests, 50); // default
        assert_eq!(config.auth.credentials_path, PathBuf::from("credentials.json")); // default
        assert_eq!(config.gmail.metadata_headers.len(), 4); // default
    }

    #[tokio::test]
    async fn test_config_create_example() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("gworkspace.toml");

        Config::create_example(&path).await.unwrap();
        assert!(path.exists());

        let config = Config::load(&path).await.unwrap();
        assert_eq!(config.docs.default_export_format, "pdf");
    }
}
