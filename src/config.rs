//! Server configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use drive_catalog::{DriveClientConfig, DEFAULT_ARTIST};

use crate::error::{Result, ServerError};

/// Directory the web player is served from unless configured otherwise
pub const DEFAULT_STATIC_DIR: &str = "static";

/// Drive access configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriveConfig {
    /// Identifier of the folder the catalog is built from
    pub folder_id: String,

    /// API key used for every Drive request
    pub api_key: String,

    /// Drive v3 endpoint
    pub api_base: String,

    /// Entries requested per listing page
    pub page_size: u32,

    /// Connect timeout for Drive requests in seconds
    pub connect_timeout_secs: u64,
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            folder_id: String::new(),
            api_key: String::new(),
            api_base: drive_catalog::drive::DEFAULT_API_BASE.to_string(),
            page_size: 1000,
            connect_timeout_secs: 10,
        }
    }
}

impl DriveConfig {
    /// Settings for the Drive client
    pub fn client_config(&self) -> DriveClientConfig {
        DriveClientConfig {
            api_key: self.api_key.clone(),
            api_base: self.api_base.clone(),
            page_size: self.page_size,
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
        }
    }
}

/// Catalog configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Artist for songs directly inside the root folder
    pub default_artist: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            default_artist: DEFAULT_ARTIST.to_string(),
        }
    }
}

/// Stream relay configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Chunks buffered between the upstream download and the response body
    pub channel_capacity: usize,

    /// Content-Type sent when upstream does not report an audio type
    pub fallback_content_type: String,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 8,
            fallback_content_type: drive_catalog::AUDIO_MIME.to_string(),
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Drive configuration
    pub drive: DriveConfig,

    /// Catalog configuration
    pub catalog: CatalogConfig,

    /// Stream configuration
    pub stream: StreamConfig,

    /// Directory served at `/` for the web player. The player's assets are
    /// not bundled; a missing directory just answers 404.
    pub static_dir: Option<PathBuf>,

    /// Enable CORS
    pub cors_enabled: bool,

    /// Upper bound for producing a response head, in seconds
    pub request_timeout_secs: u64,

    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Log output format
    pub log_format: LogFormat,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            drive: DriveConfig::default(),
            catalog: CatalogConfig::default(),
            stream: StreamConfig::default(),
            static_dir: Some(PathBuf::from(DEFAULT_STATIC_DIR)),
            cors_enabled: true,
            request_timeout_secs: 60,
            log_level: "debug".to_string(),
            log_format: LogFormat::Pretty,
        }
    }
}

impl ServerConfig {
    /// Get the socket address string
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Check that everything needed to reach Drive is present
    pub fn validate(&self) -> Result<()> {
        if self.drive.folder_id.trim().is_empty() {
            return Err(ServerError::Config(
                "DRIVE_FOLDER_ID is not set (drive.folder_id)".to_string(),
            ));
        }
        if self.drive.api_key.trim().is_empty() {
            return Err(ServerError::Config(
                "GOOGLE_API_KEY is not set (drive.api_key)".to_string(),
            ));
        }
        if self.stream.channel_capacity == 0 {
            return Err(ServerError::Config(
                "stream.channel_capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configured() -> ServerConfig {
        let mut config = ServerConfig::default();
        config.drive.folder_id = "folder".to_string();
        config.drive.api_key = "key".to_string();
        config
    }

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8080);
        assert_eq!(config.catalog.default_artist, "Unknown Artist");
        assert_eq!(config.stream.fallback_content_type, "audio/mpeg");
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert_eq!(config.static_dir, Some(PathBuf::from("static")));
    }

    #[test]
    fn test_socket_addr() {
        let config = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 3000,
            ..Default::default()
        };
        assert_eq!(config.socket_addr(), "127.0.0.1:3000");
    }

    #[test]
    fn test_validate_requires_drive_settings() {
        assert!(configured().validate().is_ok());

        let mut missing_folder = configured();
        missing_folder.drive.folder_id = " ".to_string();
        assert!(matches!(
            missing_folder.validate(),
            Err(ServerError::Config(msg)) if msg.contains("DRIVE_FOLDER_ID")
        ));

        let mut missing_key = configured();
        missing_key.drive.api_key.clear();
        assert!(matches!(
            missing_key.validate(),
            Err(ServerError::Config(msg)) if msg.contains("GOOGLE_API_KEY")
        ));
    }

    #[test]
    fn test_client_config() {
        let mut config = configured();
        config.drive.connect_timeout_secs = 3;
        let client = config.drive.client_config();
        assert_eq!(client.api_key, "key");
        assert_eq!(client.connect_timeout, Duration::from_secs(3));
        assert_eq!(client.page_size, 1000);
    }
}
