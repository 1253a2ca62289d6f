//! Configuration file support
//!
//! Loads server configuration from TOML files. Every section except
//! `[server]` is optional; missing values fall back to the defaults in
//! [`ServerConfig`].

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::config::{LogFormat, ServerConfig};
use crate::error::{Result, ServerError};

/// Configuration file format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Server settings
    pub server: ServerSettings,
    /// Drive settings
    pub drive: Option<DriveSettings>,
    /// Catalog settings
    pub catalog: Option<CatalogSettings>,
    /// Stream relay settings
    pub stream: Option<StreamSettings>,
    /// Logging settings
    pub logging: Option<LoggingSettings>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Host address to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Enable CORS
    pub cors_enabled: Option<bool>,
    /// Request timeout in seconds
    pub request_timeout_secs: Option<u64>,
    /// Directory with the web player's static files
    pub static_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DriveSettings {
    /// Root folder of the catalog
    pub folder_id: Option<String>,
    /// Drive API key
    pub api_key: Option<String>,
    /// Drive v3 endpoint
    pub api_base: Option<String>,
    /// Listing page size
    pub page_size: Option<u32>,
    /// Connect timeout in seconds
    pub connect_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogSettings {
    /// Artist for songs directly in the root folder
    pub default_artist: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamSettings {
    /// Chunks buffered per relayed stream
    pub channel_capacity: Option<usize>,
    /// Content-Type used when upstream reports none
    pub fallback_content_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Output format (json, pretty)
    pub format: Option<LogFormat>,
}

impl ConfigFile {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| ServerError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Save configuration to a TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ServerError::Config(format!("Failed to render config: {}", e)))?;
        std::fs::write(path.as_ref(), content)?;
        Ok(())
    }

    /// Generate default configuration file
    pub fn default_config() -> Self {
        let defaults = ServerConfig::default();
        Self {
            server: ServerSettings {
                host: defaults.host,
                port: defaults.port,
                cors_enabled: Some(defaults.cors_enabled),
                request_timeout_secs: Some(defaults.request_timeout_secs),
                static_dir: defaults.static_dir,
            },
            drive: Some(DriveSettings {
                folder_id: Some(String::new()),
                api_key: None,
                api_base: Some(defaults.drive.api_base),
                page_size: Some(defaults.drive.page_size),
                connect_timeout_secs: Some(defaults.drive.connect_timeout_secs),
            }),
            catalog: Some(CatalogSettings {
                default_artist: defaults.catalog.default_artist,
            }),
            stream: Some(StreamSettings {
                channel_capacity: Some(defaults.stream.channel_capacity),
                fallback_content_type: Some(defaults.stream.fallback_content_type),
            }),
            logging: Some(LoggingSettings {
                level: defaults.log_level,
                format: Some(defaults.log_format),
            }),
        }
    }

    /// Convert to ServerConfig
    pub fn into_server_config(self) -> ServerConfig {
        let defaults = ServerConfig::default();
        let drive = self.drive.unwrap_or_default();

        ServerConfig {
            host: self.server.host,
            port: self.server.port,
            drive: crate::config::DriveConfig {
                folder_id: drive.folder_id.unwrap_or(defaults.drive.folder_id),
                api_key: drive.api_key.unwrap_or(defaults.drive.api_key),
                api_base: drive.api_base.unwrap_or(defaults.drive.api_base),
                page_size: drive.page_size.unwrap_or(defaults.drive.page_size),
                connect_timeout_secs: drive
                    .connect_timeout_secs
                    .unwrap_or(defaults.drive.connect_timeout_secs),
            },
            catalog: self
                .catalog
                .map(|c| crate::config::CatalogConfig {
                    default_artist: c.default_artist,
                })
                .unwrap_or(defaults.catalog),
            stream: match self.stream {
                Some(s) => crate::config::StreamConfig {
                    channel_capacity: s
                        .channel_capacity
                        .unwrap_or(defaults.stream.channel_capacity),
                    fallback_content_type: s
                        .fallback_content_type
                        .unwrap_or(defaults.stream.fallback_content_type),
                },
                None => defaults.stream,
            },
            static_dir: self.server.static_dir.or(defaults.static_dir),
            cors_enabled: self.server.cors_enabled.unwrap_or(defaults.cors_enabled),
            request_timeout_secs: self
                .server
                .request_timeout_secs
                .unwrap_or(defaults.request_timeout_secs),
            log_level: self
                .logging
                .as_ref()
                .map(|l| l.level.clone())
                .unwrap_or(defaults.log_level),
            log_format: self
                .logging
                .and_then(|l| l.format)
                .unwrap_or(defaults.log_format),
        }
    }
}

/// Generate default configuration file at the specified path
pub fn generate_default_config<P: AsRef<Path>>(path: P) -> Result<()> {
    ConfigFile::default_config().to_file(path)
}

/// Load `path` if it exists, otherwise start from defaults.
///
/// A file that exists but cannot be parsed is an error.
pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<ServerConfig> {
    let path = path.as_ref();
    if path.exists() {
        Ok(ConfigFile::from_file(path)?.into_server_config())
    } else {
        Ok(ServerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = ConfigFile::default_config();
        assert_eq!(config.server.port, 8080);
        assert_eq!(
            config.catalog.as_ref().unwrap().default_artist,
            "Unknown Artist"
        );
        assert_eq!(config.drive.as_ref().unwrap().page_size, Some(1000));
    }

    #[test]
    fn test_config_file_roundtrip() {
        let config = ConfigFile::default_config();

        let mut temp_file = NamedTempFile::new().unwrap();
        let content = toml::to_string_pretty(&config).unwrap();
        temp_file.write_all(content.as_bytes()).unwrap();

        let loaded = ConfigFile::from_file(temp_file.path()).unwrap();
        assert_eq!(loaded.server.port, config.server.port);
        assert_eq!(loaded.server.static_dir, Some(PathBuf::from("static")));
    }

    #[test]
    fn test_minimal_file_uses_defaults() {
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(
            temp_file,
            r#"
[server]
host = "127.0.0.1"
port = 9000

[drive]
folder_id = "abc"
api_key = "secret"

[logging]
level = "debug"
format = "json"
"#
        )
        .unwrap();

        let config = ConfigFile::from_file(temp_file.path())
            .unwrap()
            .into_server_config();

        assert_eq!(config.socket_addr(), "127.0.0.1:9000");
        assert_eq!(config.drive.folder_id, "abc");
        assert_eq!(config.drive.api_key, "secret");
        assert_eq!(config.drive.page_size, 1000);
        assert_eq!(config.catalog.default_artist, "Unknown Artist");
        assert_eq!(config.stream.channel_capacity, 8);
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.log_format, LogFormat::Json);
        assert!(config.cors_enabled);
        assert_eq!(config.static_dir, ServerConfig::default().static_dir);
    }

    #[test]
    fn test_invalid_file_is_config_error() {
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "[server]\nport = \"not a number\"\n").unwrap();

        let err = ConfigFile::from_file(temp_file.path()).unwrap_err();
        assert!(matches!(err, ServerError::Config(_)));
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_or_default(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn test_generate_default_config() {
        let temp_file = NamedTempFile::new().unwrap();
        let path = temp_file.path().to_path_buf();

        generate_default_config(&path).unwrap();

        assert!(path.exists());
        let loaded = ConfigFile::from_file(&path).unwrap().into_server_config();
        let defaults = ServerConfig::default();
        assert_eq!(loaded.port, defaults.port);
        assert_eq!(loaded.static_dir, defaults.static_dir);
        assert_eq!(loaded.request_timeout_secs, defaults.request_timeout_secs);
    }
}
