//! Command line arguments.
//!
//! Flags override the configuration file; each flag can also be supplied
//! through the environment variable named next to it.

use clap::Parser;
use std::path::PathBuf;

use crate::config::ServerConfig;

/// Drive music catalog and streaming server.
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "drive-jukebox")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (TOML).
    #[arg(default_value = "config.toml")]
    pub config: PathBuf,

    /// Address to bind to.
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on.
    #[arg(short, long, env = "PORT")]
    pub port: Option<u16>,

    /// Drive folder the catalog is built from.
    #[arg(short = 'f', long, env = "DRIVE_FOLDER_ID")]
    pub folder_id: Option<String>,

    /// Drive API key.
    #[arg(long, env = "GOOGLE_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Directory with the web player's static files.
    #[arg(long)]
    pub static_dir: Option<PathBuf>,

    /// Logging level (trace, debug, info, warn, error).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Write a default configuration file to this path and exit.
    #[arg(long, value_name = "PATH")]
    pub generate_config: Option<PathBuf>,
}

impl Cli {
    /// Overlay the flags that were given onto `config`
    pub fn apply(&self, config: &mut ServerConfig) {
        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(folder_id) = &self.folder_id {
            config.drive.folder_id = folder_id.clone();
        }
        if let Some(api_key) = &self.api_key {
            config.drive.api_key = api_key.clone();
        }
        if let Some(dir) = &self.static_dir {
            config.static_dir = Some(dir.clone());
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_config() {
        let cli = Cli::try_parse_from([
            "drive-jukebox",
            "custom.toml",
            "--port",
            "9090",
            "--folder-id",
            "abc",
            "--api-key",
            "secret",
            "--static-dir",
            "web",
        ])
        .unwrap();
        let mut config = ServerConfig::default();
        config.host = "10.0.0.1".to_string();

        cli.apply(&mut config);

        assert_eq!(cli.config, PathBuf::from("custom.toml"));
        assert_eq!(config.host, "10.0.0.1");
        assert_eq!(config.port, 9090);
        assert_eq!(config.drive.folder_id, "abc");
        assert_eq!(config.drive.api_key, "secret");
        assert_eq!(config.static_dir, Some(PathBuf::from("web")));
    }

    #[test]
    fn test_absent_flags_keep_config() {
        let cli = Cli {
            config: PathBuf::from("config.toml"),
            ..Default::default()
        };
        let mut config = ServerConfig::default();
        config.drive.folder_id = "from-file".to_string();

        cli.apply(&mut config);

        assert_eq!(config.drive.folder_id, "from-file");
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
