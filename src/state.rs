//! Application state management
//!
//! Holds the server configuration and the media backend shared by all
//! handlers. Nothing in here is mutated after startup; each request owns its
//! catalog or relay pipeline exclusively.

use std::sync::Arc;

use drive_catalog::MediaSource;

use crate::config::ServerConfig;

/// Application state shared across all handlers
pub struct AppState {
    /// Listing and download backend
    pub source: Arc<dyn MediaSource>,

    /// Server configuration
    pub config: ServerConfig,
}

impl AppState {
    /// Create a new AppState with the given configuration and backend
    pub fn new(config: ServerConfig, source: Arc<dyn MediaSource>) -> Self {
        Self { source, config }
    }

    /// Folder the catalog is built from
    pub fn root_folder(&self) -> &str {
        &self.config.drive.folder_id
    }

    /// Artist for songs directly in the root folder
    pub fn default_artist(&self) -> &str {
        &self.config.catalog.default_artist
    }
}
