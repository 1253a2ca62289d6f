use bytes::Bytes;
use futures_util::stream::BoxStream;
use serde::{Deserialize, Serialize};

/// MIME type of the only audio format that is catalogued
pub const AUDIO_MIME: &str = "audio/mpeg";

/// MIME type Drive uses for folders
pub const FOLDER_MIME: &str = "application/vnd.google-apps.folder";

/// Artist label used for leaves found directly under the crawl root
pub const DEFAULT_ARTIST: &str = "Unknown Artist";

/// Kind discriminator for a listing result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    LeafMedia,
    Container,
    Other,
}

impl EntryKind {
    /// Classify an upstream MIME type
    pub fn from_mime(mime_type: &str) -> Self {
        match mime_type {
            FOLDER_MIME => EntryKind::Container,
            AUDIO_MIME => EntryKind::LeafMedia,
            _ => EntryKind::Other,
        }
    }
}

/// One child returned by a folder listing
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirEntry {
    pub id: String,
    pub name: String,
    pub mime_type: String,
}

impl DirEntry {
    pub fn new(id: impl Into<String>, name: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            mime_type: mime_type.into(),
        }
    }

    pub fn kind(&self) -> EntryKind {
        EntryKind::from_mime(&self.mime_type)
    }
}

/// One page of a folder listing
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingPage {
    #[serde(default, rename = "files")]
    pub entries: Vec<DirEntry>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// Which children a listing should return
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildFilter {
    /// Accepted MIME types; an entry matches if its type is any of these
    pub mime_types: Vec<String>,
    /// Skip entries that sit in the trash
    pub exclude_trashed: bool,
}

impl ChildFilter {
    /// Audio leaves and sub-folders, never trashed entries
    pub fn media_and_folders() -> Self {
        Self {
            mime_types: vec![AUDIO_MIME.to_string(), FOLDER_MIME.to_string()],
            exclude_trashed: true,
        }
    }

    pub fn accepts(&self, mime_type: &str) -> bool {
        self.mime_types.iter().any(|m| m == mime_type)
    }
}

/// A catalogued audio file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaItem {
    pub id: String,
    pub name: String,
    pub mime_type: String,
    pub artist: String,
}

/// A sub-folder whose listing failed and was left out of the catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedFolder {
    pub id: String,
    pub name: String,
    pub reason: crate::error::UpstreamError,
}

/// Result of one crawl: the catalog plus the subtrees that could not be read
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlOutcome {
    pub catalog: Vec<MediaItem>,
    pub skipped: Vec<SkippedFolder>,
}

/// An opened upstream download
pub struct ContentStream {
    pub body: BoxStream<'static, std::io::Result<Bytes>>,
    pub content_type: Option<String>,
    pub content_length: Option<u64>,
}

impl ContentStream {
    pub fn new(body: BoxStream<'static, std::io::Result<Bytes>>) -> Self {
        Self {
            body,
            content_type: None,
            content_length: None,
        }
    }
}

impl std::fmt::Debug for ContentStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentStream")
            .field("content_type", &self.content_type)
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}
