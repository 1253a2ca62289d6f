//! In-memory folder tree implementing both collaborator traits.
//!
//! Used to run the crawler, the relay and the HTTP layer against a fixture
//! tree. Listings honour [`ChildFilter`] and paginate with a
//! configurable page size; downloads are served in fixed-size chunks and can
//! be made to fail at open time or part way through.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::{self, StreamExt};

use crate::error::UpstreamError;
use crate::source::{ContentSource, FolderSource};
use crate::types::{ChildFilter, ContentStream, DirEntry, ListingPage, AUDIO_MIME, FOLDER_MIME};

const DEFAULT_PAGE_SIZE: usize = 100;
const DEFAULT_CHUNK_SIZE: usize = 16 * 1024;

#[derive(Debug)]
pub struct MemoryDrive {
    nodes: HashMap<String, DirEntry>,
    children: HashMap<String, Vec<String>>,
    contents: HashMap<String, Bytes>,
    trashed: HashSet<String>,
    listing_failures: HashMap<String, UpstreamError>,
    open_failures: HashMap<String, UpstreamError>,
    interruptions: HashMap<String, usize>,
    page_size: usize,
    chunk_size: usize,
    list_calls: AtomicUsize,
}

impl Default for MemoryDrive {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDrive {
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            children: HashMap::new(),
            contents: HashMap::new(),
            trashed: HashSet::new(),
            listing_failures: HashMap::new(),
            open_failures: HashMap::new(),
            interruptions: HashMap::new(),
            page_size: DEFAULT_PAGE_SIZE,
            chunk_size: DEFAULT_CHUNK_SIZE,
            list_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Register a folder that has no parent
    pub fn add_root(&mut self, id: &str) {
        self.children.entry(id.to_string()).or_default();
    }

    pub fn add_folder(&mut self, parent: &str, id: &str, name: &str) {
        self.insert(parent, DirEntry::new(id, name, FOLDER_MIME));
        self.children.entry(id.to_string()).or_default();
    }

    pub fn add_audio(&mut self, parent: &str, id: &str, name: &str, data: impl Into<Bytes>) {
        self.add_file(parent, id, name, AUDIO_MIME, data);
    }

    pub fn add_file(
        &mut self,
        parent: &str,
        id: &str,
        name: &str,
        mime_type: &str,
        data: impl Into<Bytes>,
    ) {
        self.insert(parent, DirEntry::new(id, name, mime_type));
        self.contents.insert(id.to_string(), data.into());
    }

    /// Give an existing node an additional parent
    pub fn link(&mut self, parent: &str, id: &str) {
        self.children
            .entry(parent.to_string())
            .or_default()
            .push(id.to_string());
    }

    pub fn trash(&mut self, id: &str) {
        self.trashed.insert(id.to_string());
    }

    /// Make every listing of `folder_id` fail with `err`
    pub fn fail_listing(&mut self, folder_id: &str, err: UpstreamError) {
        self.listing_failures.insert(folder_id.to_string(), err);
    }

    /// Make opening `file_id` fail with `err`
    pub fn fail_open(&mut self, file_id: &str, err: UpstreamError) {
        self.open_failures.insert(file_id.to_string(), err);
    }

    /// Cut the download of `file_id` after `after_bytes` bytes
    pub fn interrupt_stream(&mut self, file_id: &str, after_bytes: usize) {
        self.interruptions.insert(file_id.to_string(), after_bytes);
    }

    /// Number of listing pages served so far
    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::Relaxed)
    }

    fn insert(&mut self, parent: &str, entry: DirEntry) {
        let id = entry.id.clone();
        self.nodes.insert(id.clone(), entry);
        self.children
            .entry(parent.to_string())
            .or_default()
            .push(id);
    }

    fn matching_children(&self, folder_id: &str, filter: &ChildFilter) -> Option<Vec<DirEntry>> {
        let ids = self.children.get(folder_id)?;
        let entries = ids
            .iter()
            .filter(|id| !(filter.exclude_trashed && self.trashed.contains(*id)))
            .filter_map(|id| self.nodes.get(id))
            .filter(|entry| filter.accepts(&entry.mime_type))
            .cloned()
            .collect();
        Some(entries)
    }
}

#[async_trait]
impl FolderSource for MemoryDrive {
    async fn list_page(
        &self,
        folder_id: &str,
        filter: &ChildFilter,
        page_token: Option<&str>,
    ) -> Result<ListingPage, UpstreamError> {
        self.list_calls.fetch_add(1, Ordering::Relaxed);

        if let Some(err) = self.listing_failures.get(folder_id) {
            return Err(err.clone());
        }
        let entries = self
            .matching_children(folder_id, filter)
            .ok_or(UpstreamError::NotFound)?;

        let offset = match page_token {
            Some(token) => token
                .parse::<usize>()
                .map_err(|_| UpstreamError::Status(400))?,
            None => 0,
        };
        let end = (offset + self.page_size).min(entries.len());
        let next_page_token = (end < entries.len()).then(|| end.to_string());

        Ok(ListingPage {
            entries: entries.get(offset..end).unwrap_or_default().to_vec(),
            next_page_token,
        })
    }
}

#[async_trait]
impl ContentSource for MemoryDrive {
    async fn open_content(&self, file_id: &str) -> Result<ContentStream, UpstreamError> {
        if let Some(err) = self.open_failures.get(file_id) {
            return Err(err.clone());
        }
        let data = self
            .contents
            .get(file_id)
            .cloned()
            .ok_or(UpstreamError::NotFound)?;
        let content_type = self.nodes.get(file_id).map(|n| n.mime_type.clone());
        let content_length = data.len() as u64;

        let (data, interrupted) = match self.interruptions.get(file_id) {
            Some(&after) if after < data.len() => (data.slice(..after), true),
            _ => (data, false),
        };

        let mut chunks: Vec<std::io::Result<Bytes>> = Vec::new();
        let mut offset = 0;
        while offset < data.len() {
            let end = (offset + self.chunk_size).min(data.len());
            chunks.push(Ok(data.slice(offset..end)));
            offset = end;
        }
        if interrupted {
            chunks.push(Err(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "upstream connection reset",
            )));
        }

        Ok(ContentStream {
            body: stream::iter(chunks).boxed(),
            content_type,
            content_length: Some(content_length),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_pagination_tokens() {
        let mut drive = MemoryDrive::new().with_page_size(2);
        drive.add_root("root");
        for n in 0..3 {
            drive.add_audio("root", &format!("f{n}"), "song.mp3", "x");
        }
        let filter = ChildFilter::media_and_folders();

        let first = drive.list_page("root", &filter, None).await.unwrap();
        assert_eq!(first.entries.len(), 2);
        assert_eq!(first.next_page_token.as_deref(), Some("2"));

        let second = drive.list_page("root", &filter, Some("2")).await.unwrap();
        assert_eq!(second.entries.len(), 1);
        assert!(second.next_page_token.is_none());
        assert_eq!(drive.list_calls(), 2);
    }

    #[tokio::test]
    async fn test_filter_applied() {
        let mut drive = MemoryDrive::new();
        drive.add_root("root");
        drive.add_file("root", "doc", "notes.txt", "text/plain", "x");
        drive.add_audio("root", "a", "a.mp3", "x");

        let page = drive
            .list_page("root", &ChildFilter::media_and_folders(), None)
            .await
            .unwrap();
        assert_eq!(page.entries.len(), 1);
        assert_eq!(page.entries[0].id, "a");
    }

    #[tokio::test]
    async fn test_unknown_folder_not_found() {
        let drive = MemoryDrive::new();
        let err = drive
            .list_page("missing", &ChildFilter::media_and_folders(), None)
            .await
            .unwrap_err();
        assert_eq!(err, UpstreamError::NotFound);
    }

    #[tokio::test]
    async fn test_chunked_content() {
        let mut drive = MemoryDrive::new().with_chunk_size(4);
        drive.add_root("root");
        drive.add_audio("root", "a", "a.mp3", &b"0123456789"[..]);

        let opened = drive.open_content("a").await.unwrap();
        assert_eq!(opened.content_type.as_deref(), Some(AUDIO_MIME));
        assert_eq!(opened.content_length, Some(10));

        let chunks: Vec<Bytes> = opened
            .body
            .map(|c| c.unwrap())
            .collect::<Vec<_>>()
            .await;
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks.concat(), b"0123456789");
    }
}
