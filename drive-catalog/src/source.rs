//! Collaborator capabilities the crawler and relay are written against.

use async_trait::async_trait;

use crate::error::UpstreamError;
use crate::types::{ChildFilter, ContentStream, ListingPage};

/// Lists the children of a folder, one page at a time
#[async_trait]
pub trait FolderSource: Send + Sync {
    /// Fetch one page of `folder_id`'s children matching `filter`.
    ///
    /// `page_token` is `None` for the first page and the previous page's
    /// `next_page_token` afterwards.
    async fn list_page(
        &self,
        folder_id: &str,
        filter: &ChildFilter,
        page_token: Option<&str>,
    ) -> Result<ListingPage, UpstreamError>;
}

/// Opens the content of a file as a byte stream
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Single-shot download; no resumption or ranges.
    async fn open_content(&self, file_id: &str) -> Result<ContentStream, UpstreamError>;
}

/// A backend providing both capabilities
pub trait MediaSource: FolderSource + ContentSource {}

impl<T: FolderSource + ContentSource> MediaSource for T {}
