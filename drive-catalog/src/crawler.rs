//! Folder crawl and catalog aggregation
//!
//! Walks a folder hierarchy depth-first and flattens every audio leaf into a
//! [`MediaItem`] labelled with the name of its immediate parent folder.
//!
//! The walk keeps an explicit stack of frames instead of recursing, so very
//! deep hierarchies cannot exhaust the call stack. Each frame holds the label
//! for its folder and the entries not yet visited; a sub-folder's frame is
//! pushed at the position the folder was listed, which yields exactly the
//! order a recursive walk would produce.

use std::collections::HashSet;

use tracing::{debug, info, trace, warn};

use crate::error::{DriveError, Result, UpstreamError};
use crate::source::FolderSource;
use crate::types::{ChildFilter, CrawlOutcome, DirEntry, EntryKind, MediaItem, SkippedFolder};

/// Outcome of listing a folder below the root.
///
/// A failed sub-folder is not a crawl error: the subtree contributes nothing.
enum SubtreeListing {
    Listed(Vec<DirEntry>),
    Skipped(UpstreamError),
}

struct Frame {
    label: String,
    entries: std::vec::IntoIter<DirEntry>,
}

impl Frame {
    fn new(label: String, entries: Vec<DirEntry>) -> Self {
        Self {
            label,
            entries: entries.into_iter(),
        }
    }
}

/// Builds catalogs from a [`FolderSource`]
pub struct Crawler<'a, S: FolderSource + ?Sized> {
    source: &'a S,
    filter: ChildFilter,
}

impl<'a, S: FolderSource + ?Sized> Crawler<'a, S> {
    pub fn new(source: &'a S) -> Self {
        Self {
            source,
            filter: ChildFilter::media_and_folders(),
        }
    }

    /// Crawl `root` and return the flat catalog.
    ///
    /// Leaves directly under `root` carry `root_label` as their artist.
    /// Fails only when `root` itself cannot be listed.
    pub async fn crawl(&self, root: &str, root_label: &str) -> Result<Vec<MediaItem>> {
        Ok(self.crawl_outcome(root, root_label).await?.catalog)
    }

    /// Like [`Crawler::crawl`], also reporting the sub-folders that were skipped
    pub async fn crawl_outcome(&self, root: &str, root_label: &str) -> Result<CrawlOutcome> {
        let root_entries = self
            .list_all(root)
            .await
            .map_err(|reason| DriveError::Listing {
                folder: root.to_string(),
                reason,
            })?;

        let mut outcome = CrawlOutcome::default();
        let mut seen_folders: HashSet<String> = HashSet::from([root.to_string()]);
        let mut seen_items: HashSet<String> = HashSet::new();
        let mut stack = vec![Frame::new(root_label.to_string(), root_entries)];

        loop {
            let Some(frame) = stack.last_mut() else {
                break;
            };
            let Some(entry) = frame.entries.next() else {
                stack.pop();
                continue;
            };

            match entry.kind() {
                EntryKind::LeafMedia => {
                    if !seen_items.insert(entry.id.clone()) {
                        trace!("Skipping already catalogued file {}", entry.id);
                        continue;
                    }
                    outcome.catalog.push(MediaItem {
                        id: entry.id,
                        name: entry.name,
                        mime_type: entry.mime_type,
                        artist: frame.label.clone(),
                    });
                }
                EntryKind::Container => {
                    // Multiple parents can make a folder reachable twice, or form a cycle.
                    if !seen_folders.insert(entry.id.clone()) {
                        debug!("Folder {} ({}) already visited", entry.name, entry.id);
                        continue;
                    }
                    match self.list_subtree(&entry.id).await {
                        SubtreeListing::Listed(children) => {
                            stack.push(Frame::new(entry.name, children));
                        }
                        SubtreeListing::Skipped(reason) => {
                            warn!(
                                "Skipping folder {} ({}): {}",
                                entry.name, entry.id, reason
                            );
                            outcome.skipped.push(SkippedFolder {
                                id: entry.id,
                                name: entry.name,
                                reason,
                            });
                        }
                    }
                }
                EntryKind::Other => {
                    trace!("Ignoring {} with type {}", entry.name, entry.mime_type);
                }
            }
        }

        info!(
            "Crawled folder {}: {} item(s), {} folder(s) visited, {} skipped",
            root,
            outcome.catalog.len(),
            seen_folders.len(),
            outcome.skipped.len()
        );
        Ok(outcome)
    }

    async fn list_subtree(&self, folder_id: &str) -> SubtreeListing {
        match self.list_all(folder_id).await {
            Ok(entries) => SubtreeListing::Listed(entries),
            Err(reason) => SubtreeListing::Skipped(reason),
        }
    }

    /// Drain every page of a folder listing into one vector
    async fn list_all(&self, folder_id: &str) -> std::result::Result<Vec<DirEntry>, UpstreamError> {
        let mut entries = Vec::new();
        let mut page_token: Option<String> = None;
        let mut seen_tokens: HashSet<String> = HashSet::new();
        let mut pages = 0usize;

        loop {
            let page = self
                .source
                .list_page(folder_id, &self.filter, page_token.as_deref())
                .await?;
            pages += 1;
            entries.extend(page.entries);

            match page.next_page_token {
                Some(next) if next.is_empty() => break,
                Some(next) if !seen_tokens.insert(next.clone()) => {
                    warn!(
                        "Folder {} returned page token {} twice, stopping pagination",
                        folder_id, next
                    );
                    break;
                }
                Some(next) => page_token = Some(next),
                None => break,
            }
        }

        trace!(
            "Listed folder {}: {} entries over {} page(s)",
            folder_id,
            entries.len(),
            pages
        );
        Ok(entries)
    }
}

/// Crawl `root` with `source`, labelling top-level leaves with `root_label`
pub async fn crawl<S: FolderSource + ?Sized>(
    source: &S,
    root: &str,
    root_label: &str,
) -> Result<Vec<MediaItem>> {
    Crawler::new(source).crawl(root, root_label).await
}
