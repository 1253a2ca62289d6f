//! Google Drive v3 REST client.
//!
//! Lists folders through `files.list` with a `q` query built from a
//! [`ChildFilter`], and downloads content through `files.get?alt=media`.
//! Authentication is by API key only, so the tree must be shared publicly.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{StreamExt, TryStreamExt};
use reqwest::{header, Response, Url};
use tracing::{debug, trace};

use crate::error::{DriveError, Result, UpstreamError};
use crate::source::{ContentSource, FolderSource};
use crate::types::{ChildFilter, ContentStream, ListingPage};

/// Public Drive v3 endpoint
pub const DEFAULT_API_BASE: &str = "https://www.googleapis.com/drive/v3";

const LIST_FIELDS: &str = "nextPageToken, files(id, name, mimeType)";

/// Settings for [`DriveClient`]
#[derive(Debug, Clone)]
pub struct DriveClientConfig {
    pub api_key: String,
    pub api_base: String,
    /// Entries requested per listing page (Drive caps this at 1000)
    pub page_size: u32,
    pub connect_timeout: Duration,
}

impl DriveClientConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_base: DEFAULT_API_BASE.to_string(),
            page_size: 1000,
            connect_timeout: Duration::from_secs(10),
        }
    }
}

/// Drive HTTP client.
#[derive(Clone)]
pub struct DriveClient {
    inner: Arc<DriveClientInner>,
}

struct DriveClientInner {
    api_key: String,
    api_base: Url,
    page_size: u32,
    http_client: reqwest::Client,
}

impl DriveClient {
    /// Create a new Drive client from configuration.
    pub fn new(config: DriveClientConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(DriveError::Config("Drive API key is empty".to_string()));
        }

        let api_base = Url::parse(config.api_base.trim_end_matches('/')).map_err(|e| {
            DriveError::Config(format!("Invalid Drive API base {}: {}", config.api_base, e))
        })?;
        if api_base.cannot_be_a_base() {
            return Err(DriveError::Config(format!(
                "Drive API base {} cannot be a base URL",
                config.api_base
            )));
        }

        let http_client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| DriveError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            inner: Arc::new(DriveClientInner {
                api_key: config.api_key,
                api_base,
                page_size: config.page_size.clamp(1, 1000),
                http_client,
            }),
        })
    }

    /// Build a URL below the API base, one path segment per element.
    fn build_url(&self, segments: &[&str]) -> Url {
        let mut url = self.inner.api_base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    pub fn api_base(&self) -> &str {
        self.inner.api_base.as_str()
    }
}

/// Render a listing filter as a Drive `q` expression scoped to `folder_id`
pub fn folder_query(folder_id: &str, filter: &ChildFilter) -> String {
    let mut clauses = vec![format!("'{}' in parents", escape_literal(folder_id))];

    if !filter.mime_types.is_empty() {
        let types: Vec<String> = filter
            .mime_types
            .iter()
            .map(|m| format!("mimeType = '{}'", escape_literal(m)))
            .collect();
        clauses.push(format!("({})", types.join(" or ")));
    }
    if filter.exclude_trashed {
        clauses.push("trashed = false".to_string());
    }

    clauses.join(" and ")
}

/// Escape a value for use inside a single-quoted query literal
fn escape_literal(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

fn check_status(response: Response) -> std::result::Result<Response, UpstreamError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(UpstreamError::from_status(status.as_u16()))
    }
}

#[async_trait]
impl FolderSource for DriveClient {
    async fn list_page(
        &self,
        folder_id: &str,
        filter: &ChildFilter,
        page_token: Option<&str>,
    ) -> std::result::Result<ListingPage, UpstreamError> {
        let query = folder_query(folder_id, filter);
        let page_size = self.inner.page_size.to_string();
        trace!("Listing {} (page token {:?})", folder_id, page_token);

        let mut request = self
            .inner
            .http_client
            .get(self.build_url(&["files"]))
            .header(header::ACCEPT, "application/json")
            .query(&[
                ("q", query.as_str()),
                ("fields", LIST_FIELDS),
                ("pageSize", page_size.as_str()),
                ("key", self.inner.api_key.as_str()),
            ]);
        if let Some(token) = page_token {
            request = request.query(&[("pageToken", token)]);
        }

        let response = check_status(request.send().await?)?;
        let page: ListingPage = response.json().await?;
        Ok(page)
    }
}

#[async_trait]
impl ContentSource for DriveClient {
    async fn open_content(&self, file_id: &str) -> std::result::Result<ContentStream, UpstreamError> {
        let request = self
            .inner
            .http_client
            .get(self.build_url(&["files", file_id]))
            .query(&[("alt", "media"), ("key", self.inner.api_key.as_str())]);

        let response = check_status(request.send().await?)?;
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let content_length = response.content_length();
        debug!(
            "Opened {} ({}, {:?} bytes)",
            file_id,
            content_type.as_deref().unwrap_or("unknown type"),
            content_length
        );

        let body = response
            .bytes_stream()
            .map_err(std::io::Error::other)
            .boxed();

        Ok(ContentStream {
            body,
            content_type,
            content_length,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AUDIO_MIME, FOLDER_MIME};
    use axum::extract::{Path, Query};
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use axum::routing::get;
    use axum::{Json, Router};
    use std::collections::HashMap;

    async fn list_files(Query(params): Query<HashMap<String, String>>) -> axum::response::Response {
        if params.get("key").map(String::as_str) != Some("test-key") {
            return StatusCode::FORBIDDEN.into_response();
        }
        let q = params.get("q").cloned().unwrap_or_default();
        if q.starts_with("'missing' in parents") {
            return StatusCode::NOT_FOUND.into_response();
        }
        match params.get("pageToken").map(String::as_str) {
            None => Json(serde_json::json!({
                "nextPageToken": "p2",
                "files": [
                    {"id": "f1", "name": "Beatles", "mimeType": FOLDER_MIME},
                ]
            }))
            .into_response(),
            Some("p2") => Json(serde_json::json!({
                "files": [
                    {"id": "s1", "name": "track1.mp3", "mimeType": AUDIO_MIME},
                ]
            }))
            .into_response(),
            Some(_) => StatusCode::BAD_REQUEST.into_response(),
        }
    }

    async fn get_file(
        Path(id): Path<String>,
        Query(params): Query<HashMap<String, String>>,
    ) -> axum::response::Response {
        if params.get("alt").map(String::as_str) != Some("media") {
            return StatusCode::BAD_REQUEST.into_response();
        }
        match id.as_str() {
            "s1" => ([(header::CONTENT_TYPE, AUDIO_MIME)], "ID3-audio-bytes").into_response(),
            "private" => StatusCode::UNAUTHORIZED.into_response(),
            "broken" => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
            _ => StatusCode::NOT_FOUND.into_response(),
        }
    }

    async fn fake_drive() -> DriveClient {
        let app = Router::new()
            .route("/drive/v3/files", get(list_files))
            .route("/drive/v3/files/{id}", get(get_file));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let mut config = DriveClientConfig::new("test-key");
        config.api_base = format!("http://{}/drive/v3/", addr);
        DriveClient::new(config).unwrap()
    }

    #[test]
    fn test_folder_query() {
        let q = folder_query("abc123", &ChildFilter::media_and_folders());
        assert_eq!(
            q,
            "'abc123' in parents and (mimeType = 'audio/mpeg' or mimeType = \
             'application/vnd.google-apps.folder') and trashed = false"
        );
    }

    #[test]
    fn test_folder_query_escapes_quotes() {
        let filter = ChildFilter {
            mime_types: vec![],
            exclude_trashed: false,
        };
        assert_eq!(folder_query(r"it's\x", &filter), r"'it\'s\\x' in parents");
    }

    #[test]
    fn test_rejects_empty_key_and_bad_base() {
        assert!(matches!(
            DriveClient::new(DriveClientConfig::new("  ")),
            Err(DriveError::Config(_))
        ));

        let mut config = DriveClientConfig::new("key");
        config.api_base = "not a url".to_string();
        assert!(matches!(DriveClient::new(config), Err(DriveError::Config(_))));
    }

    #[test]
    fn test_build_url_encodes_segments() {
        let client = DriveClient::new(DriveClientConfig::new("key")).unwrap();
        let url = client.build_url(&["files", "a/b?c"]);
        assert_eq!(
            url.as_str(),
            "https://www.googleapis.com/drive/v3/files/a%2Fb%3Fc"
        );
    }

    #[tokio::test]
    async fn test_list_pages_against_fake_drive() {
        let client = fake_drive().await;
        let filter = ChildFilter::media_and_folders();

        let first = client.list_page("root", &filter, None).await.unwrap();
        assert_eq!(first.entries[0].name, "Beatles");
        assert_eq!(first.next_page_token.as_deref(), Some("p2"));

        let second = client.list_page("root", &filter, Some("p2")).await.unwrap();
        assert_eq!(second.entries[0].id, "s1");
        assert!(second.next_page_token.is_none());

        let err = client.list_page("missing", &filter, None).await.unwrap_err();
        assert_eq!(err, UpstreamError::NotFound);
    }

    #[tokio::test]
    async fn test_crawl_against_fake_drive() {
        let client = fake_drive().await;
        // Every folder answers with the same two pages, so "Beatles" lists
        // itself and the root's track again. Both are visited once.
        let catalog = crate::crawler::crawl(&client, "root", "Unknown Artist")
            .await
            .unwrap();
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog[0].id, "s1");
        assert_eq!(catalog[0].artist, "Beatles");
    }

    #[tokio::test]
    async fn test_open_content_against_fake_drive() {
        let client = fake_drive().await;

        let mut sink: Vec<u8> = Vec::new();
        let written = crate::relay::relay(&client, "s1", &mut sink).await.unwrap();
        assert_eq!(written, 15);
        assert_eq!(sink, b"ID3-audio-bytes");

        let opened = crate::relay::open(&client, "s1").await.unwrap();
        assert_eq!(opened.content_type(), Some(AUDIO_MIME));
        assert_eq!(opened.content_length(), Some(15));

        for (id, expected) in [
            ("private", UpstreamError::AccessDenied),
            ("broken", UpstreamError::Status(500)),
            ("gone", UpstreamError::NotFound),
        ] {
            let err = client.open_content(id).await.unwrap_err();
            assert_eq!(err, expected);
        }
    }
}
