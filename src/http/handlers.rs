//! HTTP request handlers
//!
//! Implements the catalog and stream endpoints on top of the crawler and
//! relay from `drive_catalog`.

use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use futures_util::stream;
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::mpsc;

use drive_catalog::{Crawler, DriveError, UpstreamError};

use crate::state::AppState;

/// Response header carrying the number of folders left out of a catalog
pub const SKIPPED_FOLDERS_HEADER: &str = "x-catalog-skipped-folders";

/// HTTP error type
#[derive(Debug)]
pub enum HttpError {
    BadRequest(String),
    NotFound(String),
    Forbidden(String),
    BadGateway(String),
    InternalError(String),
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            HttpError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            HttpError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            HttpError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            HttpError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, msg),
            HttpError::InternalError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        (status, body).into_response()
    }
}

impl From<DriveError> for HttpError {
    fn from(err: DriveError) -> Self {
        match &err {
            DriveError::Listing { .. } => {
                HttpError::BadGateway(format!("Failed to list songs: {}", err))
            }
            DriveError::Open {
                reason: UpstreamError::NotFound,
                ..
            } => HttpError::NotFound(err.to_string()),
            DriveError::Open {
                reason: UpstreamError::AccessDenied,
                ..
            } => HttpError::Forbidden(err.to_string()),
            DriveError::Open { .. } => {
                HttpError::BadGateway(format!("Failed to get file stream: {}", err))
            }
            DriveError::Config(_) | DriveError::Copy { .. } => {
                HttpError::InternalError(err.to_string())
            }
        }
    }
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "OK"
}

/// Version endpoint
pub async fn version_check() -> &'static str {
    concat!("drive-jukebox v", env!("CARGO_PKG_VERSION"))
}

/// Song catalog endpoint
/// GET /api/songs
pub async fn list_songs(State(state): State<Arc<AppState>>) -> Result<Response, HttpError> {
    let outcome = Crawler::new(state.source.as_ref())
        .crawl_outcome(state.root_folder(), state.default_artist())
        .await
        .map_err(|e| {
            tracing::error!("Catalog crawl failed: {}", e);
            HttpError::from(e)
        })?;

    let mut headers = HeaderMap::new();
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    if !outcome.skipped.is_empty() {
        headers.insert(
            SKIPPED_FOLDERS_HEADER,
            HeaderValue::from(outcome.skipped.len()),
        );
    }

    Ok((headers, Json(outcome.catalog)).into_response())
}

/// Query parameters for stream requests
#[derive(Debug, Deserialize)]
pub struct StreamParams {
    pub id: Option<String>,
}

/// File stream endpoint
/// GET /api/stream?id={file_id}
///
/// The upstream download is opened before the response head is produced, so
/// open failures still map to an error status. Copying then runs in its own
/// task feeding a bounded channel that backs the response body. Dropping the
/// body closes the channel, which cancels the copy and releases the upstream
/// even while it is waiting for data.
pub async fn stream_file(
    State(state): State<Arc<AppState>>,
    Query(params): Query<StreamParams>,
) -> Result<Response, HttpError> {
    let file_id = params
        .id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| HttpError::BadRequest("Missing id parameter".to_string()))?;

    let opened = drive_catalog::open(state.source.as_ref(), &file_id)
        .await
        .map_err(|e| {
            tracing::warn!("{}", e);
            HttpError::from(e)
        })?;

    let content_type = opened
        .content_type()
        .filter(|t| t.starts_with("audio/"))
        .unwrap_or(&state.config.stream.fallback_content_type)
        .to_string();
    let content_length = opened.content_length();

    let (mut tx, rx) =
        mpsc::channel::<std::io::Result<Bytes>>(state.config.stream.channel_capacity);
    let client = tx.clone();
    tokio::spawn(async move {
        let result = tokio::select! {
            result = opened.copy_to(&mut tx) => result,
            _ = client.closed() => {
                tracing::debug!("Client left, dropping upstream of {}", file_id);
                return;
            }
        };
        match result {
            Ok(written) => tracing::debug!("Streamed {} bytes of {}", written, file_id),
            Err(e) => {
                tracing::warn!("Stream of {} truncated: {}", file_id, e);
                // An error item aborts the response instead of ending it cleanly
                let _ = tx.send(Err(std::io::Error::other(e.to_string()))).await;
            }
        }
    });

    let body_stream = stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|item| (item, rx))
    });

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(&content_type)
            .map_err(|e| HttpError::InternalError(e.to_string()))?,
    );
    if let Some(len) = content_length {
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(len));
    }

    Ok((headers, Body::from_stream(body_stream)).into_response())
}
