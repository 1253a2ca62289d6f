use thiserror::Error;

/// Main error type for catalog crawls and stream relays
#[derive(Error, Debug)]
pub enum DriveError {
    /// Missing or invalid client configuration (credentials, base URL)
    #[error("Configuration error: {0}")]
    Config(String),

    /// The listing of the crawl root failed, so no catalog was produced
    #[error("Failed to list folder {folder}: {reason}")]
    Listing {
        folder: String,
        reason: UpstreamError,
    },

    /// The upstream content stream could not be opened; nothing was written
    #[error("Failed to open file {file}: {reason}")]
    Open { file: String, reason: UpstreamError },

    /// Copying stopped part way; `written` bytes already reached the sink
    #[error("Stream copy failed after {written} bytes: {source}")]
    Copy {
        written: u64,
        #[source]
        source: std::io::Error,
    },
}

impl DriveError {
    /// Bytes that reached the sink before the failure.
    ///
    /// Only a copy failure can leave output behind; every other variant
    /// guarantees nothing was produced.
    pub fn bytes_written(&self) -> u64 {
        match self {
            DriveError::Copy { written, .. } => *written,
            _ => 0,
        }
    }

    /// The collaborator-level reason, when the failure came from upstream
    pub fn upstream(&self) -> Option<&UpstreamError> {
        match self {
            DriveError::Listing { reason, .. } | DriveError::Open { reason, .. } => Some(reason),
            _ => None,
        }
    }
}

/// Failure reported by a listing or download collaborator
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UpstreamError {
    /// The identifier does not name an accessible node
    #[error("not found")]
    NotFound,

    /// Credentials were rejected or lack access to the node
    #[error("access denied")]
    AccessDenied,

    /// Any other non-success HTTP status
    #[error("upstream returned status {0}")]
    Status(u16),

    /// Connection, TLS or timeout failure
    #[error("transport error: {0}")]
    Transport(String),

    /// The response body could not be decoded
    #[error("malformed response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for UpstreamError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            UpstreamError::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            UpstreamError::from_status(status.as_u16())
        } else {
            UpstreamError::Transport(err.to_string())
        }
    }
}

impl UpstreamError {
    /// Classify a non-success HTTP status
    pub fn from_status(status: u16) -> Self {
        match status {
            404 => UpstreamError::NotFound,
            401 | 403 => UpstreamError::AccessDenied,
            other => UpstreamError::Status(other),
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, DriveError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert_eq!(UpstreamError::from_status(404), UpstreamError::NotFound);
        assert_eq!(UpstreamError::from_status(401), UpstreamError::AccessDenied);
        assert_eq!(UpstreamError::from_status(403), UpstreamError::AccessDenied);
        assert_eq!(UpstreamError::from_status(500), UpstreamError::Status(500));
    }

    #[test]
    fn test_bytes_written_only_for_copy() {
        let open = DriveError::Open {
            file: "abc".to_string(),
            reason: UpstreamError::NotFound,
        };
        assert_eq!(open.bytes_written(), 0);
        assert_eq!(open.upstream(), Some(&UpstreamError::NotFound));

        let copy = DriveError::Copy {
            written: 42,
            source: std::io::Error::from(std::io::ErrorKind::BrokenPipe),
        };
        assert_eq!(copy.bytes_written(), 42);
        assert!(copy.upstream().is_none());
    }
}
