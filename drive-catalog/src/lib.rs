//! Core library for building an artist-tagged audio catalog from a Drive
//! folder tree and relaying file content to a sink.

pub mod crawler;
pub mod drive;
pub(crate) mod error;
pub mod memory;
pub mod relay;
pub mod source;
pub(crate) mod types;

pub use crawler::{crawl, Crawler};
pub use drive::{DriveClient, DriveClientConfig};
pub use error::{DriveError, Result, UpstreamError};
pub use memory::MemoryDrive;
pub use relay::{open, relay, ByteSink, OpenedStream, WriterSink};
pub use source::{ContentSource, FolderSource, MediaSource};
pub use types::*;
