//! Byte sources: "get me the audio bytes"
//!
//! A [`ByteSource`] delivers a file either as one completed payload or as a
//! lazy, arrival-ordered sequence of [`Chunk`]s. Which of the two is used is
//! decided by [`FetchMode::for_size`] from the descriptor's size alone:
//!
//! - below the streaming threshold the whole resource is fetched at once
//! - at or above it the body is read incrementally
//!
//! # Implementations
//!
//! - [`HttpByteSource`] - GET against the resolved URL (ureq, blocking)
//! - [`LocalByteSource`] - a file on disk
//! - [`MemoryByteSource`] - an in-memory payload, for hosts that already hold
//!   the bytes and for exercising failure paths
//!
//! # Cancellation
//!
//! Every fetch receives the session's [`CancelToken`]. Readers are expected
//! to wake up periodically (a socket read timeout, for HTTP) so a stalled
//! transfer notices the token and ends instead of blocking forever.

mod error;
mod http;
mod local;
mod memory;

use std::io::{ErrorKind, Read};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub use error::{SourceError, SourceResult};
pub use http::HttpByteSource;
pub use local::LocalByteSource;
pub use memory::MemoryByteSource;

use crate::config::PreviewConfig;
use crate::types::FileDescriptor;

/// One contiguous byte range delivered by an incremental read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Position of the first byte within the file
    pub offset: u64,
    /// The bytes themselves
    pub data: Vec<u8>,
}

impl Chunk {
    /// Create a chunk starting at `offset`
    pub fn new(offset: u64, data: Vec<u8>) -> Self {
        Self { offset, data }
    }

    /// Number of bytes in the chunk
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True if the chunk carries no bytes
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Offset one past the last byte
    pub fn end(&self) -> u64 {
        self.offset + self.data.len() as u64
    }
}

/// Finite, non-restartable sequence of chunks plus the declared total length
///
/// Consumed by value: once drained it cannot be replayed.
pub struct ChunkStream {
    declared_len: Option<u64>,
    chunks: Box<dyn Iterator<Item = SourceResult<Chunk>> + Send>,
}

impl ChunkStream {
    /// Wrap an iterator of chunks
    pub fn new<I>(declared_len: Option<u64>, chunks: I) -> Self
    where
        I: Iterator<Item = SourceResult<Chunk>> + Send + 'static,
    {
        Self {
            declared_len,
            chunks: Box::new(chunks),
        }
    }

    /// Total length announced by the origin, if any
    pub fn declared_len(&self) -> Option<u64> {
        self.declared_len
    }
}

impl Iterator for ChunkStream {
    type Item = SourceResult<Chunk>;

    fn next(&mut self) -> Option<Self::Item> {
        self.chunks.next()
    }
}

impl std::fmt::Debug for ChunkStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkStream")
            .field("declared_len", &self.declared_len)
            .finish_non_exhaustive()
    }
}

/// Shared stop flag for one transfer
///
/// Cloned into the loader and into whatever reader the byte source opens.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask every holder to stop
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// How a file's bytes are fetched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    /// One blocking fetch of the whole resource
    SingleShot,
    /// Incremental reads, snapshots handed out as bytes arrive
    Streaming,
}

impl FetchMode {
    /// Single-shot below `threshold`, streaming at or above it
    pub fn for_size(size: u64, threshold: u64) -> Self {
        if size < threshold {
            FetchMode::SingleShot
        } else {
            FetchMode::Streaming
        }
    }
}

/// What a byte source produced for one session
#[derive(Debug)]
pub enum Payload {
    /// The whole file, fetched in one operation
    Complete(Vec<u8>),
    /// The file as an incremental chunk sequence
    Stream(ChunkStream),
}

/// Trait for anything that can deliver a file's bytes
///
/// Implementations must preserve arrival order. `open_stream` is called at
/// most once per session and its result drained exactly once. Once `cancel`
/// is set, blocked reads must give up with [`SourceError::Cancelled`].
pub trait ByteSource: Send {
    /// Fetch the whole resource in one operation
    fn fetch_all(&mut self, cancel: &CancelToken) -> SourceResult<Vec<u8>>;

    /// Open the resource for incremental reads
    ///
    /// Fails with [`SourceError::Unsupported`] if the transport cannot be
    /// opened or cannot read incrementally.
    fn open_stream(&mut self, cancel: &CancelToken) -> SourceResult<ChunkStream>;

    /// Human-readable identifier (URL or path) for logging
    fn source_id(&self) -> &str;
}

/// Fetch the descriptor's bytes in the mode its size calls for
pub fn open_payload(
    source: &mut dyn ByteSource,
    descriptor: &FileDescriptor,
    config: &PreviewConfig,
    cancel: &CancelToken,
) -> SourceResult<Payload> {
    match FetchMode::for_size(descriptor.size, config.streaming_threshold()) {
        FetchMode::SingleShot => source.fetch_all(cancel).map(Payload::Complete),
        FetchMode::Streaming => source.open_stream(cancel).map(Payload::Stream),
    }
}

/// Opens a byte source for a descriptor
pub trait SourceFactory: Send + Sync {
    /// Create the source; must not perform network or disk I/O yet
    fn open(
        &self,
        descriptor: &FileDescriptor,
        config: &PreviewConfig,
    ) -> SourceResult<Box<dyn ByteSource>>;
}

/// Routes by URL scheme: `http(s)://` over HTTP, `file://` or a bare path
/// from disk
#[derive(Debug, Clone, Copy, Default)]
pub struct UrlSourceFactory;

impl SourceFactory for UrlSourceFactory {
    fn open(
        &self,
        descriptor: &FileDescriptor,
        config: &PreviewConfig,
    ) -> SourceResult<Box<dyn ByteSource>> {
        let url = descriptor.url.as_str();
        if url.starts_with("http://") || url.starts_with("https://") {
            return Ok(Box::new(HttpByteSource::new(url, config)));
        }
        if let Some(path) = url.strip_prefix("file://") {
            return Ok(Box::new(LocalByteSource::new(path, config.read_chunk_size)));
        }
        if url.contains("://") {
            return Err(SourceError::Unsupported(format!("No transport for {url}")));
        }
        Ok(Box::new(LocalByteSource::new(url, config.read_chunk_size)))
    }
}

/// True for errors a read poll timeout produces
fn is_poll_timeout(kind: ErrorKind) -> bool {
    matches!(kind, ErrorKind::TimedOut | ErrorKind::WouldBlock)
}

/// Adapts any reader into an arrival-ordered chunk iterator
///
/// Each `next()` yields the next read of up to `buffer size` bytes. Reads
/// that time out are retried until data arrives or the token is cancelled.
/// Any other read error ends the sequence with [`SourceError::Interrupted`].
pub(crate) struct ReaderChunks<R> {
    reader: R,
    buffer: Vec<u8>,
    offset: u64,
    expected: Option<u64>,
    cancel: CancelToken,
    done: bool,
}

impl<R: Read> ReaderChunks<R> {
    pub(crate) fn new(reader: R, read_size: usize, expected: Option<u64>, cancel: CancelToken) -> Self {
        Self {
            reader,
            buffer: vec![0u8; read_size.max(1)],
            offset: 0,
            expected,
            cancel,
            done: false,
        }
    }
}

impl<R: Read> Iterator for ReaderChunks<R> {
    type Item = SourceResult<Chunk>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        loop {
            if self.cancel.is_cancelled() {
                self.done = true;
                return Some(Err(SourceError::Cancelled));
            }
            match self.reader.read(&mut self.buffer) {
                Ok(0) => {
                    self.done = true;
                    return None;
                }
                Ok(n) => {
                    let chunk = Chunk::new(self.offset, self.buffer[..n].to_vec());
                    self.offset += n as u64;
                    return Some(Ok(chunk));
                }
                Err(e) if e.kind() == ErrorKind::Interrupted || is_poll_timeout(e.kind()) => continue,
                Err(e) => {
                    self.done = true;
                    return Some(Err(SourceError::Interrupted {
                        received: self.offset,
                        expected: self.expected,
                        reason: e.to_string(),
                    }));
                }
            }
        }
    }
}

/// Read a whole body, turning a mid-transfer failure into `Interrupted`
pub(crate) fn read_complete<R: Read>(
    reader: R,
    expected: Option<u64>,
    cancel: &CancelToken,
) -> SourceResult<Vec<u8>> {
    let capacity = expected.map_or(0, |len| len.min(crate::assembler::MAX_PREALLOCATION) as usize);
    let mut data = Vec::with_capacity(capacity);

    for chunk in ReaderChunks::new(reader, 64 * 1024, expected, cancel.clone()) {
        data.extend_from_slice(&chunk?.data);
    }

    if let Some(total) = expected {
        if data.len() as u64 != total {
            return Err(SourceError::Interrupted {
                received: data.len() as u64,
                expected,
                reason: format!("body ended after {} of {} bytes", data.len(), total),
            });
        }
    }

    Ok(data)
}
