//! Local file byte source

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use super::error::{SourceError, SourceResult};
use super::{read_complete, ByteSource, CancelToken, ChunkStream, ReaderChunks};

/// Serves a file from disk, declared length taken from its metadata
pub struct LocalByteSource {
    path: PathBuf,
    id: String,
    read_chunk_size: usize,
}

impl LocalByteSource {
    /// Creates a source for `path`; the file is opened on first fetch
    pub fn new<P: AsRef<Path>>(path: P, read_chunk_size: usize) -> Self {
        let path = path.as_ref().to_path_buf();
        let id = path.to_string_lossy().into_owned();
        Self {
            path,
            id,
            read_chunk_size,
        }
    }

    /// Returns the path to the file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open_file(&self) -> SourceResult<(File, u64)> {
        let file = File::open(&self.path).map_err(|e| {
            SourceError::Unsupported(format!("Cannot open {}: {}", self.path.display(), e))
        })?;
        let size = file.metadata()?.len();
        Ok((file, size))
    }
}

impl ByteSource for LocalByteSource {
    fn fetch_all(&mut self, cancel: &CancelToken) -> SourceResult<Vec<u8>> {
        let (file, size) = self.open_file()?;
        read_complete(BufReader::new(file), Some(size), cancel)
    }

    fn open_stream(&mut self, cancel: &CancelToken) -> SourceResult<ChunkStream> {
        let (file, size) = self.open_file()?;
        let chunks = ReaderChunks::new(file, self.read_chunk_size, Some(size), cancel.clone());
        Ok(ChunkStream::new(Some(size), chunks))
    }

    fn source_id(&self) -> &str {
        &self.id
    }
}
