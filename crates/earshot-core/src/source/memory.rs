//! In-memory byte source
//!
//! Serves a payload the host already holds, split into fixed-size chunks.
//! The declared length can be hidden and the transfer can be cut short, which
//! makes it handy for exercising unknown-length and interrupted transfers.

use std::sync::Arc;

use super::error::{SourceError, SourceResult};
use super::{ByteSource, CancelToken, Chunk, ChunkStream};

/// Byte source over a shared in-memory buffer
#[derive(Debug, Clone)]
pub struct MemoryByteSource {
    id: String,
    data: Arc<[u8]>,
    chunk_size: usize,
    declare_length: bool,
    interrupt_after: Option<usize>,
    streaming_supported: bool,
}

impl MemoryByteSource {
    /// Serve `data` in chunks of `chunk_size` bytes
    pub fn new(data: impl Into<Arc<[u8]>>, chunk_size: usize) -> Self {
        Self {
            id: "memory".to_string(),
            data: data.into(),
            chunk_size: chunk_size.max(1),
            declare_length: true,
            interrupt_after: None,
            streaming_supported: true,
        }
    }

    /// Set the identifier used in logs
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Behave like an origin that omits `Content-Length`
    pub fn without_declared_length(mut self) -> Self {
        self.declare_length = false;
        self
    }

    /// Close the transfer after `chunks` chunks have been delivered
    pub fn interrupt_after(mut self, chunks: usize) -> Self {
        self.interrupt_after = Some(chunks);
        self
    }

    /// Behave like a transport without incremental reads
    pub fn without_streaming(mut self) -> Self {
        self.streaming_supported = false;
        self
    }

    fn declared_len(&self) -> Option<u64> {
        self.declare_length.then_some(self.data.len() as u64)
    }

    fn delivered_before_interrupt(&self) -> Option<u64> {
        self.interrupt_after
            .map(|n| (n.saturating_mul(self.chunk_size)).min(self.data.len()) as u64)
    }
}

impl ByteSource for MemoryByteSource {
    fn fetch_all(&mut self, _cancel: &CancelToken) -> SourceResult<Vec<u8>> {
        if let Some(received) = self.delivered_before_interrupt() {
            return Err(SourceError::Interrupted {
                received,
                expected: self.declared_len(),
                reason: "connection closed".to_string(),
            });
        }
        Ok(self.data.to_vec())
    }

    fn open_stream(&mut self, _cancel: &CancelToken) -> SourceResult<ChunkStream> {
        if !self.streaming_supported {
            return Err(SourceError::Unsupported(
                "incremental reads not available".to_string(),
            ));
        }

        let data = self.data.clone();
        let chunk_size = self.chunk_size;
        let expected = self.declared_len();
        let limit = self.interrupt_after;
        let chunk_count = data.len().div_ceil(chunk_size);

        let chunks = (0..=chunk_count).map_while(move |index| {
            if limit == Some(index) {
                let received = (index * chunk_size).min(data.len()) as u64;
                return Some(Err(SourceError::Interrupted {
                    received,
                    expected,
                    reason: "connection closed".to_string(),
                }));
            }
            if index == chunk_count {
                return None;
            }
            let start = index * chunk_size;
            let end = (start + chunk_size).min(data.len());
            Some(Ok(Chunk::new(start as u64, data[start..end].to_vec())))
        });

        Ok(ChunkStream::new(expected, chunks))
    }

    fn source_id(&self) -> &str {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_splits_payload() {
        let mut source = MemoryByteSource::new(vec![1u8; 10], 4);
        let stream = source.open_stream(&CancelToken::new()).unwrap();
        assert_eq!(stream.declared_len(), Some(10));

        let chunks: Vec<Chunk> = stream.collect::<SourceResult<_>>().unwrap();
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[2].offset, 8);
        assert_eq!(chunks[2].len(), 2);
    }

    #[test]
    fn test_hidden_length() {
        let mut source = MemoryByteSource::new(vec![1u8; 10], 4).without_declared_length();
        assert_eq!(source.open_stream(&CancelToken::new()).unwrap().declared_len(), None);
    }

    #[test]
    fn test_interrupt_after_two_chunks() {
        let mut source = MemoryByteSource::new(vec![0u8; 50], 10).interrupt_after(2);
        let results: Vec<_> = source.open_stream(&CancelToken::new()).unwrap().collect();

        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok() && results[1].is_ok());
        assert!(matches!(
            results[2],
            Err(SourceError::Interrupted {
                received: 20,
                expected: Some(50),
                ..
            })
        ));
    }

    #[test]
    fn test_without_streaming_is_unsupported() {
        let mut source = MemoryByteSource::new(vec![0u8; 4], 2).without_streaming();
        assert!(matches!(source.open_stream(&CancelToken::new()), Err(SourceError::Unsupported(_))));
        assert_eq!(source.fetch_all(&CancelToken::new()).unwrap().len(), 4);
    }
}
