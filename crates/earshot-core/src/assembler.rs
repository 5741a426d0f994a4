//! Progressive assembler: chunk stream in, playable snapshots out
//!
//! Chunks are appended strictly in arrival order. The assembler decides at
//! which points a decodable snapshot of the bytes so far is handed to the
//! renderer:
//!
//! - **first paint**: the first chunk is emitted on its own straight away
//! - **final**: once received bytes reach the declared length, or the stream
//!   completes, the whole buffer is emitted
//! - chunks in between only accumulate (unless [`EmissionPolicy::EveryBytes`]
//!   asks for more)
//!
//! A single-chunk stream emits exactly once. Each snapshot is a superset of
//! every earlier one. Any failure discards the buffer and no further snapshot
//! is produced.

use crate::config::EmissionPolicy;
use crate::error::{PreviewError, PreviewResult};
use crate::source::Chunk;

/// Largest up-front allocation made from a declared length (64 MiB)
pub const MAX_PREALLOCATION: u64 = 64 * 1024 * 1024;

/// A decodable byte blob built from a prefix of the transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayableSnapshot {
    /// 1-based position of this snapshot within its session
    pub sequence: u32,
    /// MIME type of the file
    pub mime_type: String,
    /// Bytes `0..data.len()` of the file
    pub data: Vec<u8>,
    /// True if this snapshot holds the complete file
    pub is_final: bool,
}

impl PlayableSnapshot {
    /// Number of bytes in the snapshot
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True if the snapshot carries no bytes
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Snapshot of a payload fetched in one operation
    pub fn complete(mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            sequence: 1,
            mime_type: mime_type.into(),
            data,
            is_final: true,
        }
    }
}

/// Arrival-ordered bytes of one session plus transfer bookkeeping
#[derive(Debug, Default)]
pub struct AssemblyBuffer {
    data: Vec<u8>,
    chunk_count: usize,
    declared_len: Option<u64>,
}

impl AssemblyBuffer {
    /// Creates a buffer, reserving the declared length up to a cap
    pub fn new(declared_len: Option<u64>) -> Self {
        let capacity = declared_len.map_or(0, |len| len.min(MAX_PREALLOCATION) as usize);
        Self {
            data: Vec::with_capacity(capacity),
            chunk_count: 0,
            declared_len,
        }
    }

    /// Bytes received so far
    pub fn received(&self) -> u64 {
        self.data.len() as u64
    }

    /// Total length announced by the origin
    pub fn declared_len(&self) -> Option<u64> {
        self.declared_len
    }

    /// Number of non-empty chunks appended
    pub fn chunk_count(&self) -> usize {
        self.chunk_count
    }

    /// True once received bytes equal the declared length
    pub fn is_complete(&self) -> bool {
        self.declared_len == Some(self.received())
    }

    /// Appends a chunk that must start exactly where the buffer ends
    fn append(&mut self, chunk: &Chunk) -> PreviewResult<()> {
        let received = self.received();
        if chunk.offset != received {
            return Err(PreviewError::UnknownFailure(format!(
                "chunk at offset {} does not follow {} received bytes",
                chunk.offset, received
            )));
        }
        if let Some(total) = self.declared_len {
            if chunk.end() > total {
                return Err(PreviewError::UnknownFailure(format!(
                    "received {} bytes, more than the declared {}",
                    chunk.end(),
                    total
                )));
            }
        }

        self.data.extend_from_slice(&chunk.data);
        self.chunk_count += 1;
        Ok(())
    }

    fn copy_bytes(&self) -> Vec<u8> {
        self.data.clone()
    }

    fn take_bytes(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.data)
    }

    fn discard(&mut self) {
        self.data = Vec::new();
    }
}

/// Where the assembler is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Accumulating,
    Finished,
    Failed,
}

/// Turns a chunk sequence into a bounded sequence of snapshots
#[derive(Debug)]
pub struct ProgressiveAssembler {
    buffer: AssemblyBuffer,
    mime_type: String,
    policy: EmissionPolicy,
    emitted: u32,
    last_emitted_len: u64,
    phase: Phase,
}

impl ProgressiveAssembler {
    /// Creates an assembler for one session
    pub fn new(mime_type: impl Into<String>, declared_len: Option<u64>, policy: EmissionPolicy) -> Self {
        Self {
            buffer: AssemblyBuffer::new(declared_len),
            mime_type: mime_type.into(),
            policy,
            emitted: 0,
            last_emitted_len: 0,
            phase: Phase::Accumulating,
        }
    }

    /// The accumulated bytes and bookkeeping
    pub fn buffer(&self) -> &AssemblyBuffer {
        &self.buffer
    }

    /// Snapshots emitted so far
    pub fn emitted(&self) -> u32 {
        self.emitted
    }

    /// True once the final snapshot has been emitted or the stream ended
    pub fn is_finished(&self) -> bool {
        self.phase == Phase::Finished
    }

    /// Appends a chunk, returning a snapshot if this chunk warrants one
    ///
    /// Chunks after completion or failure are rejected.
    pub fn push(&mut self, chunk: Chunk) -> PreviewResult<Option<PlayableSnapshot>> {
        match self.phase {
            Phase::Accumulating => {}
            Phase::Finished => {
                return Err(self.fail(PreviewError::UnknownFailure(
                    "chunk arrived after the transfer completed".to_string(),
                )))
            }
            Phase::Failed => {
                return Err(PreviewError::UnknownFailure(
                    "assembler already failed".to_string(),
                ))
            }
        }

        if chunk.is_empty() {
            return Ok(None);
        }

        if let Err(e) = self.buffer.append(&chunk) {
            return Err(self.fail(e));
        }

        if self.buffer.is_complete() {
            self.phase = Phase::Finished;
            return Ok(Some(self.emit_final()));
        }

        let first_paint = self.buffer.chunk_count() == 1;
        let dense_due = match self.policy {
            EmissionPolicy::FirstAndFinal => false,
            EmissionPolicy::EveryBytes(step) => {
                self.buffer.received() - self.last_emitted_len >= step.max(1)
            }
        };

        if first_paint || dense_due {
            return Ok(Some(self.emit_partial()));
        }
        Ok(None)
    }

    /// Signals that the stream completed
    ///
    /// Emits the full buffer unless it was already emitted. Fails with
    /// `TransportInterrupted` if fewer bytes than declared arrived.
    pub fn finish(&mut self) -> PreviewResult<Option<PlayableSnapshot>> {
        match self.phase {
            Phase::Finished => return Ok(None),
            Phase::Failed => {
                return Err(PreviewError::UnknownFailure(
                    "assembler already failed".to_string(),
                ))
            }
            Phase::Accumulating => {}
        }

        let received = self.buffer.received();
        let declared = self.buffer.declared_len();

        if let Some(total) = declared {
            if received < total {
                return Err(self.fail(PreviewError::TransportInterrupted {
                    received,
                    expected: declared,
                }));
            }
        }

        // Unknown length and nothing at all arrived: there is nothing to play
        if received == 0 {
            return Err(self.fail(PreviewError::TransportInterrupted {
                received: 0,
                expected: declared,
            }));
        }

        self.phase = Phase::Finished;
        if received == self.last_emitted_len {
            return Ok(None);
        }
        Ok(Some(self.emit_final()))
    }

    /// Records a transport failure; the buffer is discarded
    pub fn abort(&mut self, error: PreviewError) -> PreviewError {
        self.fail(error)
    }

    fn fail(&mut self, error: PreviewError) -> PreviewError {
        self.phase = Phase::Failed;
        self.buffer.discard();
        error
    }

    fn emit_partial(&mut self) -> PlayableSnapshot {
        self.emitted += 1;
        self.last_emitted_len = self.buffer.received();
        PlayableSnapshot {
            sequence: self.emitted,
            mime_type: self.mime_type.clone(),
            data: self.buffer.copy_bytes(),
            is_final: false,
        }
    }

    fn emit_final(&mut self) -> PlayableSnapshot {
        self.emitted += 1;
        self.last_emitted_len = self.buffer.received();
        PlayableSnapshot {
            sequence: self.emitted,
            mime_type: self.mime_type.clone(),
            data: self.buffer.take_bytes(),
            is_final: true,
        }
    }
}
