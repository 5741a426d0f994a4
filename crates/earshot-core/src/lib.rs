//! Earshot Core - progressive audio preview engine
//!
//! Streams an audio file's bytes, assembles them into playable snapshots,
//! hands those to a waveform renderer and keeps transport state in sync with
//! the renderer's playback clock.
//!
//! # Data Flow
//!
//! ```text
//! ByteSource ──► ProgressiveAssembler ──► WaveformRenderer
//!                                              │ ready / tick / ended / decodeError
//!                                              ▼
//!                     PreviewView ◄── PlaybackController
//! ```
//!
//! All session state transitions happen on the thread that owns the
//! [`PreviewSession`]; byte transfer runs on a background loader thread and
//! reports back through a single event channel.

pub mod assembler;
pub mod config;
pub mod controller;
pub mod error;
pub mod renderer;
pub mod session;
pub mod source;
pub mod types;

pub use assembler::{AssemblyBuffer, PlayableSnapshot, ProgressiveAssembler};
pub use config::{EmissionPolicy, HttpConfig, PreviewConfig, WaveformStyle};
pub use controller::{PlaybackController, PlaybackSession, PlaybackState};
pub use error::{ErrorKind, PreviewError, PreviewResult};
pub use renderer::{RendererEvent, RendererEvents, RendererFactory, Surface, WaveformRenderer};
pub use session::{PreviewSession, SessionEvent, SessionMessage};
pub use source::{
    ByteSource, CancelToken, Chunk, ChunkStream, FetchMode, HttpByteSource, LocalByteSource, MemoryByteSource,
    Payload, SourceError, SourceFactory, SourceResult, UrlSourceFactory,
};
pub use types::*;
