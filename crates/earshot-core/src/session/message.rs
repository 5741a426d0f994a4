//! Messages on the session event channel

use crate::assembler::PlayableSnapshot;
use crate::error::PreviewError;
use crate::renderer::RendererEvent;

/// What happened
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// The loader produced a playable snapshot
    Snapshot(PlayableSnapshot),
    /// The transfer or assembly failed; the loader has stopped
    LoadFailed(PreviewError),
    /// All bytes arrived
    LoadComplete { bytes: u64 },
    /// Reported by the renderer
    Renderer(RendererEvent),
}

/// An event tagged with the session generation that produced it
///
/// The owner drops messages whose generation is not the live one.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionMessage {
    pub generation: u64,
    pub event: SessionEvent,
}

impl SessionMessage {
    pub fn new(generation: u64, event: SessionEvent) -> Self {
        Self { generation, event }
    }
}
