//! Waveform renderer interface
//!
//! The renderer decodes snapshots, draws the waveform and runs the playback
//! clock. It lives outside this crate; the session only talks to it through
//! [`WaveformRenderer`] and listens to the [`RendererEvent`]s it reports.
//!
//! Events are not delivered through callbacks. Each renderer instance gets a
//! [`RendererEvents`] handle that tags everything it emits with the session
//! generation and pushes it onto the session's single event channel, so
//! events from a released renderer can be recognised and dropped.

use crossbeam::channel::Sender;

use crate::assembler::PlayableSnapshot;
use crate::config::WaveformStyle;
use crate::session::{SessionEvent, SessionMessage};

/// Visual output target a renderer binds to
#[derive(Debug, Clone, PartialEq)]
pub struct Surface {
    /// Host-side identifier of the drawing area
    pub id: String,
    /// Width in pixels
    pub width: u32,
    /// Colours and bar geometry
    pub style: WaveformStyle,
}

impl Surface {
    pub fn new(id: impl Into<String>, width: u32, style: WaveformStyle) -> Self {
        Self {
            id: id.into(),
            width,
            style,
        }
    }

    /// Number of waveform bars that fit on this surface
    pub fn bar_count(&self) -> usize {
        self.style.bar_count(self.width)
    }
}

/// Events a renderer reports back to the session
#[derive(Debug, Clone, PartialEq)]
pub enum RendererEvent {
    /// Decoding of the latest snapshot succeeded
    Ready { duration: f64 },
    /// Periodic playback position while playing (seconds)
    Tick { position: f64 },
    /// Playback reached the end
    Ended,
    /// The renderer rejected the bytes
    DecodeError { detail: String },
}

/// Event sink handed to a renderer when it is created
#[derive(Debug, Clone)]
pub struct RendererEvents {
    generation: u64,
    tx: Sender<SessionMessage>,
}

impl RendererEvents {
    /// Sink that tags events with `generation`
    pub fn new(generation: u64, tx: Sender<SessionMessage>) -> Self {
        Self { generation, tx }
    }

    /// Session generation this renderer belongs to
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Queue an event for the session
    ///
    /// Returns `false` once the session is gone; the renderer should stop
    /// producing events then.
    pub fn emit(&self, event: RendererEvent) -> bool {
        self.tx
            .send(SessionMessage::new(self.generation, SessionEvent::Renderer(event)))
            .is_ok()
    }
}

/// Decodes snapshots, draws the waveform and drives playback
///
/// All methods are called from the session owner's thread. Implementations
/// report results asynchronously through their [`RendererEvents`].
pub trait WaveformRenderer: Send {
    /// Bind to a visual output target
    fn attach(&mut self, surface: &Surface);

    /// Accept a snapshot; supersedes what is displayed once decoded
    fn load_snapshot(&mut self, snapshot: PlayableSnapshot);

    /// Flip between playing and paused
    fn toggle_playback(&mut self);

    /// Tear down decoder, clock and surface binding. Must be idempotent.
    fn release(&mut self);

    /// True if loading a strict superset while playing refines the current
    /// audio instead of replacing it
    ///
    /// When false, the session waits for `Ready` before the next load.
    fn supports_progressive_refinement(&self) -> bool {
        false
    }
}

/// Creates one renderer per session
pub trait RendererFactory: Send {
    fn create(&self, events: RendererEvents) -> Box<dyn WaveformRenderer>;
}

impl<F> RendererFactory for F
where
    F: Fn(RendererEvents) -> Box<dyn WaveformRenderer> + Send,
{
    fn create(&self, events: RendererEvents) -> Box<dyn WaveformRenderer> {
        self(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam::channel::unbounded;

    #[test]
    fn test_events_are_tagged_with_generation() {
        let (tx, rx) = unbounded();
        let events = RendererEvents::new(7, tx);

        assert!(events.emit(RendererEvent::Ready { duration: 2.5 }));

        let message = rx.try_recv().unwrap();
        assert_eq!(message.generation, 7);
        assert_eq!(
            message.event,
            SessionEvent::Renderer(RendererEvent::Ready { duration: 2.5 })
        );
    }

    #[test]
    fn test_emit_reports_closed_session() {
        let (tx, rx) = unbounded();
        let events = RendererEvents::new(1, tx);
        drop(rx);
        assert!(!events.emit(RendererEvent::Ended));
    }

    #[test]
    fn test_surface_bar_count() {
        let surface = Surface::new("preview", 600, WaveformStyle::default());
        assert_eq!(surface.bar_count(), 200);
    }
}
