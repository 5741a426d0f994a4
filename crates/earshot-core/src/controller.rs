//! Playback controller: transport state machine
//!
//! ```text
//! Idle ──start──► Loading ──ready──► Ready ──toggle──► Playing ◄──toggle──► Paused
//!                    │                 │                  │ ended ──────────►  │
//!                    └─────────────────┴──── failure ─────┴──────► Errored ◄───┘
//! ```
//!
//! The controller owns the renderer for the live session and is driven one
//! event at a time by [`crate::PreviewSession`]. Every change is published
//! on a `tokio::sync::watch` channel as a [`PlaybackSession`] value.

use tokio::sync::watch;

use crate::assembler::PlayableSnapshot;
use crate::error::PreviewError;
use crate::renderer::{RendererEvent, Surface, WaveformRenderer};

/// Transport state of a preview
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    #[default]
    Idle,
    Loading,
    Ready,
    Playing,
    Paused,
    Errored,
}

impl PlaybackState {
    /// True if the transport control accepts toggles
    pub fn accepts_toggle(self) -> bool {
        matches!(self, PlaybackState::Ready | PlaybackState::Playing | PlaybackState::Paused)
    }
}

/// Observable per-preview state
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PlaybackSession {
    pub state: PlaybackState,
    pub is_loading: bool,
    pub is_playing: bool,
    /// Playback position in seconds
    pub current_time: f64,
    /// Duration of the latest decoded snapshot in seconds
    pub duration: f64,
    pub error: Option<PreviewError>,
}

impl PlaybackSession {
    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }

    /// Human-readable error text, if the session failed
    pub fn error_message(&self) -> Option<String> {
        self.error.as_ref().map(ToString::to_string)
    }

    fn loading() -> Self {
        Self {
            state: PlaybackState::Loading,
            is_loading: true,
            ..Self::default()
        }
    }
}

/// Mediates user intent and renderer events for one live session
pub struct PlaybackController {
    renderer: Option<Box<dyn WaveformRenderer>>,
    session: PlaybackSession,
    /// Renderer can take a superset while a previous load is still decoding
    progressive: bool,
    /// A snapshot was handed to the renderer and `Ready` has not come back
    awaiting_ready: bool,
    /// Newest snapshot held back until the renderer is ready
    pending: Option<PlayableSnapshot>,
    state_tx: watch::Sender<PlaybackSession>,
}

impl Default for PlaybackController {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaybackController {
    pub fn new() -> Self {
        let (state_tx, _) = watch::channel(PlaybackSession::default());
        Self {
            renderer: None,
            session: PlaybackSession::default(),
            progressive: false,
            awaiting_ready: false,
            pending: None,
            state_tx,
        }
    }

    /// Current state snapshot
    pub fn session(&self) -> &PlaybackSession {
        &self.session
    }

    pub fn state(&self) -> PlaybackState {
        self.session.state
    }

    /// Receiver that sees every published state change
    pub fn subscribe(&self) -> watch::Receiver<PlaybackSession> {
        self.state_tx.subscribe()
    }

    /// True while a renderer is owned
    pub fn has_renderer(&self) -> bool {
        self.renderer.is_some()
    }

    /// Idle → Loading with a fresh renderer
    ///
    /// Any previous renderer is released first so two are never alive at
    /// once. `progressive_override` replaces the renderer's own answer to
    /// [`WaveformRenderer::supports_progressive_refinement`].
    pub fn begin(
        &mut self,
        mut renderer: Box<dyn WaveformRenderer>,
        surface: &Surface,
        progressive_override: Option<bool>,
    ) {
        self.release_renderer();

        renderer.attach(surface);
        self.progressive =
            progressive_override.unwrap_or_else(|| renderer.supports_progressive_refinement());
        self.renderer = Some(renderer);
        self.awaiting_ready = false;
        self.pending = None;
        self.session = PlaybackSession::loading();

        log::debug!(
            "[CONTROLLER] Loading (progressive refinement: {})",
            self.progressive
        );
        self.publish();
    }

    /// Hand a snapshot to the renderer, or hold it until `Ready`
    ///
    /// A held snapshot is replaced by any newer one, which is always a
    /// superset of it.
    pub fn offer_snapshot(&mut self, snapshot: PlayableSnapshot) {
        if self.session.state == PlaybackState::Errored || self.renderer.is_none() {
            return;
        }

        if self.awaiting_ready && !self.progressive {
            log::debug!(
                "[CONTROLLER] Holding snapshot #{} ({} bytes) until renderer is ready",
                snapshot.sequence,
                snapshot.len()
            );
            self.pending = Some(snapshot);
            return;
        }

        self.load(snapshot);
    }

    /// Apply one renderer event
    pub fn handle_event(&mut self, event: RendererEvent) {
        if matches!(self.session.state, PlaybackState::Idle | PlaybackState::Errored) {
            return;
        }

        match event {
            RendererEvent::Ready { duration } => {
                self.awaiting_ready = false;
                self.session.duration = duration;
                if self.session.state == PlaybackState::Loading {
                    self.session.state = PlaybackState::Ready;
                    self.session.is_loading = false;
                    log::debug!("[CONTROLLER] Loading -> Ready ({:.2}s)", duration);
                }
                if let Some(next) = self.pending.take() {
                    self.load(next);
                }
            }
            RendererEvent::Tick { position } => {
                self.session.current_time = position;
            }
            RendererEvent::Ended => {
                if self.session.state == PlaybackState::Playing {
                    self.session.state = PlaybackState::Paused;
                    log::debug!("[CONTROLLER] Playing -> Paused (ended)");
                }
                self.session.is_playing = false;
                self.session.current_time = self.session.duration;
            }
            RendererEvent::DecodeError { detail } => {
                self.fail(PreviewError::DecodeFailure(detail));
                return;
            }
        }

        self.publish();
    }

    /// User play/pause intent
    ///
    /// Forwarded to the renderer exactly once from Ready, Playing or Paused;
    /// ignored otherwise. Returns whether the toggle was applied.
    pub fn toggle(&mut self) -> bool {
        if !self.session.state.accepts_toggle() {
            log::debug!("[CONTROLLER] Toggle ignored in {:?}", self.session.state);
            return false;
        }
        let Some(renderer) = self.renderer.as_mut() else {
            return false;
        };

        renderer.toggle_playback();
        self.session.state = match self.session.state {
            PlaybackState::Playing => PlaybackState::Paused,
            _ => PlaybackState::Playing,
        };
        self.session.is_playing = self.session.state == PlaybackState::Playing;
        self.publish();
        true
    }

    /// Terminate the session with an error
    ///
    /// The renderer is released; the first error wins.
    pub fn fail(&mut self, error: PreviewError) {
        if matches!(self.session.state, PlaybackState::Idle | PlaybackState::Errored) {
            return;
        }

        log::error!("[CONTROLLER] Preview failed: {}", error);
        self.release_renderer();
        self.session.state = PlaybackState::Errored;
        self.session.is_loading = false;
        self.session.is_playing = false;
        self.session.error = Some(error);
        self.publish();
    }

    /// Release the renderer and return to Idle
    pub fn reset(&mut self) {
        self.release_renderer();
        self.session = PlaybackSession::default();
        self.publish();
    }

    fn load(&mut self, snapshot: PlayableSnapshot) {
        let Some(renderer) = self.renderer.as_mut() else {
            return;
        };
        log::debug!(
            "[CONTROLLER] Loading snapshot #{} ({} bytes, final: {})",
            snapshot.sequence,
            snapshot.len(),
            snapshot.is_final
        );
        renderer.load_snapshot(snapshot);
        self.awaiting_ready = true;
    }

    fn release_renderer(&mut self) {
        if let Some(mut renderer) = self.renderer.take() {
            renderer.release();
        }
        self.awaiting_ready = false;
        self.pending = None;
    }

    fn publish(&self) {
        self.state_tx.send_replace(self.session.clone());
    }
}

impl Drop for PlaybackController {
    fn drop(&mut self) {
        self.release_renderer();
    }
}
