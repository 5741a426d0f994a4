//! Preview session: one file, one playback session
//!
//! [`PreviewSession`] is the explicit lifecycle object a host holds per
//! preview component. `start(descriptor)` cancels whatever was running,
//! creates a fresh renderer and spawns a loader thread; `cancel()` stops it.
//!
//! # Event flow
//!
//! ```text
//! loader thread ──┐
//!                 ├──► crossbeam channel ──► pump() / wait_event() ──► PlaybackController
//! renderer ───────┘    (generation-tagged)
//! ```
//!
//! Every message carries the generation of the session that produced it.
//! Cancelling bumps the generation, so late chunks and renderer callbacks
//! from a superseded session are dropped on arrival and never reach the
//! controller or the new renderer.

mod loader;
mod message;

use std::time::Duration;

use crossbeam::channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use tokio::sync::watch;

pub use message::{SessionEvent, SessionMessage};

use crate::config::PreviewConfig;
use crate::controller::{PlaybackController, PlaybackSession, PlaybackState};
use crate::error::PreviewError;
use crate::renderer::{RendererEvents, RendererFactory, Surface};
use crate::source::SourceFactory;
use crate::types::FileDescriptor;
use loader::{spawn_loader, LoadJob, LoaderHandle};

/// Lifecycle object for one preview component
pub struct PreviewSession {
    config: PreviewConfig,
    sources: Box<dyn SourceFactory>,
    renderers: Box<dyn RendererFactory>,
    surface: Surface,
    controller: PlaybackController,
    tx: Sender<SessionMessage>,
    rx: Receiver<SessionMessage>,
    /// Generation of the live session; messages tagged otherwise are stale
    generation: u64,
    loader: Option<LoaderHandle>,
    descriptor: Option<FileDescriptor>,
}

impl PreviewSession {
    pub fn new(
        config: PreviewConfig,
        sources: Box<dyn SourceFactory>,
        renderers: Box<dyn RendererFactory>,
        surface: Surface,
    ) -> Self {
        let (tx, rx) = unbounded();
        Self {
            config,
            sources,
            renderers,
            surface,
            controller: PlaybackController::new(),
            tx,
            rx,
            generation: 0,
            loader: None,
            descriptor: None,
        }
    }

    /// Begin previewing `descriptor`
    ///
    /// Any running session is cancelled and its renderer released before the
    /// new byte source and renderer are created. Failures to set up land the
    /// session in `Errored`.
    pub fn start(&mut self, descriptor: FileDescriptor) {
        self.cancel();
        let generation = self.generation;

        log::info!(
            "[SESSION] Start {}: {} ({}, {} bytes)",
            generation,
            descriptor.url,
            descriptor.mime_type,
            descriptor.size
        );

        let renderer = self
            .renderers
            .create(RendererEvents::new(generation, self.tx.clone()));
        self.controller
            .begin(renderer, &self.surface, self.config.progressive_refinement);
        self.descriptor = Some(descriptor.clone());

        let source = match self.sources.open(&descriptor, &self.config) {
            Ok(source) => source,
            Err(e) => {
                self.controller.fail(e.into());
                return;
            }
        };

        let job = LoadJob {
            generation,
            descriptor,
            config: self.config.clone(),
            source,
            tx: self.tx.clone(),
        };
        match spawn_loader(job) {
            Ok(handle) => self.loader = Some(handle),
            Err(e) => {
                self.controller.fail(PreviewError::UnknownFailure(format!(
                    "failed to spawn loader thread: {e}"
                )));
            }
        }
    }

    /// Stop the current session
    ///
    /// The in-flight transfer is told to stop, the renderer is released and
    /// every message already queued for this session becomes stale.
    pub fn cancel(&mut self) {
        if let Some(loader) = self.loader.take() {
            loader.cancel();
        }
        if self.controller.state() != PlaybackState::Idle || self.controller.has_renderer() {
            log::info!("[SESSION] Cancel {}", self.generation);
        }
        self.controller.reset();
        self.descriptor = None;
        self.generation += 1;
    }

    /// Forward a play/pause toggle; returns whether it was applied
    pub fn toggle_playback(&mut self) -> bool {
        self.controller.toggle()
    }

    /// Apply every queued message without blocking
    ///
    /// Returns the number of messages that belonged to the live session.
    pub fn pump(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(message) = self.rx.try_recv() {
            if self.dispatch(message) {
                applied += 1;
            }
        }
        applied
    }

    /// Block up to `timeout` for one message and apply it
    ///
    /// Returns false if nothing arrived in time. A stale message still
    /// counts as arrived.
    pub fn wait_event(&mut self, timeout: Duration) -> bool {
        match self.rx.recv_timeout(timeout) {
            Ok(message) => {
                self.dispatch(message);
                true
            }
            Err(RecvTimeoutError::Timeout) => false,
            // We hold a sender ourselves, so this cannot happen while alive
            Err(RecvTimeoutError::Disconnected) => false,
        }
    }

    /// Current state snapshot
    pub fn state(&self) -> &PlaybackSession {
        self.controller.session()
    }

    /// Receiver of every state change
    pub fn subscribe(&self) -> watch::Receiver<PlaybackSession> {
        self.controller.subscribe()
    }

    /// Descriptor of the live session, if any
    pub fn descriptor(&self) -> Option<&FileDescriptor> {
        self.descriptor.as_ref()
    }

    /// Generation number of the live session
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// True while the loader for the live session has not reported back
    pub fn is_transferring(&self) -> bool {
        self.loader.is_some()
    }

    /// Apply one message; false if it was stale
    fn dispatch(&mut self, message: SessionMessage) -> bool {
        if message.generation != self.generation {
            log::debug!(
                "[SESSION] Dropping stale event from session {} (live: {})",
                message.generation,
                self.generation
            );
            return false;
        }

        match message.event {
            SessionEvent::Snapshot(snapshot) => self.controller.offer_snapshot(snapshot),
            SessionEvent::LoadFailed(error) => {
                self.loader = None;
                self.controller.fail(error);
            }
            SessionEvent::LoadComplete { bytes } => {
                self.loader = None;
                log::info!("[SESSION] Transfer {} finished: {} bytes", self.generation, bytes);
            }
            SessionEvent::Renderer(event) => self.controller.handle_event(event),
        }

        // An errored session never resumes; stop pulling bytes for it
        if self.controller.state() == PlaybackState::Errored {
            if let Some(loader) = self.loader.take() {
                log::info!("[SESSION] Session {} errored, stopping transfer", self.generation);
                loader.cancel();
            }
        }
        true
    }
}

impl Drop for PreviewSession {
    fn drop(&mut self) {
        self.cancel();
    }
}
