//! Headless preview loop
//!
//! Drives one [`PreviewSession`] on the calling thread: drains session
//! events, re-derives the [`PreviewView`] whenever the published state
//! changes and logs it, and optionally starts playback once ready.

use std::time::{Duration, Instant};

use earshot_core::{
    FileDescriptor, PlaybackSession, PlaybackState, PreviewSession, RendererFactory, SourceFactory,
    Surface, UrlSourceFactory,
};
use earshot_widgets::{dispatch, Labels, PreviewView, ViewAction};
use tokio::sync::watch;

use crate::config::PreviewerConfig;
use crate::renderer::SymphoniaRendererFactory;

/// How a preview run ended
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Loaded (and played through, with autoplay)
    Finished(PlaybackSession),
    /// The session failed; carries the error view text
    Failed(String),
    /// Gave up waiting
    TimedOut(PlaybackSession),
}

/// One preview component without a UI toolkit
pub struct PreviewApp {
    session: PreviewSession,
    state_rx: watch::Receiver<PlaybackSession>,
    labels: Labels,
    autoplay: bool,
    autoplay_sent: bool,
    view: PreviewView,
}

impl PreviewApp {
    /// App with the URL-routed byte sources and the symphonia renderer
    pub fn new(config: &PreviewerConfig) -> Self {
        let renderers = SymphoniaRendererFactory {
            tick_interval: Duration::from_millis(config.tick_interval_ms.max(1)),
        };
        Self::with_parts(config, Box::new(UrlSourceFactory), Box::new(renderers))
    }

    pub fn with_parts(
        config: &PreviewerConfig,
        sources: Box<dyn SourceFactory>,
        renderers: Box<dyn RendererFactory>,
    ) -> Self {
        let surface = Surface::new("preview", config.surface_width, config.style.clone());
        let session = PreviewSession::new(config.preview.clone(), sources, renderers, surface);
        let state_rx = session.subscribe();
        let view = PreviewView::from_session(session.state(), &config.labels);

        Self {
            session,
            state_rx,
            labels: config.labels.clone(),
            autoplay: config.autoplay,
            autoplay_sent: false,
            view,
        }
    }

    /// Start previewing a file, replacing whatever was open
    pub fn open(&mut self, descriptor: FileDescriptor) {
        self.autoplay_sent = false;
        self.session.start(descriptor);
        self.refresh_view();
    }

    /// Current view
    pub fn view(&self) -> &PreviewView {
        &self.view
    }

    /// Forward a user action to the session
    pub fn act(&mut self, action: ViewAction) -> bool {
        let applied = dispatch(action, &mut self.session);
        self.refresh_view();
        applied
    }

    /// Process at most one event; `Some` once the run is over
    pub fn step(&mut self, timeout: Duration) -> Option<Outcome> {
        self.session.wait_event(timeout);
        self.session.pump();
        self.refresh_view();

        let state = self.session.state().clone();
        if self.autoplay && !self.autoplay_sent && state.state == PlaybackState::Ready {
            self.autoplay_sent = true;
            log::info!("[APP] Autoplay");
            self.act(ViewAction::TogglePlayback);
        }

        self.outcome(&state)
    }

    /// Step until the run is over or `limit` elapsed
    pub fn run(&mut self, limit: Option<Duration>) -> Outcome {
        let started = Instant::now();
        loop {
            if let Some(outcome) = self.step(Duration::from_millis(50)) {
                return outcome;
            }
            if limit.is_some_and(|l| started.elapsed() >= l) {
                log::warn!("[APP] Gave up after {:?}", started.elapsed());
                return Outcome::TimedOut(self.session.state().clone());
            }
        }
    }

    /// Stop the session
    pub fn close(&mut self) {
        self.session.cancel();
        self.refresh_view();
    }

    fn outcome(&self, state: &PlaybackSession) -> Option<Outcome> {
        if let PreviewView::Error { message } = &self.view {
            return Some(Outcome::Failed(message.clone()));
        }
        if self.session.is_transferring() {
            return None;
        }

        let done = if self.autoplay {
            self.autoplay_sent
                && state.state == PlaybackState::Paused
                && state.current_time >= state.duration
        } else {
            state.state == PlaybackState::Ready
        };
        done.then(|| Outcome::Finished(state.clone()))
    }

    fn refresh_view(&mut self) {
        if !self.state_rx.has_changed().unwrap_or(false) {
            return;
        }
        let state = self.state_rx.borrow_and_update().clone();
        let view = PreviewView::from_session(&state, &self.labels);
        if view != self.view {
            log_view(&view);
            self.view = view;
        }
    }
}

fn log_view(view: &PreviewView) {
    match view {
        PreviewView::Error { message } => log::error!("[VIEW] {}", message),
        PreviewView::Player(player) => {
            let button = if player.transport.enabled {
                format!("[{}]", player.transport.label)
            } else {
                format!("({})", player.transport.label)
            };
            match &player.loading {
                Some(text) => log::info!("[VIEW] {} {} {}", button, player.time_readout(), text),
                None => log::info!("[VIEW] {} {}", button, player.time_readout()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{FileRef, PreviewRegistry};
    use crate::renderer::tests::wav_bytes;
    use earshot_core::{ByteSource, MemoryByteSource, PreviewConfig, SourceResult};

    fn config(autoplay: bool) -> PreviewerConfig {
        PreviewerConfig {
            autoplay,
            tick_interval_ms: 10,
            ..PreviewerConfig::default()
        }
    }

    struct MemorySources(MemoryByteSource);

    impl SourceFactory for MemorySources {
        fn open(
            &self,
            _descriptor: &FileDescriptor,
            _config: &PreviewConfig,
        ) -> SourceResult<Box<dyn ByteSource>> {
            Ok(Box::new(self.0.clone()))
        }
    }

    #[test]
    fn test_local_wav_loads_to_ready() {
        let temp = tempfile::Builder::new().suffix(".wav").tempfile().unwrap();
        std::fs::write(temp.path(), wav_bytes(0.5, 8000)).unwrap();

        let config = config(false);
        let file = FileRef::local(temp.path()).unwrap();
        let descriptor = PreviewRegistry::default().select(&file, &config).unwrap();

        let mut app = PreviewApp::new(&config);
        app.open(descriptor);
        assert!(app.view().player().is_some_and(|p| p.loading.is_some()));

        match app.run(Some(Duration::from_secs(10))) {
            Outcome::Finished(state) => {
                assert_eq!(state.state, PlaybackState::Ready);
                assert!((state.duration - 0.5).abs() < 0.01);
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        let player = app.view().player().unwrap();
        assert!(player.transport.enabled);
        assert_eq!(player.time_readout(), "00:00 / 00:00");
    }

    #[test]
    fn test_autoplay_plays_to_the_end() {
        let config = config(true);
        let bytes = wav_bytes(0.3, 8000);
        let size = bytes.len() as u64;
        let sources = MemorySources(MemoryByteSource::new(bytes, 4096));
        let renderers = SymphoniaRendererFactory {
            tick_interval: Duration::from_millis(10),
        };

        let mut app = PreviewApp::with_parts(&config, Box::new(sources), Box::new(renderers));
        app.open(FileDescriptor::new(None, "audio/wav", size, "mem://tone.wav"));

        match app.run(Some(Duration::from_secs(10))) {
            Outcome::Finished(state) => {
                assert_eq!(state.state, PlaybackState::Paused);
                assert_eq!(state.current_time, state.duration);
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_streamed_wav_reaches_full_duration() {
        let config = config(false);
        // 100 s of 8 kHz stereo 16-bit is above the streaming threshold
        let bytes = wav_bytes(100.0, 8000);
        let size = bytes.len() as u64;
        assert!(size >= config.preview.streaming_threshold());
        let sources = MemorySources(MemoryByteSource::new(bytes, 1024 * 1024));

        let mut app = PreviewApp::with_parts(
            &config,
            Box::new(sources),
            Box::new(SymphoniaRendererFactory::default()),
        );
        app.open(FileDescriptor::new(None, "audio/wav", size, "mem://long.wav"));

        let deadline = Instant::now() + Duration::from_secs(20);
        let mut last = None;
        while Instant::now() < deadline {
            if let Some(outcome) = app.step(Duration::from_millis(50)) {
                last = Some(outcome);
                if matches!(&last, Some(Outcome::Finished(s)) if (s.duration - 100.0).abs() < 0.01) {
                    break;
                }
            }
        }
        match last {
            Some(Outcome::Finished(state)) => assert!((state.duration - 100.0).abs() < 0.01),
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_undecodable_file_shows_error_view() {
        let config = config(false);
        let sources = MemorySources(MemoryByteSource::new(vec![0x42u8; 2048], 512));
        let mut app = PreviewApp::with_parts(
            &config,
            Box::new(sources),
            Box::new(SymphoniaRendererFactory::default()),
        );
        app.open(FileDescriptor::new(None, "audio/mpeg", 2048, "mem://junk.mp3"));

        match app.run(Some(Duration::from_secs(10))) {
            Outcome::Failed(message) => {
                assert!(message.starts_with("Error while loading the file: Could not decode audio"));
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert!(app.view().is_error());
        assert!(!app.act(ViewAction::TogglePlayback));
    }

    #[test]
    fn test_close_returns_to_idle_view() {
        let config = config(false);
        let sources = MemorySources(MemoryByteSource::new(wav_bytes(0.2, 8000), 4096));
        let mut app = PreviewApp::with_parts(
            &config,
            Box::new(sources),
            Box::new(SymphoniaRendererFactory::default()),
        );
        app.open(FileDescriptor::new(None, "audio/wav", 10, "mem://a.wav"));
        app.close();

        let player = app.view().player().unwrap();
        assert!(!player.transport.enabled);
        assert!(player.loading.is_none());
    }
}
