//! Symphonia-backed waveform renderer
//!
//! Headless reference implementation of [`WaveformRenderer`]:
//!
//! - **decode worker**: decodes each snapshot with symphonia, computes the
//!   waveform peaks for the attached surface, reports `Ready` or
//!   `DecodeError`
//! - **playback clock**: advances the position in wall-clock time while
//!   playing, reporting `Tick` every interval and `Ended` at the duration
//!
//! Snapshots are decoded one after another on the worker, and a newer
//! (larger) snapshot only extends the duration, so loading while playing
//! refines instead of restarting.

use std::io::Cursor;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam::channel::{self, Receiver, Sender};
use earshot_core::{
    PlayableSnapshot, RendererEvent, RendererEvents, RendererFactory, Surface, WaveformRenderer,
};
use earshot_widgets::{generate_peaks, normalize_peaks};
use thiserror::Error;

/// Errors decoding a snapshot
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("No audio track found")]
    NoTrack,

    #[error("Unknown sample rate")]
    UnknownSampleRate,

    #[error("No audio frames could be decoded")]
    Empty,
}

/// A decoded snapshot, downmixed to mono
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl DecodedAudio {
    /// Duration in seconds
    pub fn duration(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Decode a complete or truncated audio file held in memory
///
/// Decoding stops quietly at the end of the available bytes, so a prefix of
/// a file decodes to a prefix of its audio.
pub fn decode_snapshot(data: Vec<u8>, mime_type: &str) -> Result<DecodedAudio, DecodeError> {
    use symphonia::core::audio::SampleBuffer;
    use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
    use symphonia::core::formats::FormatOptions;
    use symphonia::core::io::MediaSourceStream;
    use symphonia::core::meta::MetadataOptions;
    use symphonia::core::probe::Hint;

    let mss = MediaSourceStream::new(Box::new(Cursor::new(data)), Default::default());

    let mut hint = Hint::new();
    hint.mime_type(mime_type);

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| DecodeError::UnsupportedFormat(e.to_string()))?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or(DecodeError::NoTrack)?;

    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or(DecodeError::UnknownSampleRate)?;
    let channels = track
        .codec_params
        .channels
        .map(|c| c.count() as u16)
        .unwrap_or(2)
        .max(1);

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| DecodeError::UnsupportedFormat(e.to_string()))?;

    let mut samples: Vec<f32> = Vec::new();
    let mut sample_buf: Option<SampleBuffer<f32>> = None;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(symphonia::core::errors::Error::IoError(e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => {
                log::debug!("[RENDERER] Stopped reading packets: {}", e);
                break;
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(e) => {
                log::warn!("[RENDERER] Error decoding packet: {}", e);
                continue;
            }
        };

        if sample_buf.is_none() {
            let spec = *decoded.spec();
            let duration = decoded.capacity() as u64;
            sample_buf = Some(SampleBuffer::new(duration, spec));
        }

        if let Some(ref mut buf) = sample_buf {
            buf.copy_interleaved_ref(decoded);
            // Downmix to mono by averaging channels
            samples.extend(
                buf.samples()
                    .chunks(channels as usize)
                    .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32),
            );
        }
    }

    if samples.is_empty() {
        return Err(DecodeError::Empty);
    }

    Ok(DecodedAudio {
        samples,
        sample_rate,
        channels,
    })
}

/// Playback clock state shared with the clock thread
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct ClockState {
    playing: bool,
    position: f64,
    duration: f64,
    /// Set when playback ran out, cleared by the next tick
    just_ended: bool,
}

impl ClockState {
    /// Move the clock forward by `elapsed`, returning the events to report
    fn advance(&mut self, elapsed: Duration) -> Vec<RendererEvent> {
        if !self.playing {
            self.just_ended = false;
            return Vec::new();
        }

        self.position += elapsed.as_secs_f64();
        if self.duration > 0.0 && self.position >= self.duration {
            self.position = self.duration;
            self.playing = false;
            self.just_ended = true;
            return vec![
                RendererEvent::Tick {
                    position: self.position,
                },
                RendererEvent::Ended,
            ];
        }

        vec![RendererEvent::Tick {
            position: self.position,
        }]
    }

    fn toggle(&mut self) {
        if self.playing {
            self.playing = false;
            return;
        }
        // The host sent this as a pause before it saw `Ended`; playback has
        // already stopped, so there is nothing to do
        if self.just_ended {
            self.just_ended = false;
            return;
        }
        // Replay from the start once the end was reached
        if self.duration > 0.0 && self.position >= self.duration {
            self.position = 0.0;
        }
        self.playing = true;
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One snapshot plus what the worker needs to draw it
struct DecodeJob {
    snapshot: PlayableSnapshot,
    bars: usize,
    normalize: bool,
}

/// Reference renderer: symphonia decode worker plus wall-clock playback
pub struct SymphoniaRenderer {
    events: RendererEvents,
    tick_interval: Duration,
    surface: Option<Surface>,
    jobs: Option<Sender<DecodeJob>>,
    clock: Arc<Mutex<ClockState>>,
    clock_stop: Option<Sender<()>>,
    clock_thread: Option<JoinHandle<()>>,
    peaks: Arc<Mutex<Vec<(f32, f32)>>>,
    released: Arc<AtomicBool>,
}

impl SymphoniaRenderer {
    /// Create a renderer; threads start on `attach`
    pub fn new(events: RendererEvents, tick_interval: Duration) -> Self {
        Self {
            events,
            tick_interval,
            surface: None,
            jobs: None,
            clock: Arc::new(Mutex::new(ClockState::default())),
            clock_stop: None,
            clock_thread: None,
            peaks: Arc::new(Mutex::new(Vec::new())),
            released: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Peaks of the most recently decoded snapshot
    pub fn peaks(&self) -> Vec<(f32, f32)> {
        lock(&self.peaks).clone()
    }

    /// Current playback position in seconds
    pub fn position(&self) -> f64 {
        lock(&self.clock).position
    }

    pub fn is_playing(&self) -> bool {
        lock(&self.clock).playing
    }

    fn start_threads(&mut self) -> std::io::Result<()> {
        let generation = self.events.generation();

        let (job_tx, job_rx) = channel::unbounded::<DecodeJob>();
        let events = self.events.clone();
        let clock = self.clock.clone();
        let peaks = self.peaks.clone();
        let released = self.released.clone();
        // Detached: a long decode must not block release()
        thread::Builder::new()
            .name(format!("preview-decode-{}", generation))
            .spawn(move || decode_worker(job_rx, events, clock, peaks, released))?;
        self.jobs = Some(job_tx);

        let (stop_tx, stop_rx) = channel::bounded::<()>(0);
        let events = self.events.clone();
        let clock = self.clock.clone();
        let interval = self.tick_interval;
        let handle = thread::Builder::new()
            .name(format!("preview-clock-{}", generation))
            .spawn(move || clock_thread(stop_rx, events, clock, interval))?;
        self.clock_stop = Some(stop_tx);
        self.clock_thread = Some(handle);

        log::debug!("[RENDERER] Session {} threads started", generation);
        Ok(())
    }
}

fn decode_worker(
    jobs: Receiver<DecodeJob>,
    events: RendererEvents,
    clock: Arc<Mutex<ClockState>>,
    peaks: Arc<Mutex<Vec<(f32, f32)>>>,
    released: Arc<AtomicBool>,
) {
    for job in jobs {
        if released.load(Ordering::SeqCst) {
            break;
        }

        let started = Instant::now();
        let sequence = job.snapshot.sequence;
        let len = job.snapshot.len();
        let result = decode_snapshot(job.snapshot.data, &job.snapshot.mime_type);

        if released.load(Ordering::SeqCst) {
            break;
        }

        match result {
            Ok(audio) => {
                let duration = audio.duration();
                let mut bars = generate_peaks(&audio.samples, job.bars);
                if job.normalize {
                    normalize_peaks(&mut bars);
                }
                log::info!(
                    "[RENDERER] Snapshot #{} decoded: {} bytes, {:.2}s, {} Hz x {} ch, {} bars in {:?}",
                    sequence,
                    len,
                    duration,
                    audio.sample_rate,
                    audio.channels,
                    bars.len(),
                    started.elapsed()
                );
                *lock(&peaks) = bars;
                {
                    let mut clock = lock(&clock);
                    clock.duration = duration;
                    clock.position = clock.position.min(duration);
                }
                events.emit(RendererEvent::Ready { duration });
            }
            Err(e) => {
                log::warn!("[RENDERER] Snapshot #{} rejected: {}", sequence, e);
                events.emit(RendererEvent::DecodeError {
                    detail: e.to_string(),
                });
            }
        }
    }
    log::debug!("[RENDERER] Decode worker exiting");
}

fn clock_thread(
    stop: Receiver<()>,
    events: RendererEvents,
    clock: Arc<Mutex<ClockState>>,
    interval: Duration,
) {
    let ticker = channel::tick(interval);
    let mut last = Instant::now();

    loop {
        crossbeam::select! {
            recv(stop) -> _ => break,
            recv(ticker) -> tick => {
                let now = tick.unwrap_or_else(|_| Instant::now());
                let elapsed = now.saturating_duration_since(last);
                last = now;

                let due = lock(&clock).advance(elapsed);
                for event in due {
                    if !events.emit(event) {
                        return;
                    }
                }
            }
        }
    }
}

impl WaveformRenderer for SymphoniaRenderer {
    fn attach(&mut self, surface: &Surface) {
        log::info!(
            "[RENDERER] Attached to '{}' ({}px, {} bars)",
            surface.id,
            surface.width,
            surface.bar_count()
        );
        self.surface = Some(surface.clone());

        if self.jobs.is_none() {
            if let Err(e) = self.start_threads() {
                self.events.emit(RendererEvent::DecodeError {
                    detail: format!("failed to start renderer threads: {e}"),
                });
            }
        }
    }

    fn load_snapshot(&mut self, snapshot: PlayableSnapshot) {
        if self.released.load(Ordering::SeqCst) {
            return;
        }
        let (bars, normalize) = match &self.surface {
            Some(surface) => (surface.bar_count(), surface.style.normalize),
            None => (0, false),
        };

        let Some(jobs) = &self.jobs else {
            self.events.emit(RendererEvent::DecodeError {
                detail: "renderer is not attached".to_string(),
            });
            return;
        };
        let job = DecodeJob {
            snapshot,
            bars,
            normalize,
        };
        if jobs.send(job).is_err() {
            log::warn!("[RENDERER] Decode worker gone, snapshot dropped");
        }
    }

    fn toggle_playback(&mut self) {
        if self.released.load(Ordering::SeqCst) {
            return;
        }
        let mut clock = lock(&self.clock);
        clock.toggle();
        log::debug!(
            "[RENDERER] {} at {:.2}s",
            if clock.playing { "Playing" } else { "Paused" },
            clock.position
        );
    }

    fn release(&mut self) {
        if self.released.swap(true, Ordering::SeqCst) {
            return;
        }

        lock(&self.clock).playing = false;
        self.jobs = None;
        self.clock_stop = None;
        if let Some(handle) = self.clock_thread.take() {
            if handle.join().is_err() {
                log::warn!("[RENDERER] Clock thread panicked");
            }
        }
        self.surface = None;
        log::info!("[RENDERER] Session {} released", self.events.generation());
    }

    fn supports_progressive_refinement(&self) -> bool {
        true
    }
}

impl Drop for SymphoniaRenderer {
    fn drop(&mut self) {
        self.release();
    }
}

/// Creates a [`SymphoniaRenderer`] per session
#[derive(Debug, Clone, Copy)]
pub struct SymphoniaRendererFactory {
    pub tick_interval: Duration,
}

impl Default for SymphoniaRendererFactory {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(100),
        }
    }
}

impl RendererFactory for SymphoniaRendererFactory {
    fn create(&self, events: RendererEvents) -> Box<dyn WaveformRenderer> {
        Box::new(SymphoniaRenderer::new(events, self.tick_interval))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use earshot_core::{SessionEvent, SessionMessage, WaveformStyle};

    /// Stereo 16-bit WAV with a 440 Hz tone
    pub(crate) fn wav_bytes(seconds: f32, sample_rate: u32) -> Vec<u8> {
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            let frames = (seconds * sample_rate as f32) as usize;
            for i in 0..frames {
                let t = i as f32 / sample_rate as f32;
                let sample = ((t * 440.0 * std::f32::consts::TAU).sin() * 0.5 * i16::MAX as f32) as i16;
                writer.write_sample(sample).unwrap();
                writer.write_sample(sample).unwrap();
            }
            writer.finalize().unwrap();
        }
        cursor.into_inner()
    }

    fn renderer(tick_ms: u64) -> (SymphoniaRenderer, Receiver<SessionMessage>) {
        let (tx, rx) = channel::unbounded();
        let mut renderer = SymphoniaRenderer::new(RendererEvents::new(1, tx), Duration::from_millis(tick_ms));
        renderer.attach(&Surface::new("test", 300, WaveformStyle::default()));
        (renderer, rx)
    }

    fn next_event(rx: &Receiver<SessionMessage>) -> RendererEvent {
        match rx.recv_timeout(Duration::from_secs(5)).unwrap().event {
            SessionEvent::Renderer(event) => event,
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_decode_wav_duration() {
        let audio = decode_snapshot(wav_bytes(0.5, 8000), "audio/wav").unwrap();
        assert_eq!(audio.sample_rate, 8000);
        assert_eq!(audio.channels, 2);
        assert!((audio.duration() - 0.5).abs() < 0.01);
    }

    #[test]
    fn test_decode_prefix_gives_shorter_audio() {
        let bytes = wav_bytes(1.0, 8000);
        let prefix = bytes[..bytes.len() / 2].to_vec();

        let audio = decode_snapshot(prefix, "audio/wav").unwrap();
        assert!(audio.duration() > 0.1);
        assert!(audio.duration() < 1.0);
    }

    #[test]
    fn test_decode_garbage_fails() {
        assert!(decode_snapshot(vec![0x42; 4096], "audio/mpeg").is_err());
    }

    #[test]
    fn test_clock_advances_and_ends() {
        let mut clock = ClockState {
            playing: true,
            position: 0.0,
            duration: 1.0,
            just_ended: false,
        };
        assert_eq!(
            clock.advance(Duration::from_millis(400)),
            vec![RendererEvent::Tick { position: 0.4 }]
        );
        let events = clock.advance(Duration::from_millis(800));
        assert_eq!(events.last(), Some(&RendererEvent::Ended));
        assert_eq!(clock.position, 1.0);
        assert!(!clock.playing);

        // Paused clock stays put
        assert!(clock.advance(Duration::from_secs(1)).is_empty());
    }

    #[test]
    fn test_toggle_after_end_restarts() {
        let mut clock = ClockState {
            playing: false,
            position: 2.0,
            duration: 2.0,
            just_ended: false,
        };
        clock.toggle();
        assert!(clock.playing);
        assert_eq!(clock.position, 0.0);
    }

    #[test]
    fn test_pause_racing_end_keeps_clock_stopped() {
        let mut clock = ClockState {
            playing: true,
            position: 1.9,
            duration: 2.0,
            ..ClockState::default()
        };
        let events = clock.advance(Duration::from_millis(200));
        assert_eq!(events.last(), Some(&RendererEvent::Ended));

        // Pause sent while `Ended` was still queued for the host
        clock.toggle();
        assert!(!clock.playing);
        assert_eq!(clock.position, 2.0);

        // A later toggle is a real replay request
        clock.toggle();
        assert!(clock.playing);
        assert_eq!(clock.position, 0.0);
    }

    #[test]
    fn test_replay_after_end_once_a_tick_has_passed() {
        let mut clock = ClockState {
            playing: true,
            position: 1.9,
            duration: 2.0,
            ..ClockState::default()
        };
        clock.advance(Duration::from_millis(200));
        assert!(clock.advance(Duration::from_millis(100)).is_empty());

        clock.toggle();
        assert!(clock.playing);
        assert_eq!(clock.position, 0.0);
    }

    #[test]
    fn test_renderer_reports_ready_with_peaks() {
        let (mut renderer, rx) = renderer(20);
        renderer.load_snapshot(PlayableSnapshot::complete("audio/wav", wav_bytes(0.5, 8000)));

        match next_event(&rx) {
            RendererEvent::Ready { duration } => assert!((duration - 0.5).abs() < 0.01),
            other => panic!("expected ready, got {:?}", other),
        }
        assert_eq!(renderer.peaks().len(), 100);
        assert!(renderer.peaks().iter().all(|&(min, max)| min <= max));
    }

    #[test]
    fn test_renderer_reports_decode_error() {
        let (mut renderer, rx) = renderer(20);
        renderer.load_snapshot(PlayableSnapshot::complete("audio/mpeg", vec![0x42; 4096]));

        assert!(matches!(next_event(&rx), RendererEvent::DecodeError { .. }));
    }

    #[test]
    fn test_playback_ticks_then_ends() {
        let (mut renderer, rx) = renderer(10);
        renderer.load_snapshot(PlayableSnapshot::complete("audio/wav", wav_bytes(0.2, 8000)));
        assert!(matches!(next_event(&rx), RendererEvent::Ready { .. }));

        renderer.toggle_playback();
        assert!(renderer.is_playing());

        let mut ticks = 0;
        loop {
            match next_event(&rx) {
                RendererEvent::Tick { .. } => ticks += 1,
                RendererEvent::Ended => break,
                other => panic!("unexpected {:?}", other),
            }
        }
        assert!(ticks > 0);
        assert!(!renderer.is_playing());
        assert!((renderer.position() - 0.2).abs() < 0.01);
    }

    #[test]
    fn test_release_is_idempotent_and_silences_renderer() {
        let (mut renderer, rx) = renderer(10);
        renderer.release();
        renderer.release();

        renderer.load_snapshot(PlayableSnapshot::complete("audio/wav", wav_bytes(0.2, 8000)));
        renderer.toggle_playback();
        assert!(rx.recv_timeout(Duration::from_millis(200)).is_err());
        assert!(!renderer.is_playing());
    }
}
