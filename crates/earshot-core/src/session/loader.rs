//! Background loader thread
//!
//! Moves the byte transfer off the session owner's thread. One loader runs
//! per session generation: it fetches the payload, feeds the assembler and
//! posts snapshots back over the session channel. It stops as soon as the
//! cancel flag is set or the channel is gone.

use std::io;
use std::thread::{self, JoinHandle};

use crossbeam::channel::Sender;

use super::message::{SessionEvent, SessionMessage};
use crate::assembler::{PlayableSnapshot, ProgressiveAssembler};
use crate::config::PreviewConfig;
use crate::error::PreviewError;
use crate::source::{open_payload, ByteSource, CancelToken, FetchMode, Payload};
use crate::types::FileDescriptor;

/// Everything one loader run needs
pub(crate) struct LoadJob {
    pub generation: u64,
    pub descriptor: FileDescriptor,
    pub config: PreviewConfig,
    pub source: Box<dyn ByteSource>,
    pub tx: Sender<SessionMessage>,
}

/// Handle to a running loader
///
/// Dropping the handle detaches the thread. The byte source shares the
/// cancel token, so a transfer stalled inside a read gives up at its next
/// read poll.
pub(crate) struct LoaderHandle {
    cancelled: CancelToken,
    _thread: JoinHandle<()>,
}

impl LoaderHandle {
    /// Ask the loader to stop; no further messages will be sent
    pub fn cancel(&self) {
        self.cancelled.cancel();
    }
}

/// Spawn the loader thread for one session generation
pub(crate) fn spawn_loader(job: LoadJob) -> io::Result<LoaderHandle> {
    let cancelled = CancelToken::new();
    let flag = cancelled.clone();

    let thread = thread::Builder::new()
        .name(format!("preview-loader-{}", job.generation))
        .spawn(move || run_loader(job, flag))?;

    Ok(LoaderHandle {
        cancelled,
        _thread: thread,
    })
}

/// Posts messages for one generation unless cancelled
struct Outbox {
    generation: u64,
    tx: Sender<SessionMessage>,
    cancelled: CancelToken,
}

impl Outbox {
    fn is_cancelled(&self) -> bool {
        self.cancelled.is_cancelled()
    }

    /// Returns false when the loader should stop
    fn send(&self, event: SessionEvent) -> bool {
        if self.is_cancelled() {
            return false;
        }
        if self
            .tx
            .send(SessionMessage::new(self.generation, event))
            .is_err()
        {
            log::debug!("[LOADER] Session {} gone, stopping", self.generation);
            self.cancelled.cancel();
            return false;
        }
        true
    }

    fn snapshot(&self, snapshot: PlayableSnapshot) -> bool {
        log::info!(
            "[LOADER] Session {} snapshot #{}: {} bytes{}",
            self.generation,
            snapshot.sequence,
            snapshot.len(),
            if snapshot.is_final { " (final)" } else { "" }
        );
        self.send(SessionEvent::Snapshot(snapshot))
    }

    fn failed(&self, error: PreviewError) {
        if !self.is_cancelled() {
            log::warn!("[LOADER] Session {} failed: {}", self.generation, error);
        }
        self.send(SessionEvent::LoadFailed(error));
    }
}

fn run_loader(job: LoadJob, cancelled: CancelToken) {
    let LoadJob {
        generation,
        descriptor,
        config,
        mut source,
        tx,
    } = job;
    let outbox = Outbox {
        generation,
        tx,
        cancelled,
    };

    let mode = FetchMode::for_size(descriptor.size, config.streaming_threshold());
    log::info!(
        "[LOADER] Session {} started: {} ({} bytes, {:?})",
        generation,
        source.source_id(),
        descriptor.size,
        mode
    );

    let payload = match open_payload(source.as_mut(), &descriptor, &config, &outbox.cancelled) {
        Ok(payload) => payload,
        Err(e) => {
            outbox.failed(e.into());
            return;
        }
    };

    let received = match payload {
        Payload::Complete(bytes) => {
            let len = bytes.len() as u64;
            if !outbox.snapshot(PlayableSnapshot::complete(descriptor.mime_type.clone(), bytes)) {
                return;
            }
            len
        }
        Payload::Stream(stream) => {
            let mut assembler =
                ProgressiveAssembler::new(descriptor.mime_type.clone(), stream.declared_len(), config.emission);

            for item in stream {
                if outbox.is_cancelled() {
                    log::debug!("[LOADER] Session {} cancelled mid-stream", generation);
                    return;
                }
                let chunk = match item {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        outbox.failed(assembler.abort(e.into()));
                        return;
                    }
                };
                match assembler.push(chunk) {
                    Ok(Some(snapshot)) => {
                        if !outbox.snapshot(snapshot) {
                            return;
                        }
                    }
                    Ok(None) => {}
                    Err(e) => {
                        outbox.failed(e);
                        return;
                    }
                }
            }

            // Read before finish() hands the buffer to the final snapshot
            let received = assembler.buffer().received();
            match assembler.finish() {
                Ok(Some(snapshot)) => {
                    if !outbox.snapshot(snapshot) {
                        return;
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    outbox.failed(e);
                    return;
                }
            }
            received
        }
    };

    if outbox.send(SessionEvent::LoadComplete { bytes: received }) {
        log::info!("[LOADER] Session {} complete: {} bytes", generation, received);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemoryByteSource;
    use crossbeam::channel::{unbounded, Receiver};
    use std::time::Duration;

    const MB: usize = 1024 * 1024;

    fn job(source: MemoryByteSource, size: u64, tx: Sender<SessionMessage>) -> LoadJob {
        LoadJob {
            generation: 3,
            descriptor: FileDescriptor::new(None, "audio/mpeg", size, "mem://test"),
            config: PreviewConfig::default(),
            source: Box::new(source),
            tx,
        }
    }

    fn collect(rx: &Receiver<SessionMessage>) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        while let Ok(message) = rx.recv_timeout(Duration::from_secs(5)) {
            assert_eq!(message.generation, 3);
            let done = matches!(
                message.event,
                SessionEvent::LoadComplete { .. } | SessionEvent::LoadFailed(_)
            );
            events.push(message.event);
            if done {
                break;
            }
        }
        events
    }

    fn snapshot_lengths(events: &[SessionEvent]) -> Vec<usize> {
        events
            .iter()
            .filter_map(|e| match e {
                SessionEvent::Snapshot(s) => Some(s.len()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_small_file_sends_one_complete_snapshot() {
        let (tx, rx) = unbounded();
        let source = MemoryByteSource::new(vec![7u8; 1000], 100).without_streaming();
        let _handle = spawn_loader(job(source, 1000, tx)).unwrap();

        let events = collect(&rx);
        assert_eq!(snapshot_lengths(&events), vec![1000]);
        assert_eq!(events.last(), Some(&SessionEvent::LoadComplete { bytes: 1000 }));
    }

    #[test]
    fn test_large_file_streams_first_and_final() {
        let (tx, rx) = unbounded();
        let source = MemoryByteSource::new(vec![1u8; 5 * MB], MB);
        let _handle = spawn_loader(job(source, 5 * MB as u64, tx)).unwrap();

        let events = collect(&rx);
        assert_eq!(snapshot_lengths(&events), vec![MB, 5 * MB]);
        assert_eq!(
            events.last(),
            Some(&SessionEvent::LoadComplete { bytes: 5 * MB as u64 })
        );
    }

    #[test]
    fn test_interrupted_stream_reports_failure_without_tail() {
        let (tx, rx) = unbounded();
        let source = MemoryByteSource::new(vec![1u8; 5 * MB], MB).interrupt_after(2);
        let _handle = spawn_loader(job(source, 5 * MB as u64, tx)).unwrap();

        let events = collect(&rx);
        assert_eq!(snapshot_lengths(&events), vec![MB]);
        assert_eq!(
            events.last(),
            Some(&SessionEvent::LoadFailed(PreviewError::TransportInterrupted {
                received: 2 * MB as u64,
                expected: Some(5 * MB as u64),
            }))
        );
    }

    #[test]
    fn test_streaming_unavailable_is_transport_unsupported() {
        let (tx, rx) = unbounded();
        let source = MemoryByteSource::new(vec![1u8; 3 * MB], MB).without_streaming();
        let _handle = spawn_loader(job(source, 3 * MB as u64, tx)).unwrap();

        let events = collect(&rx);
        assert!(matches!(
            events.as_slice(),
            [SessionEvent::LoadFailed(PreviewError::TransportUnsupported(_))]
        ));
    }
}
