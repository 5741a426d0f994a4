//! HTTP byte source using ureq

use std::time::Duration;

use ureq::{Agent, AgentBuilder, Response};

use super::error::{SourceError, SourceResult};
use super::{read_complete, ByteSource, CancelToken, ChunkStream, ReaderChunks};
use crate::config::PreviewConfig;

/// Fetches a file with a plain GET against its resolved URL
///
/// `Content-Length` is read when present to learn the declared total. No
/// custom headers or methods are used. Only the connection attempt has a
/// timeout. Socket reads wake up every `read_poll_ms` so a stalled body
/// read ends once the session is cancelled.
pub struct HttpByteSource {
    url: String,
    agent: Agent,
    read_chunk_size: usize,
}

impl HttpByteSource {
    /// Creates a source for `url`; no request is sent until a fetch
    pub fn new(url: impl Into<String>, config: &PreviewConfig) -> Self {
        let mut builder = AgentBuilder::new()
            .timeout_connect(Duration::from_secs(config.http.connect_timeout_secs))
            .timeout_read(Duration::from_millis(config.http.read_poll_ms.max(1)));

        builder = match config.http.user_agent {
            Some(ref ua) => builder.user_agent(ua),
            None => builder.user_agent(concat!("earshot/", env!("CARGO_PKG_VERSION"))),
        };

        Self {
            url: url.into(),
            agent: builder.build(),
            read_chunk_size: config.read_chunk_size,
        }
    }

    /// Sends the GET and maps failures to transport errors
    fn send(&self) -> SourceResult<Response> {
        log::debug!("[HTTP] GET {}", self.url);

        match self.agent.get(&self.url).call() {
            Ok(response) => Ok(response),
            Err(ureq::Error::Status(status, response)) => Err(SourceError::Http {
                status,
                message: response.status_text().to_string(),
            }),
            Err(ureq::Error::Transport(transport)) => {
                Err(SourceError::Unsupported(transport.to_string()))
            }
        }
    }
}

/// Parses `Content-Length`, ignoring malformed values
fn content_length(response: &Response) -> Option<u64> {
    response
        .header("Content-Length")
        .and_then(|s| s.trim().parse().ok())
}

impl ByteSource for HttpByteSource {
    fn fetch_all(&mut self, cancel: &CancelToken) -> SourceResult<Vec<u8>> {
        let response = self.send()?;
        let declared = content_length(&response);
        read_complete(response.into_reader(), declared, cancel)
    }

    fn open_stream(&mut self, cancel: &CancelToken) -> SourceResult<ChunkStream> {
        let response = self.send()?;
        let declared = content_length(&response);

        log::debug!(
            "[HTTP] Streaming {} (declared length: {:?})",
            self.url,
            declared
        );

        let chunks = ReaderChunks::new(
            response.into_reader(),
            self.read_chunk_size,
            declared,
            cancel.clone(),
        );
        Ok(ChunkStream::new(declared, chunks))
    }

    fn source_id(&self) -> &str {
        &self.url
    }
}
